use crate::db::models::DbPassword;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Entries scoring below this strength count as weak.
pub const WEAK_BELOW: u8 = 2;

const COMMON_PASSWORDS: &[&str] = &[
    "123456",
    "12345678",
    "123456789",
    "password",
    "password1",
    "qwerty",
    "qwerty123",
    "abc123",
    "111111",
    "letmein",
    "welcome",
    "iloveyou",
    "admin",
    "monkey",
    "dragon",
    "football",
];

/// Strength on a 0..=4 scale from length tiers and character-class variety.
/// Well-known passwords always score 0.
pub fn strength(password: &str) -> u8 {
    if COMMON_PASSWORDS.contains(&password.to_ascii_lowercase().as_str()) {
        return 0;
    }
    let len = password.chars().count();
    let classes = [
        password.chars().any(|c| c.is_lowercase()),
        password.chars().any(|c| c.is_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_alphanumeric()),
    ]
    .iter()
    .filter(|present| **present)
    .count();

    let mut score: u8 = [len >= 8, len >= 12, len >= 16, classes >= 3]
        .iter()
        .filter(|hit| **hit)
        .count() as u8;
    if classes <= 1 {
        score = score.saturating_sub(1);
    }
    score.min(4)
}

pub fn strength_label(score: u8) -> &'static str {
    match score {
        0 => "very weak",
        1 => "weak",
        2 => "fair",
        3 => "strong",
        _ => "very strong",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryRef {
    pub id: String,
    pub vault_id: String,
    pub title: String,
    pub strength: u8,
}

impl EntryRef {
    fn from_entry(entry: &DbPassword) -> Self {
        Self {
            id: entry.id.clone(),
            vault_id: entry.vault_id.clone(),
            title: entry.title.clone(),
            strength: strength(&entry.password),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReuseGroup {
    pub count: usize,
    pub entries: Vec<EntryRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub total: usize,
    pub weak: Vec<EntryRef>,
    pub reused: Vec<ReuseGroup>,
    pub average_strength: f64,
    /// Share of entries that are neither weak nor reused, 0..=100.
    pub score: u32,
}

impl HealthReport {
    /// Extra copies beyond the first in every reuse group.
    pub fn reused_extra(&self) -> usize {
        self.reused.iter().map(|g| g.count - 1).sum()
    }
}

pub fn analyze(entries: &[DbPassword]) -> HealthReport {
    let total = entries.len();
    let weak: Vec<EntryRef> = entries
        .iter()
        .map(EntryRef::from_entry)
        .filter(|e| e.strength < WEAK_BELOW)
        .collect();

    // Groups keyed by secret, remembering the index of the first member so
    // they come out in creation order.
    let mut by_secret: HashMap<&str, (usize, Vec<&DbPassword>)> = HashMap::new();
    for (idx, entry) in entries.iter().enumerate() {
        by_secret
            .entry(entry.password.as_str())
            .or_insert_with(|| (idx, Vec::new()))
            .1
            .push(entry);
    }
    let mut reused: Vec<(usize, ReuseGroup)> = by_secret
        .into_values()
        .filter(|(_, group)| group.len() > 1)
        .map(|(first, group)| {
            (
                first,
                ReuseGroup {
                    count: group.len(),
                    entries: group.into_iter().map(EntryRef::from_entry).collect(),
                },
            )
        })
        .collect();
    reused.sort_by_key(|(first, _)| *first);
    let reused: Vec<ReuseGroup> = reused.into_iter().map(|(_, g)| g).collect();

    let average_strength = if total == 0 {
        0.0
    } else {
        entries
            .iter()
            .map(|e| f64::from(strength(&e.password)))
            .sum::<f64>()
            / total as f64
    };

    let flagged: HashSet<&str> = weak
        .iter()
        .chain(reused.iter().flat_map(|g| g.entries.iter()))
        .map(|e| e.id.as_str())
        .collect();
    let score = if total == 0 {
        100
    } else {
        ((total - flagged.len()) * 100 / total) as u32
    };

    HealthReport {
        total,
        weak,
        reused,
        average_strength,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: &str, secret: &str) -> DbPassword {
        DbPassword {
            id: id.to_string(),
            vault_id: "v1".to_string(),
            title: format!("site {id}"),
            username: "me".to_string(),
            password: secret.to_string(),
            url: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn scores_strength_tiers() {
        assert_eq!(strength("password"), 0);
        assert_eq!(strength("QWERTY"), 0);
        assert_eq!(strength("abcdefgh"), 0);
        assert_eq!(strength("short1A"), 1);
        assert_eq!(strength("Tr0ub4dor&3"), 2);
        assert_eq!(strength("correcthorsebattery"), 2);
        assert_eq!(strength("Xk9#mP2$vL7@qR4!"), 4);
    }

    #[test]
    fn labels_cover_the_scale() {
        assert_eq!(strength_label(0), "very weak");
        assert_eq!(strength_label(4), "very strong");
    }

    #[test]
    fn finds_weak_and_reused_entries() {
        let entries = vec![
            entry("a", "Xk9#mP2$vL7@qR4!"),
            entry("b", "letmein"),
            entry("c", "Xk9#mP2$vL7@qR4!"),
            entry("d", "G7^pW2!zQ9*rT4&y"),
        ];
        let report = analyze(&entries);

        assert_eq!(report.total, 4);
        assert_eq!(report.weak.len(), 1);
        assert_eq!(report.weak[0].id, "b");
        assert_eq!(report.reused.len(), 1);
        assert_eq!(report.reused[0].count, 2);
        assert_eq!(report.reused_extra(), 1);
        // only "d" is neither weak nor reused
        assert_eq!(report.score, 25);
    }

    #[test]
    fn weak_and_reused_entry_is_flagged_once() {
        let entries = vec![
            entry("a", "letmein"),
            entry("b", "letmein"),
            entry("c", "G7^pW2!zQ9*rT4&y"),
            entry("d", "Xk9#mP2$vL7@qR4!"),
        ];
        let report = analyze(&entries);
        assert_eq!(report.weak.len(), 2);
        assert_eq!(report.reused.len(), 1);
        assert_eq!(report.score, 50);
    }

    #[test]
    fn reuse_groups_keep_creation_order() {
        let entries = vec![
            entry("a", "Xk9#mP2$vL7@qR4!"),
            entry("b", "G7^pW2!zQ9*rT4&y"),
            entry("c", "G7^pW2!zQ9*rT4&y"),
            entry("d", "Xk9#mP2$vL7@qR4!"),
        ];
        let report = analyze(&entries);
        assert_eq!(report.reused.len(), 2);
        assert_eq!(report.reused[0].entries[0].id, "a");
        assert_eq!(report.reused[1].entries[0].id, "b");
        assert_eq!(report.score, 0);
    }

    #[test]
    fn empty_vault_is_healthy() {
        let report = analyze(&[]);
        assert_eq!(report.score, 100);
        assert!(report.weak.is_empty());
        assert!(report.reused.is_empty());
    }
}
