//! Threat scoring for the comprehensive security scan.
//!
//! The score is a linear point sum over three inputs (breaches, mailbox
//! domain reputation, stored password hygiene), capped at 100 and bucketed
//! into a level by fixed thresholds.

use crate::service::password_health::HealthReport;
use crate::types::breach::Breach;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_POINTS: u32 = 100;

const BREACH_POINTS: u32 = 10;
const PASSWORD_EXPOSURE_POINTS: u32 = 15;
const RECENT_BREACH_POINTS: u32 = 5;
const RECENT_BREACH_DAYS: i64 = 365;
const UNRATED_DOMAIN_POINTS: u32 = 5;
const WEAK_PASSWORD_POINTS: u32 = 3;
const WEAK_PASSWORD_CAP: u32 = 30;
const REUSED_PASSWORD_POINTS: u32 = 5;
const REUSED_PASSWORD_CAP: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn from_points(points: u32) -> Self {
        match points {
            70.. => ThreatLevel::Critical,
            40..=69 => ThreatLevel::High,
            20..=39 => ThreatLevel::Medium,
            _ => ThreatLevel::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainCategory {
    Trusted,
    PastBreaches,
    Disposable,
    Unrated,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainReputation {
    pub domain: String,
    pub category: DomainCategory,
    pub points: u32,
    pub note: &'static str,
}

const REPUTATION_TABLE: &[(&str, DomainCategory, u32, &str)] = &[
    (
        "gmail.com",
        DomainCategory::Trusted,
        0,
        "Major provider with strong account protection",
    ),
    (
        "yahoo.com",
        DomainCategory::PastBreaches,
        15,
        "Provider affected by large historical breaches",
    ),
    (
        "mailinator.com",
        DomainCategory::Disposable,
        25,
        "Public disposable inbox; anyone can read its mail",
    ),
];

pub fn domain_reputation(domain: &str) -> DomainReputation {
    let domain = domain.trim().to_ascii_lowercase();
    match REPUTATION_TABLE.iter().find(|(d, ..)| *d == domain) {
        Some((_, category, points, note)) => DomainReputation {
            domain,
            category: *category,
            points: *points,
            note: *note,
        },
        None => DomainReputation {
            domain,
            category: DomainCategory::Unrated,
            points: UNRATED_DOMAIN_POINTS,
            note: "No reputation data for this domain",
        },
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreatFactor {
    pub kind: &'static str,
    pub points: u32,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreatAssessment {
    pub points: u32,
    pub level: ThreatLevel,
    pub security_score: u32,
    pub factors: Vec<ThreatFactor>,
    pub recommendations: Vec<String>,
}

/// `breaches` is `None` when the breach lookup could not be performed; such
/// a scan scores only the remaining inputs.
pub fn assess(
    breaches: Option<&[Breach]>,
    reputation: &DomainReputation,
    health: &HealthReport,
    now: DateTime<Utc>,
) -> ThreatAssessment {
    let mut factors = Vec::new();
    let mut recommendations = Vec::new();

    match breaches {
        Some(breaches) => {
            for breach in breaches {
                let mut points = BREACH_POINTS;
                let mut detail = format!("Listed in the {} breach", breach.title);
                if breach.exposed_passwords() {
                    points += PASSWORD_EXPOSURE_POINTS;
                    detail.push_str("; passwords exposed");
                }
                let recent = breach.breach_date.is_some_and(|date| {
                    (now.date_naive() - date).num_days() <= RECENT_BREACH_DAYS
                });
                if recent {
                    points += RECENT_BREACH_POINTS;
                    detail.push_str("; occurred within the last year");
                }
                factors.push(ThreatFactor {
                    kind: "breach",
                    points,
                    detail,
                });
            }
            let exposed: Vec<&str> = breaches
                .iter()
                .filter(|b| b.exposed_passwords())
                .map(|b| b.title.as_str())
                .collect();
            if !exposed.is_empty() {
                recommendations.push(format!(
                    "Change passwords for accounts exposed in: {}",
                    exposed.join(", ")
                ));
            }
            if !breaches.is_empty() {
                recommendations
                    .push("Enable two-factor authentication on breached services".to_string());
            }
        }
        None => {
            recommendations
                .push("Breach lookup was unavailable; run the scan again later".to_string());
        }
    }

    if reputation.points > 0 {
        factors.push(ThreatFactor {
            kind: "domain",
            points: reputation.points,
            detail: format!("{}: {}", reputation.domain, reputation.note),
        });
    }
    if reputation.category == DomainCategory::Disposable {
        recommendations.push("Move the account to a permanent email provider".to_string());
    }

    let weak = health.weak.len() as u32;
    if weak > 0 {
        factors.push(ThreatFactor {
            kind: "weak_passwords",
            points: (weak * WEAK_PASSWORD_POINTS).min(WEAK_PASSWORD_CAP),
            detail: format!("{weak} weak stored passwords"),
        });
        recommendations.push(format!("Strengthen {weak} weak passwords"));
    }
    let reused = health.reused_extra() as u32;
    if reused > 0 {
        factors.push(ThreatFactor {
            kind: "reused_passwords",
            points: (reused * REUSED_PASSWORD_POINTS).min(REUSED_PASSWORD_CAP),
            detail: format!("{reused} reused stored passwords"),
        });
        recommendations.push(format!("Replace {reused} reused passwords with unique ones"));
    }

    if recommendations.is_empty() {
        recommendations.push("Monitor account activity regularly".to_string());
    }

    let points = factors
        .iter()
        .map(|f| f.points)
        .sum::<u32>()
        .min(MAX_POINTS);
    ThreatAssessment {
        points,
        level: ThreatLevel::from_points(points),
        security_score: MAX_POINTS - points,
        factors,
        recommendations,
    }
}
