use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Breach record as returned by HIBP `breachedaccount` (non-truncated).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HibpBreach {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub breach_date: Option<NaiveDate>,
    #[serde(default)]
    pub pwn_count: u64,
    #[serde(default)]
    pub data_classes: Vec<String>,
    #[serde(default)]
    pub is_verified: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Breach {
    pub name: String,
    pub title: String,
    pub domain: Option<String>,
    pub breach_date: Option<NaiveDate>,
    pub pwn_count: u64,
    pub data_classes: Vec<String>,
    pub is_verified: bool,
}

impl Breach {
    pub fn exposed_passwords(&self) -> bool {
        self.data_classes
            .iter()
            .any(|c| c.eq_ignore_ascii_case("passwords"))
    }
}

impl From<HibpBreach> for Breach {
    fn from(b: HibpBreach) -> Self {
        Self {
            title: b.title.unwrap_or_else(|| b.name.clone()),
            name: b.name,
            domain: b.domain.filter(|d| !d.is_empty()),
            breach_date: b.breach_date,
            pwn_count: b.pwn_count,
            data_classes: b.data_classes,
            is_verified: b.is_verified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BreachStatus {
    Safe,
    Compromised,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreachReport {
    pub email: String,
    pub status: BreachStatus,
    pub breaches_found: usize,
    pub breaches: Vec<Breach>,
    pub source: &'static str,
    pub checked_at: DateTime<Utc>,
}

impl BreachReport {
    pub fn new(email: String, breaches: Vec<Breach>) -> Self {
        let status = if breaches.is_empty() {
            BreachStatus::Safe
        } else {
            BreachStatus::Compromised
        };
        Self {
            email,
            status,
            breaches_found: breaches.len(),
            breaches,
            source: "haveibeenpwned",
            checked_at: Utc::now(),
        }
    }
}
