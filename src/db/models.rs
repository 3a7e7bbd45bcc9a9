use crate::service::threat::ThreatLevel;
use crate::types::plans::PlanId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Order issued, waiting for the user to pay and submit the UTR.
    Created,
    /// UTR submitted, waiting for an admin.
    Submitted,
    Verified,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "created",
            PaymentStatus::Submitted => "submitted",
            PaymentStatus::Verified => "verified",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub subscription_plan: PlanId,
    pub subscription_status: SubscriptionStatus,
    pub failed_attempts: i64,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl DbUser {
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbSession {
    pub token_hash: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DbVault {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: String,
    pub password_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored credential entry.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DbPassword {
    pub id: String,
    pub vault_id: String,
    pub title: String,
    pub username: String,
    pub password: String,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DbSubscription {
    pub id: String,
    pub user_id: String,
    pub plan: PlanId,
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub payment_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DbPayment {
    pub id: String,
    pub user_id: String,
    pub plan: PlanId,
    pub amount_paise: i64,
    pub currency: String,
    pub upi_app: Option<String>,
    pub status: PaymentStatus,
    pub utr: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submitted payment joined with the payer's email, for the admin queue.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PendingPayment {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub payment: DbPayment,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DbNotification {
    pub id: i64,
    pub kind: String,
    pub message: String,
    pub payment_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DbScan {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub domain: String,
    pub breach_count: i64,
    pub threat_level: ThreatLevel,
    pub security_score: i64,
    pub scanned_at: DateTime<Utc>,
}
