use crate::db::VaultStorage;
use crate::db::models::{DbUser, SubscriptionStatus};
use crate::error::MazeError;
use crate::types::plans::{Plan, PlanId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Plan a user is entitled to right now.
#[derive(Debug, Clone, Serialize)]
pub struct EffectivePlan {
    pub plan: PlanId,
    pub status: SubscriptionStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

impl EffectivePlan {
    pub fn details(&self) -> &'static Plan {
        self.plan.plan()
    }
}

/// A paid plan only counts while its latest subscription is unexpired;
/// otherwise the user falls back to `free` and the status reads `expired`.
pub async fn effective_plan(
    storage: &VaultStorage,
    user: &DbUser,
) -> Result<EffectivePlan, MazeError> {
    if user.subscription_plan == PlanId::Free {
        return Ok(EffectivePlan {
            plan: PlanId::Free,
            status: SubscriptionStatus::Active,
            expires_at: None,
        });
    }
    let latest = storage.latest_subscription(&user.id).await?;
    let now = Utc::now();
    Ok(match latest {
        Some(sub) if sub.status == SubscriptionStatus::Active && sub.expires_at > now => {
            EffectivePlan {
                plan: sub.plan,
                status: SubscriptionStatus::Active,
                expires_at: Some(sub.expires_at),
            }
        }
        Some(sub) => EffectivePlan {
            plan: PlanId::Free,
            status: SubscriptionStatus::Expired,
            expires_at: Some(sub.expires_at),
        },
        // Plan set without a subscription row (seeded accounts).
        None => EffectivePlan {
            plan: user.subscription_plan,
            status: user.subscription_status,
            expires_at: None,
        },
    })
}

/// Row cap for one kind of record under the user's current plan.
///
/// The cap is enforced by the insert itself (see `VaultStorage::create_vault`
/// and `create_password`), so concurrent creates cannot overshoot it.
#[derive(Debug, Clone, Copy)]
pub struct Capacity {
    pub limit: Option<i64>,
    plan: &'static Plan,
    what: &'static str,
}

impl Capacity {
    pub fn exceeded(&self) -> MazeError {
        MazeError::PlanLimit(format!(
            "The {} plan allows {} {}; upgrade to add more",
            self.plan.name,
            self.limit.unwrap_or_default(),
            self.what
        ))
    }
}

pub async fn vault_capacity(storage: &VaultStorage, user: &DbUser) -> Result<Capacity, MazeError> {
    let plan = effective_plan(storage, user).await?.details();
    Ok(Capacity {
        limit: plan.limits.vaults,
        plan,
        what: "vaults",
    })
}

pub async fn password_capacity(
    storage: &VaultStorage,
    user: &DbUser,
) -> Result<Capacity, MazeError> {
    let plan = effective_plan(storage, user).await?.details();
    Ok(Capacity {
        limit: plan.limits.passwords,
        plan,
        what: "passwords",
    })
}
