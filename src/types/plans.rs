use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Subscription tier identifier, stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PlanId {
    Free,
    Premium,
    Business,
    Enterprise,
}

impl PlanId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanId::Free => "free",
            PlanId::Premium => "premium",
            PlanId::Business => "business",
            PlanId::Enterprise => "enterprise",
        }
    }

    pub fn plan(&self) -> &'static Plan {
        PLANS
            .iter()
            .find(|p| p.id == *self)
            .unwrap_or(&PLANS[0])
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(PlanId::Free),
            "premium" => Ok(PlanId::Premium),
            "business" => Ok(PlanId::Business),
            "enterprise" => Ok(PlanId::Enterprise),
            other => Err(format!("unknown plan `{other}`")),
        }
    }
}

/// Per-plan quotas; `None` means unlimited.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlanLimits {
    pub vaults: Option<i64>,
    pub passwords: Option<i64>,
    pub devices: Option<i64>,
    pub team_members: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: &'static str,
    /// Monthly price in paise (1/100 INR).
    pub price_paise: i64,
    pub currency: &'static str,
    pub interval: &'static str,
    pub features: Vec<&'static str>,
    pub limits: PlanLimits,
}

impl Plan {
    pub fn is_paid(&self) -> bool {
        self.price_paise > 0
    }

    /// Price formatted in rupees with two decimals, as UPI expects.
    pub fn price_rupees(&self) -> String {
        format_paise(self.price_paise)
    }
}

pub fn format_paise(paise: i64) -> String {
    format!("{}.{:02}", paise / 100, paise % 100)
}

const UNLIMITED: PlanLimits = PlanLimits {
    vaults: None,
    passwords: None,
    devices: None,
    team_members: None,
};

pub static PLANS: LazyLock<Vec<Plan>> = LazyLock::new(|| {
    vec![
        Plan {
            id: PlanId::Free,
            name: "Free Plan",
            price_paise: 0,
            currency: "INR",
            interval: "month",
            features: vec![
                "50 passwords",
                "Basic vaults",
                "Chrome extension",
                "Standard support",
            ],
            limits: PlanLimits {
                vaults: Some(3),
                passwords: Some(50),
                devices: Some(1),
                team_members: Some(1),
            },
        },
        Plan {
            id: PlanId::Premium,
            name: "Premium Plan",
            price_paise: 29_900,
            currency: "INR",
            interval: "month",
            features: vec![
                "Unlimited passwords",
                "Advanced vaults",
                "Mobile apps",
                "Dark web monitoring",
                "Priority support",
                "Advanced 2FA",
            ],
            limits: PlanLimits {
                team_members: Some(5),
                ..UNLIMITED
            },
        },
        Plan {
            id: PlanId::Business,
            name: "Business Plan",
            price_paise: 74_900,
            currency: "INR",
            interval: "month",
            features: vec![
                "Everything in Premium",
                "Team management",
                "SSO integration",
                "API access",
                "AI security features",
                "Compliance reporting",
                "24/7 support",
            ],
            limits: UNLIMITED,
        },
        Plan {
            id: PlanId::Enterprise,
            name: "Enterprise Plan",
            price_paise: 199_900,
            currency: "INR",
            interval: "month",
            features: vec![
                "Everything in Business",
                "Custom integrations",
                "Dedicated support",
                "On-premise options",
                "Custom security policies",
                "Advanced analytics",
                "SLA guarantees",
            ],
            limits: UNLIMITED,
        },
    ]
});
