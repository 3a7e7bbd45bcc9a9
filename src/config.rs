use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

/// Runtime configuration.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `./config.toml` (optional)
/// 3. `MAZE_*` environment variables, sections split on `__`
///    (e.g. `MAZE_SECURITY__ADMIN_KEY`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub security: SecurityConfig,
    pub breach: BreachConfig,
    pub billing: BillingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub loglevel: String,
    pub max_connections: u32,
    /// Maximum accepted request body, in bytes.
    pub body_limit: usize,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite:maze_vault.db".to_string(),
            loglevel: "info".to_string(),
            max_connections: 5,
            body_limit: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Shared secret for `/api/admin/*`. Empty disables admin access.
    pub admin_key: String,
    pub session_ttl_hours: i64,
    pub max_failed_logins: i64,
    pub lockout_minutes: i64,
    pub min_password_length: usize,
    /// Accept the legacy `X-User-ID` header as authentication.
    pub trust_user_id_header: bool,
    /// Argon2id cost for new account hashes.
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            admin_key: String::new(),
            session_ttl_hours: 24,
            max_failed_logins: 5,
            lockout_minutes: 15,
            min_password_length: 8,
            trust_user_id_header: false,
            argon2_memory_kib: 19 * 1024,
            argon2_iterations: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreachConfig {
    pub api_url: Url,
    pub api_key: Option<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub requests_per_minute: u32,
}

impl Default for BreachConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse("https://haveibeenpwned.com/api/v3")
                .expect("default HIBP url is valid"),
            api_key: None,
            user_agent: "MazePasswordManager/1.0".to_string(),
            timeout_secs: 10,
            max_retries: 2,
            requests_per_minute: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub payee_vpa: String,
    pub payee_name: String,
    pub order_ttl_minutes: i64,
    pub subscription_days: i64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            payee_vpa: "agies@ybl".to_string(),
            payee_name: "Maze Password Manager".to_string(),
            order_ttl_minutes: 30,
            subscription_days: 30,
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("MAZE_").split("__"))
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn admin_enabled(&self) -> bool {
        !self.security.admin_key.is_empty()
    }
}
