use crate::api::hibp_api::HibpApi;
use crate::config::BreachConfig;
use crate::error::MazeError;
use crate::types::breach::{Breach, BreachReport};
use backon::ExponentialBuilder;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

fn default_retry_policy(max_retries: usize) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(3))
        .with_max_times(max_retries)
        .with_jitter()
}

/// Have I Been Pwned lookups behind a shared client and a process-wide
/// rate limit.
#[derive(Clone)]
pub struct BreachService {
    client: reqwest::Client,
    api_url: Url,
    api_key: Option<String>,
    limiter: Arc<DefaultDirectRateLimiter>,
    retry_policy: ExponentialBuilder,
}

impl BreachService {
    pub fn new(cfg: &BreachConfig) -> Result<Self, MazeError> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()?;
        let per_minute = NonZeroU32::new(cfg.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));
        let api_key = cfg
            .api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        info!(
            api_url = %cfg.api_url,
            enabled = api_key.is_some(),
            requests_per_minute = per_minute.get(),
            "breach lookup configured"
        );

        Ok(Self {
            client,
            api_url: cfg.api_url.clone(),
            api_key,
            limiter,
            retry_policy: default_retry_policy(cfg.max_retries),
        })
    }

    /// Breaches listing `email`. A lookup over the per-minute quota fails
    /// immediately with `BreachRateLimited` instead of queueing.
    pub async fn breaches_for(&self, email: &str) -> Result<Vec<Breach>, MazeError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(MazeError::BreachLookupDisabled)?;
        if self.limiter.check().is_err() {
            warn!("breach lookup quota exhausted");
            return Err(MazeError::BreachRateLimited);
        }
        debug!("querying HIBP breachedaccount");
        let breaches = HibpApi::breached_account(
            &self.client,
            &self.api_url,
            api_key,
            email,
            self.retry_policy,
        )
        .await?;
        Ok(breaches.into_iter().map(Breach::from).collect())
    }

    pub async fn check(&self, email: &str) -> Result<BreachReport, MazeError> {
        let breaches = self.breaches_for(email).await?;
        Ok(BreachReport::new(email.to_string(), breaches))
    }
}
