use std::time::Duration;

use core_config::{ConfigError, FromEnv, env_or_default, env_parse};
use validator::Validate;

use crate::transport::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "http://text-embeddings-inference:8080";
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the TEI backend.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct TeiConfig {
    #[validate(url)]
    pub base_url: String,
    /// Per-attempt HTTP timeout
    #[validate(custom(function = "validate_positive_duration"))]
    pub timeout: Duration,
    pub max_retries: u32,
    /// Wait before the first retry
    pub retry_delay: Duration,
    /// Idle connections kept per host
    #[validate(range(min = 1))]
    pub max_connections: usize,
    pub user_agent: String,
}

fn validate_positive_duration(value: &Duration) -> Result<(), validator::ValidationError> {
    if value.is_zero() {
        return Err(validator::ValidationError::new("positive_duration")
            .with_message("must be greater than zero".into()));
    }
    Ok(())
}

impl Default for TeiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            max_connections: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl TeiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay)
    }
}

impl FromEnv for TeiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            base_url: env_or_default("TEI_BASE_URL", DEFAULT_BASE_URL),
            timeout: Duration::from_secs(env_parse(
                "TEI_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )?),
            max_retries: env_parse("TEI_MAX_RETRIES", defaults.max_retries)?,
            retry_delay: Duration::from_millis(env_parse(
                "TEI_RETRY_DELAY_MS",
                defaults.retry_delay.as_millis() as u64,
            )?),
            max_connections: env_parse("TEI_MAX_CONNECTIONS", defaults.max_connections)?,
            user_agent: env_or_default("TEI_USER_AGENT", DEFAULT_USER_AGENT),
        };

        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }
}
