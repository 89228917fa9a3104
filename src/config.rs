//! Environment-injected engine configuration.
//!
//! All security-relevant settings (webhook destination, HMAC secret, host
//! allow-list) come from the environment. In production mode a missing
//! secret or an empty allow-list is a hard startup error; there is no
//! default that silently disables a security check.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub bind_addr: String,
    pub webhook_url: String,
    pub webhook_secret: String,
    pub allowed_hosts: Vec<String>,
    pub storage_prefix: String,
    pub checkpoint_dir: Option<PathBuf>,
    pub max_delivery_attempts: u32,
    pub delivery_base_backoff: Duration,
    pub delivery_max_backoff: Duration,
    pub attempt_timeout: Duration,
    pub production: bool,
    pub expose_errors: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            webhook_url: String::new(),
            webhook_secret: String::new(),
            allowed_hosts: vec![],
            storage_prefix: "memory://artifacts".into(),
            checkpoint_dir: None,
            max_delivery_attempts: 3,
            delivery_base_backoff: Duration::from_secs(2),
            delivery_max_backoff: Duration::from_secs(10),
            attempt_timeout: Duration::from_secs(15),
            production: false,
            expose_errors: true,
        }
    }
}

fn env_var(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env_var(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var: name,
                value: raw,
            }),
    }
}

impl EngineConfig {
    /// Load configuration from `QUOTEFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = env_var("QUOTEFLOW_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(url) = env_var("QUOTEFLOW_WEBHOOK_URL") {
            config.webhook_url = url;
        }
        if let Some(secret) = env_var("QUOTEFLOW_WEBHOOK_SECRET") {
            config.webhook_secret = secret;
        }
        if let Some(hosts) = env_var("QUOTEFLOW_ALLOWED_HOSTS") {
            config.allowed_hosts = hosts
                .split(',')
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect();
        }
        if let Some(prefix) = env_var("QUOTEFLOW_STORAGE_PREFIX") {
            config.storage_prefix = prefix;
        }
        if let Some(dir) = env_var("QUOTEFLOW_CHECKPOINT_DIR") {
            config.checkpoint_dir = Some(PathBuf::from(dir));
        }
        if let Some(attempts) = env_parse::<u32>("QUOTEFLOW_DELIVERY_MAX_ATTEMPTS")? {
            config.max_delivery_attempts = attempts;
        }
        if let Some(secs) = env_parse::<u64>("QUOTEFLOW_DELIVERY_BASE_BACKOFF_SECS")? {
            config.delivery_base_backoff = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("QUOTEFLOW_DELIVERY_MAX_BACKOFF_SECS")? {
            config.delivery_max_backoff = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("QUOTEFLOW_ATTEMPT_TIMEOUT_SECS")? {
            config.attempt_timeout = Duration::from_secs(secs);
        }

        config.production =
            env_var("QUOTEFLOW_ENV").map(|v| v == "production").unwrap_or(false);
        config.expose_errors = !config.production
            || env_var("QUOTEFLOW_EXPOSE_ERRORS").map(|v| v == "1").unwrap_or(false);

        config.validate()?;
        Ok(config)
    }

    /// Production refuses to start without the full security configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.production {
            if self.webhook_url.is_empty() {
                return Err(ConfigError::MissingVar("QUOTEFLOW_WEBHOOK_URL"));
            }
            if self.webhook_secret.is_empty() {
                return Err(ConfigError::MissingVar("QUOTEFLOW_WEBHOOK_SECRET"));
            }
            if self.allowed_hosts.is_empty() {
                return Err(ConfigError::MissingVar("QUOTEFLOW_ALLOWED_HOSTS"));
            }
        }
        Ok(())
    }

    /// Loggable summary with the secret redacted.
    pub fn redacted_summary(&self) -> String {
        format!(
            "bind={} webhook_url={} secret={} allowed_hosts={:?} storage_prefix={} production={}",
            self.bind_addr,
            if self.webhook_url.is_empty() {
                "<unset>"
            } else {
                &self.webhook_url
            },
            if self.webhook_secret.is_empty() {
                "<unset>"
            } else {
                "<redacted>"
            },
            self.allowed_hosts,
            self.storage_prefix,
            self.production,
        )
    }
}
