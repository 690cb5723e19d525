//! Configuration loading for the LockerRoom client.
//!
//! The file path comes from `--config <path>` or `LOCKERROOM_CONFIG`.
//! Every section is required; values are checked by [`ClientConfig::validate`].

use lockerroom_cache::{CacheConfig, RetryPolicy};
use lockerroom_core::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ClientError;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub auth: AuthConfig,
    pub cache: CacheSection,
    pub retry: RetrySection,
    pub polling: PollingSection,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub bearer_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    pub stale_time_ms: u64,
    pub gc_time_ms: u64,
    pub gc_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    pub max_retries: u32,
    pub initial_ms: u64,
    pub max_ms: u64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollingSection {
    pub notifications_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `lockerroom_cache=debug,info`.
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl ClientConfig {
    pub fn load() -> Result<Self, ClientError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ClientError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ClientError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ClientError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(invalid("api_base_url", "must not be empty"));
        }
        if !(self.api_base_url.starts_with("https://") || self.api_base_url.starts_with("http://"))
        {
            return Err(invalid("api_base_url", "must be an http(s) URL"));
        }
        if self.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms", "must be > 0"));
        }
        if self.auth.bearer_token.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "auth.bearer_token".to_string(),
            });
        }
        if self.cache.gc_interval_ms == 0 {
            return Err(invalid("cache.gc_interval_ms", "must be > 0"));
        }
        if self.cache.gc_time_ms < self.cache.stale_time_ms {
            return Err(invalid("cache.gc_time_ms", "must be >= cache.stale_time_ms"));
        }
        if self.retry.initial_ms == 0 {
            return Err(invalid("retry.initial_ms", "must be > 0"));
        }
        if self.retry.max_ms < self.retry.initial_ms {
            return Err(invalid("retry.max_ms", "must be >= initial_ms"));
        }
        if self.retry.multiplier < 1.0 {
            return Err(invalid("retry.multiplier", "must be >= 1.0"));
        }
        if self.retry.max_retries > 10 {
            return Err(invalid("retry.max_retries", "must be <= 10"));
        }
        if self.polling.notifications_ms < 1_000 {
            return Err(invalid("polling.notifications_ms", "must be >= 1000"));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(invalid("logging.filter", "must not be empty"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_millis(self.retry.initial_ms),
            Duration::from_millis(self.retry.max_ms),
            self.retry.multiplier,
        )
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_stale_time(Duration::from_millis(self.cache.stale_time_ms))
            .with_gc_time(Duration::from_millis(self.cache.gc_time_ms))
            .with_gc_interval(Duration::from_millis(self.cache.gc_interval_ms))
            .with_retry(self.retry_policy())
    }

    pub fn notification_poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.notifications_ms)
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("LOCKERROOM_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
