//! Configuration management for the sync runtime.

use favorites_engine::RetryPolicy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, loadable from environment variables.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Prefix of every local storage key
    pub namespace: String,
    /// Directory used by the file-backed local store
    pub data_dir: PathBuf,
    /// Base URL of the remote favorites API
    pub remote_url: Option<String>,
    /// Delay before a queued write may be sent, so the UI paints first
    pub write_delay: Duration,
    /// Backoff for failed remote writes
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            namespace: "favorites".to_string(),
            data_dir: PathBuf::from(".favorites"),
            remote_url: None,
            write_delay: Duration::from_millis(100),
            retry: RetryPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let namespace = env::var("FAVORITES_NAMESPACE").unwrap_or(defaults.namespace);
        if namespace.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }

        let data_dir = env::var("FAVORITES_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let remote_url = env::var("FAVORITES_REMOTE_URL").ok();

        let write_delay = match env::var("FAVORITES_WRITE_DELAY_MS") {
            Ok(raw) => Duration::from_millis(parse_number("FAVORITES_WRITE_DELAY_MS", &raw)?),
            Err(_) => defaults.write_delay,
        };

        let mut retry = defaults.retry;
        if let Ok(raw) = env::var("FAVORITES_RETRY_MAX") {
            retry.max_retries = Some(parse_number("FAVORITES_RETRY_MAX", &raw)?);
        }
        if let Ok(raw) = env::var("FAVORITES_RETRY_INITIAL_MS") {
            retry.initial_delay_ms = parse_number("FAVORITES_RETRY_INITIAL_MS", &raw)?;
        }
        if let Ok(raw) = env::var("FAVORITES_RETRY_MAX_DELAY_MS") {
            retry.max_delay_ms = parse_number("FAVORITES_RETRY_MAX_DELAY_MS", &raw)?;
        }

        Ok(Self {
            namespace,
            data_dir,
            remote_url,
            write_delay,
            retry,
        })
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_write_delay(mut self, write_delay: Duration) -> Self {
        self.write_delay = write_delay;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber(name))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("FAVORITES_NAMESPACE must not be empty")]
    EmptyNamespace,

    #[error("Invalid {0} value")]
    InvalidNumber(&'static str),

    #[error("FAVORITES_REMOTE_URL environment variable is required")]
    MissingRemoteUrl,
}
