use crate::client::credentials::CredentialsMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment variable holding an inline TOML configuration document.
pub const CONFIG_ENV: &str = "FOSS_SINK_CONFIG";

/// The primary stream accepts at most this many records per bulk put.
pub const MAX_RECORDS_PER_PUT: usize = 500;

/// The primary stream caps a whole bulk-put request at 5 MiB.
const MAX_PUT_REQUEST_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("accessKey and secretKey must both be sentinels (default/iam/env) or both literal keys")]
    MixedCredentials,
    #[error("file error: {0}")]
    File(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Sink configuration. Document keys are camelCase: `streamName`,
/// `byteLimit`, `recordLimit`, `timeLimit`, `minBackoff`, `maxBackoff`,
/// `fallbackQueueName`, `threadPoolSize`, ...
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SinkConfig {
    /// Primary stream identifier.
    pub stream_name: String,

    /// Optional spillover queue; absence disables the fallback path and
    /// raises the accepted payload ceiling accordingly.
    pub fallback_queue_name: Option<String>,

    pub region: String,

    /// `"default"`, `"iam"`, `"env"`, or a literal access key id. Both
    /// credential fields must use the same style.
    pub access_key: String,
    pub secret_key: String,

    /// Flush once this many buffered payload bytes accumulate.
    pub byte_limit: usize,

    /// Flush once this many events accumulate.
    pub record_limit: usize,

    /// Flush when the buffer has not drained for this long (milliseconds).
    pub time_limit: u64,

    /// Bounds for retry waits (milliseconds).
    pub min_backoff: u64,
    pub max_backoff: u64,

    /// Parallelism for submitter tasks.
    pub thread_pool_size: usize,

    /// Endpoint override, e.g. for a local stack.
    pub custom_endpoint: Option<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            stream_name: String::new(),
            fallback_queue_name: None,
            region: "us-east-1".to_string(),
            access_key: "default".to_string(),
            secret_key: "default".to_string(),
            byte_limit: 4_194_304,
            record_limit: MAX_RECORDS_PER_PUT,
            time_limit: 5000,
            min_backoff: 3000,
            max_backoff: 600_000,
            thread_pool_size: 10,
            custom_endpoint: None,
        }
    }
}

impl SinkConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: SinkConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads an inline TOML document from `FOSS_SINK_CONFIG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let document = std::env::var(CONFIG_ENV)
            .map_err(|_| ConfigError::Invalid(format!("{CONFIG_ENV} is not set")))?;
        let config: SinkConfig = toml::from_str(&document)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream_name.is_empty() {
            return Err(ConfigError::Invalid(
                "streamName must not be empty".to_string(),
            ));
        }
        if self.record_limit == 0 || self.record_limit > MAX_RECORDS_PER_PUT {
            return Err(ConfigError::Invalid(format!(
                "recordLimit must be between 1 and {MAX_RECORDS_PER_PUT}, got {}",
                self.record_limit
            )));
        }
        if self.byte_limit == 0 || self.byte_limit > MAX_PUT_REQUEST_BYTES {
            return Err(ConfigError::Invalid(format!(
                "byteLimit must be between 1 and {MAX_PUT_REQUEST_BYTES}, got {}",
                self.byte_limit
            )));
        }
        if self.time_limit == 0 {
            return Err(ConfigError::Invalid(
                "timeLimit must be greater than 0".to_string(),
            ));
        }
        if self.min_backoff == 0 {
            return Err(ConfigError::Invalid(
                "minBackoff must be greater than 0".to_string(),
            ));
        }
        if self.min_backoff > self.max_backoff {
            return Err(ConfigError::Invalid(format!(
                "minBackoff ({}) must not exceed maxBackoff ({})",
                self.min_backoff, self.max_backoff
            )));
        }
        if self.thread_pool_size == 0 {
            return Err(ConfigError::Invalid(
                "threadPoolSize must be greater than 0".to_string(),
            ));
        }
        CredentialsMode::from_pair(&self.access_key, &self.secret_key)?;
        Ok(())
    }
}
