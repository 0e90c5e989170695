//! Configuration module for scorecast-server.
//!
//! Handles loading configuration from the TOML file and CLI overrides, and
//! converts it into the runtime types the core components are built from.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{SchedulerConfig, ScoreSourceConfig, ServerConfig, StreamConfig};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid URL for {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub score_source: ScoreSourceConfig,
    pub stream: StreamConfig,
    pub scheduler: SchedulerConfig,
    pub mock_enabled: bool,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read, override, validate and convert the configuration.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let file_config: FileConfig = toml::from_str(&config_content)?;
        self.build(file_config)
    }

    fn build(&self, mut file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;

        let base_url = parse_url("score_source.base_url", &file_config.score_source.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::ValidationError(format!(
                "score_source.base_url {base_url} cannot be used as a base URL"
            )));
        }
        let rest_url = parse_url("stream.rest_url", &file_config.stream.rest_url)?;

        let source = file_config.score_source;
        let stream = file_config.stream;
        let scheduler = file_config.scheduler;

        Ok(LoadedConfig {
            server: ServerConfig {
                listen: file_config.server.listen,
            },
            score_source: ScoreSourceConfig {
                base_url,
                timeout: Duration::from_millis(source.timeout_ms),
                max_retries: source.max_retries,
                initial_backoff: Duration::from_millis(source.initial_backoff_ms),
            },
            stream: StreamConfig {
                rest_url,
                topic: stream.topic,
                publish_timeout: Duration::from_millis(stream.publish_timeout_ms),
            },
            scheduler: SchedulerConfig {
                interval: Duration::from_secs(scheduler.interval_secs),
                pool_size: scheduler.pool_size,
                shutdown_grace: Duration::from_secs(scheduler.shutdown_grace_secs),
            },
            mock_enabled: file_config.mock.enabled,
        })
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.scheduler.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.interval_secs must be greater than zero".to_string(),
        ));
    }
    if config.scheduler.pool_size == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.pool_size must be greater than zero".to_string(),
        ));
    }
    if config.score_source.timeout_ms == 0 || config.stream.publish_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "timeouts must be greater than zero".to_string(),
        ));
    }
    if config.stream.topic.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "stream.topic must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { field, source })
}
