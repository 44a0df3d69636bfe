//! Configuration file support for southboundd
//!
//! Loads and validates the daemon configuration from a TOML file.
//! Default location: /etc/netvirt/southboundd.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use netvirt_orch_common::QueueConfig;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/netvirt/southboundd.toml";

const QUEUE_NAME: &str = "southbound";

/// Event loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Heartbeat interval in milliseconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,

    /// Maximum number of events handled per drain
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Capacity of the producer channel
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level filter (`RUST_LOG` overrides it)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

/// Complete southboundd configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SouthboundConfig {
    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_heartbeat_interval() -> u64 {
    1000
}

fn default_batch_size() -> usize {
    128
}

fn default_queue_capacity() -> usize {
    4096
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval(),
            batch_size: default_batch_size(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl SouthboundConfig {
    /// Load and validate configuration from file
    ///
    /// Returns `None` if the file does not exist; the caller decides on
    /// defaults and reports the fallback once logging is up.
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<Self>, ConfigError> {
        let path = path.as_ref();

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(Some(config))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.daemon.heartbeat_interval_ms)
    }

    /// Handler queue settings; the dispatcher reads its batch size from here.
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::new(QUEUE_NAME).with_batch_size(self.daemon.batch_size)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.heartbeat_interval_ms == 0 {
            return Err(ConfigError::invalid("daemon.heartbeat_interval_ms", "must be > 0"));
        }
        if self.daemon.batch_size == 0 {
            return Err(ConfigError::invalid("daemon.batch_size", "must be > 0"));
        }
        if self.daemon.queue_capacity == 0 {
            return Err(ConfigError::invalid("daemon.queue_capacity", "must be > 0"));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid("logging.level", "must not be empty"));
        }
        Ok(())
    }
}
