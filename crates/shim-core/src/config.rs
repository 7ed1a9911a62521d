//! Shim configuration types

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable naming a JSON configuration file
pub const CONFIG_ENV: &str = "FILESHIM_CONFIG";

/// Environment variable overriding the default backend URI
pub const BACKEND_ENV: &str = "FILESHIM_BACKEND";

/// Environment variable overriding the log filter
pub const LOG_ENV: &str = "FILESHIM_LOG";

/// Main shim configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    /// First descriptor handed out; kept above the harness's own descriptors
    pub descriptor_base: i32,

    /// How reads that transfer fewer bytes than requested are reported
    pub short_read: ShortReadPolicy,

    /// Backend configured at construction time, if any
    pub default_backend: Option<String>,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            descriptor_base: 42,
            short_read: ShortReadPolicy::default(),
            default_backend: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl ShimConfig {
    /// Parse a configuration from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ShimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::InvalidConfig {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        let config = Self::from_json_str(&json)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Build a configuration from the process environment
    ///
    /// Reads the file named by `FILESHIM_CONFIG` when set, then applies
    /// `FILESHIM_BACKEND` and `FILESHIM_LOG` overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Ok(uri) = std::env::var(BACKEND_ENV) {
            if !uri.is_empty() {
                config.default_backend = Some(uri);
            }
        }
        if let Ok(filter) = std::env::var(LOG_ENV) {
            if !filter.is_empty() {
                config.logging.filter = filter;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.descriptor_base <= 0 {
            return Err(Error::InvalidConfig {
                message: format!(
                    "descriptor_base must be positive, got {}",
                    self.descriptor_base
                ),
            });
        }
        if matches!(self.default_backend.as_deref(), Some("")) {
            return Err(Error::InvalidConfig {
                message: "default_backend must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Policy for reads that return fewer bytes than requested
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortReadPolicy {
    /// Report the number of bytes actually transferred
    #[default]
    Report,

    /// Treat any short read as an I/O fault
    Reject,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive string, used when `RUST_LOG` is unset
    pub filter: String,

    /// Emit ANSI colors
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "fileshim=info,storage=info".to_string(),
            ansi: false,
        }
    }
}
