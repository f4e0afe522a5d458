//! Run configuration for the vdsotest harness.
//!
//! Supports TOML deserialization with sensible defaults; command-line flags
//! always override file values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable consulted when no `--config` flag is given.
pub const CONFIG_ENV_VAR: &str = "VDSOTEST_CONFIG";

/// Default run duration for a timed phase.
pub const DEFAULT_DURATION: Duration = Duration::from_secs(1);

/// Default failure threshold before a run self-terminates.
pub const DEFAULT_MAX_FAILS: u64 = 10;

/// Harness configuration loaded from file or built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Duration of a timed test phase.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Maximum number of failures before terminating the run.
    pub max_fails: u64,

    /// Default log level when neither --verbose nor --debug is given.
    pub log_level: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            max_fails: DEFAULT_MAX_FAILS,
            log_level: String::from("warn"),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Resolve configuration for this run.
    ///
    /// Resolution priority (first hit wins):
    /// 1. Explicit path (the `--config` flag)
    /// 2. `VDSOTEST_CONFIG` environment variable
    /// 3. Built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            info!(?path, "Loading config from command-line argument");
            return Self::from_file(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                info!(?path, "Loading config from VDSOTEST_CONFIG");
                return Self::from_file(&path);
            }
            warn!(
                path = %env_path,
                "VDSOTEST_CONFIG set but file does not exist, using defaults"
            );
        }

        Ok(Self::default())
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
