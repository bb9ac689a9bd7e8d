//! Config loading and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Completion ordering contract within a single tag.
///
/// Cross-tag reordering is always allowed; this only governs whether
/// responses sharing a tag must retire oldest-first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagOrdering {
    /// Responses for a tag retire strictly oldest-first.
    #[default]
    Fifo,
    /// Responses for a tag may retire in any order, identified by the
    /// sequence number they were admitted under.
    OutOfOrder,
}

/// Engine configuration.
///
/// Values are intentionally explicit about their units to avoid confusion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tag space size. Valid tags are `[0, num_tags)`.
    pub num_tags: u16,
    /// Capacity bound per tag queue.
    pub max_per_tag: usize,
    /// Staleness threshold for the watchdog, in milliseconds.
    pub timeout_ms: u64,
    /// Watchdog scan cadence, in milliseconds.
    pub watchdog_period_ms: u64,
    /// Per-tag completion ordering contract.
    pub per_tag_ordering: TagOrdering,
    /// Report a stale head record on every scan rather than once.
    pub repeat_timeout_reports: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_tags: 16,
            max_per_tag: 8,
            timeout_ms: 50_000,
            watchdog_period_ms: 1_000,
            per_tag_ordering: TagOrdering::Fifo,
            repeat_timeout_reports: true,
        }
    }
}

impl EngineConfig {
    /// Reject misconfiguration before any event is processed.
    ///
    /// This is the one fatal error class: everything after construction is
    /// reported, never thrown.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_tags == 0 {
            return Err(ConfigError::Invalid {
                field: "num_tags",
                reason: "must be greater than zero",
            });
        }
        if self.max_per_tag == 0 {
            return Err(ConfigError::Invalid {
                field: "max_per_tag",
                reason: "must be greater than zero",
            });
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms",
                reason: "must be greater than zero",
            });
        }
        if self.watchdog_period_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "watchdog_period_ms",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    pub fn watchdog_period(&self) -> Duration {
        Duration::from_millis(self.watchdog_period_ms)
    }
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid config: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Load and validate a config file.
pub fn load(path: &Path) -> Result<EngineConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: EngineConfig = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}

/// Load a config file, falling back to defaults if it is missing or broken.
pub fn load_or_default(path: &Path) -> EngineConfig {
    if !path.exists() {
        return EngineConfig::default();
    }
    match load(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("using default config: {e}");
            EngineConfig::default()
        }
    }
}
