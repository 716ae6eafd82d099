//! Core configuration
//!
//! Loaded once at startup from a JSON file; every key is optional and
//! falls back to its default. The loaded value is validated before use and
//! is read-only afterwards.

mod errors;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event, Event, Logger, Severity};

pub use errors::{ConfigError, ConfigResult};

/// Configuration of the record core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Page size used when a query does not set a limit
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Upper bound for any query limit
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// String forms a boolean field reads as `true`
    #[serde(default = "default_true_strings")]
    pub true_strings: Vec<String>,

    /// Minimum log severity: trace, info, warn, error or fatal
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Bound of the mirror refresh channel
    #[serde(default = "default_refresh_queue_capacity")]
    pub refresh_queue_capacity: usize,
}

fn default_page_size() -> usize {
    30
}
fn default_max_page_size() -> usize {
    100
}
fn default_true_strings() -> Vec<String> {
    ["true", "True", "1", "yes"].iter().map(|s| s.to_string()).collect()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_refresh_queue_capacity() -> usize {
    1024
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            true_strings: default_true_strings(),
            log_level: default_log_level(),
            refresh_queue_capacity: default_refresh_queue_capacity(),
        }
    }
}

impl CoreConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config = Self::from_json_str(&content)?;
        log_event(
            Event::ConfigLoaded,
            &[("path", &path.display().to_string())],
        );
        Ok(config)
    }

    /// Parse and validate configuration JSON
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: CoreConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.default_page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "default_page_size",
                reason: "must be > 0".into(),
            });
        }

        if self.max_page_size < self.default_page_size {
            return Err(ConfigError::Invalid {
                field: "max_page_size",
                reason: format!("must be >= default_page_size ({})", self.default_page_size),
            });
        }

        if self.true_strings.is_empty() {
            return Err(ConfigError::Invalid {
                field: "true_strings",
                reason: "must not be empty".into(),
            });
        }

        if self.refresh_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "refresh_queue_capacity",
                reason: "must be > 0".into(),
            });
        }

        self.severity()?;
        Ok(())
    }

    fn severity(&self) -> ConfigResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| ConfigError::Invalid {
            field: "log_level",
            reason: format!("unknown level '{}'", self.log_level),
        })
    }

    /// Installs the configured log threshold process-wide.
    pub fn apply_logging(&self) -> ConfigResult<()> {
        Logger::set_min_severity(self.severity()?);
        Ok(())
    }

    /// Resolves a requested query limit against the page size bounds.
    pub fn page_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size)
    }

    /// Returns true if `s` is one of the configured true strings.
    pub fn is_true_string(&self, s: &str) -> bool {
        self.true_strings.iter().any(|t| t == s)
    }
}
