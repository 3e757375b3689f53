//! Logging configuration
//!
//! [`LoggerConfig`] collects the settings a program usually reads from its
//! own configuration file or the environment, and applies them to a
//! [`Registry`] in one call.

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::registry::{Registry, RepoLogLevel};
use crate::formatters::FormatterKind;
use serde::{Deserialize, Serialize};

/// Environment variable holding the initial global level
pub const ENV_LEVEL: &str = "XLOG_LEVEL";

/// Environment variable selecting the formatter
pub const ENV_FORMATTER: &str = "XLOG_FORMATTER";

/// Registry settings
///
/// # Example
///
/// ```
/// use repo_logger::{LoggerConfig, LogLevel, Registry};
///
/// let config = LoggerConfig::from_json(r#"{
///     "level": "NOTICE",
///     "levels": [{"repo": "acme", "package": "db", "level": "DEBUG"}]
/// }"#).unwrap();
/// assert_eq!(config.level, Some(LogLevel::Notice));
///
/// let registry = Registry::new();
/// config.apply(&registry);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Level for every registered package and for packages registered later
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,

    /// Formatter writing to stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatter: Option<FormatterKind>,

    /// Per-repository and per-package levels, applied after `level`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<RepoLogLevel>,
}

impl LoggerConfig {
    /// Read `XLOG_LEVEL` and `XLOG_FORMATTER`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read `XLOG_LEVEL` and `XLOG_FORMATTER` independently of each other.
    ///
    /// A variable that fails to parse is returned as an error and leaves
    /// only its own setting empty.
    pub fn from_env_lenient() -> (Self, Vec<LoggerError>) {
        Self::from_lookup_lenient(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any variable source. Unset and blank
    /// variables leave the matching setting empty.
    ///
    /// # Errors
    ///
    /// Returns the first variable that fails to parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (config, mut errors) = Self::from_lookup_lenient(lookup);
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors.remove(0))
        }
    }

    /// Like [`from_lookup`](Self::from_lookup), but a bad variable does not
    /// discard the other one.
    pub fn from_lookup_lenient<F>(lookup: F) -> (Self, Vec<LoggerError>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = LoggerConfig::default();
        let mut errors = Vec::new();

        if let Some(level) = set(ENV_LEVEL) {
            match level.parse() {
                Ok(level) => config.level = Some(level),
                Err(e) => errors.push(e),
            }
        }
        if let Some(formatter) = set(ENV_FORMATTER) {
            match formatter.parse() {
                Ok(kind) => config.formatter = Some(kind),
                Err(e) => errors.push(e),
            }
        }
        (config, errors)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: FormatterKind) -> Self {
        self.formatter = Some(formatter);
        self
    }

    #[must_use]
    pub fn with_repo_level(mut self, level: RepoLogLevel) -> Self {
        self.levels.push(level);
        self
    }

    /// Apply to `registry`: level first, then formatter, then the
    /// per-package list.
    pub fn apply(&self, registry: &Registry) {
        if let Some(level) = self.level {
            registry.set_default_level(level);
            registry.set_global_level(level);
        }
        if let Some(kind) = self.formatter {
            registry.set_formatter(kind.build(std::io::stderr()));
        }
        if !self.levels.is_empty() {
            registry.set_repo_levels(&self.levels);
        }
    }
}
