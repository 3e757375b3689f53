//! Bridge from the `log` crate
//!
//! Records from the `log` macros, in this crate's users or in their
//! dependencies, are routed into one [`PackageLogger`]: gated by that
//! package's level and rendered by the registry's formatter with the
//! message under the `log` key. The `log` source position becomes the
//! entry's call site.

use crate::core::error::{LoggerError, Result};
use crate::core::field::FieldValue;
use crate::core::log_level::LogLevel;
use crate::core::logger::{Logger, PackageLogger};
use crate::core::registry::Registry;
use crate::formatters::CallSite;
use log::{LevelFilter, Log, Metadata, Record as LogRecord};
use std::sync::Arc;

/// Repository `log` records are attributed to by [`LogBridge::for_registry`]
pub const BRIDGE_REPO: &str = "log";

/// Package `log` records are attributed to by [`LogBridge::for_registry`]
pub const BRIDGE_PACKAGE: &str = "log";

/// Key the record's message is logged under
pub const MESSAGE_KEY: &str = "log";

/// `log::Log` implementation forwarding to a package logger
pub struct LogBridge {
    logger: PackageLogger,
}

impl LogBridge {
    pub fn new(logger: PackageLogger) -> Self {
        Self { logger }
    }

    /// Bridge into the `log` package of the `log` repository of `registry`
    pub fn for_registry(registry: &Arc<Registry>) -> Self {
        Self::new(registry.package_logger(BRIDGE_REPO, BRIDGE_PACKAGE))
    }

    pub fn logger(&self) -> &PackageLogger {
        &self.logger
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.logger.level_at(map_level(metadata.level()))
    }

    fn log(&self, record: &LogRecord<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let message = FieldValue::String(record.args().to_string());
        let site = CallSite {
            file: record.file().unwrap_or_else(|| record.target()),
            line: record.line().unwrap_or(0),
        };
        self.logger
            .kv_at(map_level(record.level()), site, &[(MESSAGE_KEY, &message)]);
    }

    fn flush(&self) {
        self.logger.flush();
    }
}

/// Map `log` levels onto the level of the same name
fn map_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warning,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug => LogLevel::Debug,
        log::Level::Trace => LogLevel::Trace,
    }
}

/// Install a [`LogBridge`] for `registry` as the `log` crate's logger.
///
/// The `log` max level is left wide open; gating is done by the bridged
/// package's level, which can change at runtime.
///
/// # Errors
///
/// Returns an error if a `log` logger is already installed.
///
/// # Example
///
/// ```no_run
/// use repo_logger::compat::init_log_bridge;
/// use repo_logger::Registry;
///
/// init_log_bridge(&Registry::global()).unwrap();
/// log::info!("routed through the registry");
/// ```
pub fn init_log_bridge(registry: &Arc<Registry>) -> Result<()> {
    log::set_boxed_logger(Box::new(LogBridge::for_registry(registry)))
        .map_err(|e| LoggerError::config("log bridge", e.to_string()))?;
    log::set_max_level(LevelFilter::Trace);
    Ok(())
}
