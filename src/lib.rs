//! # Repo Logger
//!
//! Leveled logging organized by repository and package, with pluggable
//! formatters and a background-flushing writer for slow sinks.
//!
//! ## Features
//!
//! - **Per-package levels**: every package of every repository has its own
//!   level, changed at runtime through the [`Registry`] or a [`RepoLogger`]
//! - **One formatter**: pretty, `key=value`, JSON or nothing, swapped
//!   atomically
//! - **Channel writer**: a bounded queue drained by a dedicated thread,
//!   flushed periodically and drained on stop
//! - **Rotated files**: size or age based rotation, retention and gzip
//! - **`log` bridge**: records from the `log` macros routed into a package
//!   logger (feature `log-compat`)
//!
//! ## Example
//!
//! ```
//! use repo_logger::prelude::*;
//!
//! let registry = Registry::new();
//! let logger = registry.package_logger("github.com/acme/api", "server");
//!
//! logger.info(&["listening".into(), 8080.into()]);
//! logger.kv(LogLevel::Warning, &["queue".into(), "jobs".into(), "depth".into(), 912.into()]);
//!
//! registry.set_package_level("github.com/acme/api", "server", LogLevel::Debug);
//! logger.debugf(format_args!("{} workers idle", 3));
//! ```

pub mod appenders;
pub mod compat;
pub mod core;
pub mod formatters;
pub mod macros;

pub mod prelude {
    pub use crate::appenders::{ChannelWriter, LogRotator, RotateConfig, Sink};
    pub use crate::core::{
        FieldValue, LogContext, LogLevel, Logger, LoggerConfig, LoggerError, NilLogger,
        PackageLogger, Registry, RepoLogLevel, RepoLogger, Result,
    };
    pub use crate::formatters::{Formatter, FormatterKind, FormatterOption};
}

pub use appenders::{
    ChannelWriter, ChannelWriterBuilder, LogRotator, MultiSink, RotateConfig, RotatingFileWriter,
    RotationPolicy, RotationStrategy, SharedSink, Sink, WriterState,
};
pub use core::{
    FieldValue, LogContext, LogLevel, Logger, LoggerConfig, LoggerError, NilLogger,
    OverflowPolicy, PackageLogger, Registry, RepoLogLevel, RepoLogger, Result, WriterMetrics,
};
pub use formatters::{
    CallSite, Formatter, FormatterKind, FormatterOption, JsonFormatter, NilFormatter,
    PrettyFormatter, Record, StringFormatter,
};

/// Logger of `pkg` in `repo` from the global registry
pub fn package_logger(repo: &str, pkg: &str) -> PackageLogger {
    Registry::global().package_logger(repo, pkg)
}
