//! Core types: levels, values, the registry and the loggers it hands out

pub mod config;
pub mod error;
pub mod field;
pub mod log_context;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod registry;

pub use config::{LoggerConfig, ENV_FORMATTER, ENV_LEVEL};
pub use error::{LoggerError, Result};
pub use field::{key_value_pairs, validate_key_values, FieldValue, MAX_VALUE_LEN};
pub use log_context::LogContext;
pub use log_level::LogLevel;
pub use logger::{Logger, NilLogger, PackageLogger};
pub use metrics::WriterMetrics;
pub use overflow_policy::OverflowPolicy;
pub use registry::{ErrorHook, ExitHook, Registry, RepoLogLevel, RepoLogger, WILDCARD};
