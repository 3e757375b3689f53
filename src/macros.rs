//! Formatting macros over [`Logger`](crate::Logger).
//!
//! The level macros take a logger and `format!`-style arguments. Formatting
//! is lazy: the message is only rendered if the level passes the package's
//! gate. The caller location recorded is the macro invocation.
//!
//! # Examples
//!
//! ```
//! use repo_logger::{info, kv, warning, LogLevel, Registry};
//!
//! let registry = Registry::new();
//! let logger = registry.package_logger("github.com/acme/api", "server");
//!
//! info!(logger, "Server started");
//! let port = 8080;
//! warning!(logger, "Port {} is privileged", port);
//! kv!(logger, LogLevel::Info; "port" => port, "tls" => false);
//! ```

/// Log a formatted message at `level`.
///
/// ```
/// # use repo_logger::{LogLevel, Registry};
/// # let logger = Registry::new().package_logger("acme", "db");
/// use repo_logger::log;
/// log!(logger, LogLevel::Notice, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        use $crate::Logger as _;
        $logger.logf($level, ::std::format_args!($($arg)+))
    }};
}

/// Log a CRITICAL message. Emitted whatever the package level.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}

/// Log an ERROR message.
///
/// ```
/// # use repo_logger::Registry;
/// # let logger = Registry::new().package_logger("acme", "db");
/// use repo_logger::error;
/// error!(logger, "Connection lost after {} retries", 3);
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! notice {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Notice, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a DEBUG message.
///
/// ```
/// # use repo_logger::{LogLevel, Registry};
/// # let registry = Registry::new();
/// # registry.set_global_level(LogLevel::Debug);
/// # let logger = registry.package_logger("acme", "db");
/// use repo_logger::debug;
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log key-value pairs at `level`; keys are string literals or
/// expressions convertible into a string [`FieldValue`](crate::FieldValue).
///
/// ```
/// # use repo_logger::{LogLevel, Registry};
/// # let logger = Registry::new().package_logger("acme", "db");
/// use repo_logger::kv;
/// kv!(logger, LogLevel::Warning; "table" => "users", "rows" => 12, "slow" => true);
/// ```
#[macro_export]
macro_rules! kv {
    ($logger:expr, $level:expr; $($key:expr => $value:expr),* $(,)?) => {{
        use $crate::Logger as _;
        $logger.kv(
            $level,
            &[$($crate::FieldValue::from($key), $crate::FieldValue::from($value)),*],
        )
    }};
}
