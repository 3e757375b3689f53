//! One-call setup for logging into a rotated file
//!
//! [`LogRotator::initialize`] creates the log directory, opens
//! `<dir>/<base>.log` as a [`RotatingFileWriter`], optionally tees it into
//! an extra sink and puts a [`ChannelWriter`] in front of it, then installs
//! a formatter writing there. [`LogRotator::close`] undoes all of it once;
//! closing again is an error.

use super::channel_writer::{ChannelWriter, DEFAULT_CAPACITY, DEFAULT_FLUSH_INTERVAL};
use super::rotating_file::{RotatingFileWriter, RotationPolicy, DEFAULT_BUFFER_SIZE};
use super::{MultiSink, SharedSink, Sink};
use crate::core::error::{LoggerError, Result};
use crate::core::metrics::WriterMetrics;
use crate::core::registry::Registry;
use crate::formatters::{Formatter, FormatterKind};
use parking_lot::Mutex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Settings for [`LogRotator`]
///
/// # Example
///
/// ```no_run
/// use repo_logger::appenders::{LogRotator, RotateConfig};
/// use repo_logger::Registry;
///
/// let config = RotateConfig::new("/var/log/server", "server")
///     .with_max_size_mb(100)
///     .with_max_age_days(7)
///     .buffered(true);
/// let rotator = LogRotator::initialize(&Registry::global(), config).unwrap();
/// // ... run ...
/// rotator.close().unwrap();
/// ```
pub struct RotateConfig {
    dir: PathBuf,
    base_name: String,
    policy: RotationPolicy,
    buffered: bool,
    capacity: usize,
    flush_interval: Duration,
    formatter: FormatterKind,
    extra_sink: Option<Box<dyn Sink>>,
}

impl RotateConfig {
    /// Log to `<dir>/<base_name>.log`
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
            policy: RotationPolicy::default(),
            buffered: false,
            capacity: DEFAULT_CAPACITY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            formatter: FormatterKind::Default,
            extra_sink: None,
        }
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_policy(mut self, policy: RotationPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size_mb(mut self, megabytes: u64) -> Self {
        self.policy = self.policy.with_max_size(megabytes.saturating_mul(1024 * 1024));
        self
    }

    /// Remove rotated files older than `days`
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_age_days(mut self, days: u64) -> Self {
        self.policy = self
            .policy
            .with_max_age(Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY)));
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.policy = self.policy.with_max_backups(count);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.policy = self.policy.with_compression(enabled);
        self
    }

    /// Put a [`ChannelWriter`] between the formatter and the file
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn buffered(mut self, enabled: bool) -> Self {
        self.buffered = enabled;
        self
    }

    /// Queue capacity and flush interval of the channel writer
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_channel(mut self, capacity: usize, flush_interval: Duration) -> Self {
        self.capacity = capacity;
        self.flush_interval = flush_interval;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_formatter(mut self, kind: FormatterKind) -> Self {
        self.formatter = kind;
        self
    }

    /// Also write every line to `sink`. The file is then written through
    /// unbuffered so both destinations stay in step.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_extra_sink(mut self, sink: impl Sink + 'static) -> Self {
        self.extra_sink = Some(Box::new(sink));
        self
    }

    /// `<dir>/<base_name>.log`
    pub fn file_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.base_name))
    }

    fn validate(&self) -> Result<()> {
        if self.base_name.trim().is_empty() {
            return Err(LoggerError::config("RotateConfig", "base name must not be empty"));
        }
        if self.base_name.contains(|c| c == '/' || c == '\\') {
            return Err(LoggerError::config(
                "RotateConfig",
                format!("base name '{}' must not contain a path separator", self.base_name),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for RotateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotateConfig")
            .field("dir", &self.dir)
            .field("base_name", &self.base_name)
            .field("policy", &self.policy)
            .field("buffered", &self.buffered)
            .field("capacity", &self.capacity)
            .field("flush_interval", &self.flush_interval)
            .field("formatter", &self.formatter)
            .field("extra_sink", &self.extra_sink.is_some())
            .finish()
    }
}

/// Installed file logging, undone by [`close`](Self::close)
pub struct LogRotator {
    registry: Arc<Registry>,
    path: PathBuf,
    destination: SharedSink<Box<dyn Sink>>,
    channel: Option<ChannelWriter>,
    previous: Mutex<Option<Arc<dyn Formatter>>>,
    closed: AtomicBool,
}

impl LogRotator {
    /// Route `registry`'s output into a rotated file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the directory or
    /// file cannot be created, or the channel writer cannot start.
    pub fn initialize(registry: &Arc<Registry>, config: RotateConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.dir).map_err(|e| {
            LoggerError::io_operation(
                "creating log directory",
                format!("cannot create '{}'", config.dir.display()),
                e,
            )
        })?;

        let path = config.file_path();
        let buffer_size = if config.extra_sink.is_some() {
            0
        } else {
            DEFAULT_BUFFER_SIZE
        };
        let file = RotatingFileWriter::with_buffer_size(&path, config.policy, buffer_size)?;

        let sink: Box<dyn Sink> = match config.extra_sink {
            Some(extra) => Box::new(MultiSink::new().with_sink(file).with_sink(extra)),
            None => Box::new(file),
        };
        let destination = SharedSink::new(sink);

        let (formatter, channel) = if config.buffered {
            let channel = ChannelWriter::builder()
                .capacity(config.capacity)
                .flush_interval(config.flush_interval)
                .thread_name(format!("log-rotate-{}", config.base_name))
                .build(destination.clone())?;
            (config.formatter.build(channel.clone()), Some(channel))
        } else {
            (config.formatter.build(destination.clone()), None)
        };

        let previous = registry.replace_formatter(Some(formatter));
        Ok(Self {
            registry: Arc::clone(registry),
            path,
            destination,
            channel,
            previous: Mutex::new(previous),
            closed: AtomicBool::new(false),
        })
    }

    /// [`initialize`](Self::initialize) against the global registry
    pub fn initialize_global(config: RotateConfig) -> Result<Self> {
        Self::initialize(&Registry::global(), config)
    }

    /// Restore the formatter that was active before, stop the channel
    /// writer (draining it) and flush the file.
    ///
    /// # Errors
    ///
    /// [`LoggerError::AlreadyClosed`] on every call after the first; an
    /// I/O error if the final flush fails.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(LoggerError::already_closed("log rotator"));
        }

        let previous = self.previous.lock().take();
        self.registry.replace_formatter(previous);

        if let Some(channel) = &self.channel {
            channel.stop();
        }

        match self.destination.with(|sink| sink.flush()) {
            Some(Err(e)) => Err(LoggerError::io_operation(
                "flushing log file",
                format!("cannot flush '{}'", self.path.display()),
                e,
            )),
            _ => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Active log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn channel(&self) -> Option<&ChannelWriter> {
        self.channel.as_ref()
    }

    /// Channel writer counters, when buffered
    pub fn metrics(&self) -> Option<&WriterMetrics> {
        self.channel.as_ref().map(ChannelWriter::metrics)
    }
}

impl fmt::Debug for LogRotator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogRotator")
            .field("path", &self.path)
            .field("buffered", &self.channel.is_some())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appenders::testing::RecordingSink;
    use crate::core::log_level::LogLevel;
    use crate::core::logger::Logger;
    use crate::formatters::NilFormatter;
    use tempfile::tempdir;

    #[test]
    fn test_close_is_not_idempotent() {
        let dir = tempdir().unwrap();
        let registry = Registry::new();
        let rotator = LogRotator::initialize(&registry, RotateConfig::new(dir.path(), "app")).unwrap();

        rotator.close().unwrap();
        assert!(rotator.is_closed());

        let err = rotator.close().unwrap_err();
        assert!(matches!(err, LoggerError::AlreadyClosed { .. }));
        assert!(err.to_string().contains("already closed"));
    }

    #[test]
    fn test_writes_into_created_directory() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("nested").join("logs");
        let registry = Registry::new();
        let logger = registry.package_logger("acme", "server");

        let rotator = LogRotator::initialize(&registry, RotateConfig::new(&log_dir, "server")).unwrap();
        assert_eq!(rotator.path(), log_dir.join("server.log"));
        logger.info(&["listening".into(), 8080.into()]);
        logger.debug(&["filtered".into()]);
        rotator.close().unwrap();

        let contents = fs::read_to_string(log_dir.join("server.log")).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains(" I | pkg=server, "));
        assert!(contents.contains("\"listening\", 8080"));
    }

    #[test]
    fn test_buffered_drains_on_close() {
        let dir = tempdir().unwrap();
        let registry = Registry::new();
        let logger = registry.package_logger("acme", "worker");
        registry.set_global_level(LogLevel::Debug);
        assert_eq!(logger.level(), LogLevel::Debug);

        let config = RotateConfig::new(dir.path(), "worker")
            .buffered(true)
            .with_channel(16, Duration::from_secs(60));
        let rotator = LogRotator::initialize(&registry, config).unwrap();
        for i in 0..100 {
            logger.debugf(format_args!("job {}", i));
        }
        rotator.close().unwrap();

        let contents = fs::read_to_string(dir.path().join("worker.log")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 100);
        assert!(lines[0].ends_with("\"job 0\""));
        assert!(lines[99].ends_with("\"job 99\""));
        assert!(rotator.channel().unwrap().is_stopped());
        assert_eq!(rotator.metrics().unwrap().written_count(), 100);
    }

    #[test]
    fn test_close_restores_previous_formatter() {
        let dir = tempdir().unwrap();
        let original: Arc<dyn Formatter> = Arc::new(NilFormatter::new());
        let registry = Registry::with_formatter(Arc::clone(&original));

        let rotator = LogRotator::initialize(&registry, RotateConfig::new(dir.path(), "app")).unwrap();
        assert!(!Arc::ptr_eq(&registry.formatter().unwrap(), &original));

        rotator.close().unwrap();
        assert!(Arc::ptr_eq(&registry.formatter().unwrap(), &original));
    }

    #[test]
    fn test_file_buffer_holds_lines_until_close() {
        let dir = tempdir().unwrap();
        let registry = Registry::new();
        let logger = registry.package_logger("acme", "held");

        let rotator = LogRotator::initialize(&registry, RotateConfig::new(dir.path(), "held")).unwrap();
        logger.info(&["pending".into()]);

        let path = dir.path().join("held.log");
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);

        rotator.close().unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"pending\""));
    }

    #[test]
    fn test_extra_sink_gets_every_line() {
        let dir = tempdir().unwrap();
        let extra = RecordingSink::default();
        let registry = Registry::new();
        let logger = registry.package_logger("acme", "tee");

        let config = RotateConfig::new(dir.path(), "tee")
            .with_formatter(FormatterKind::String)
            .with_extra_sink(extra.clone());
        let rotator = LogRotator::initialize(&registry, config).unwrap();
        logger.warning(&["disk almost full".into()]);

        // Written through, visible before close
        let contents = fs::read_to_string(dir.path().join("tee.log")).unwrap();
        assert!(contents.contains("level=W pkg=tee"));
        assert_eq!(extra.contents(), vec![contents.into_bytes()]);

        rotator.close().unwrap();
    }

    #[test]
    fn test_invalid_base_name() {
        let dir = tempdir().unwrap();
        let original: Arc<dyn Formatter> = Arc::new(NilFormatter::new());
        let registry = Registry::with_formatter(Arc::clone(&original));

        let err = LogRotator::initialize(&registry, RotateConfig::new(dir.path(), "")).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err =
            LogRotator::initialize(&registry, RotateConfig::new(dir.path(), "a/b")).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
        assert!(Arc::ptr_eq(&registry.formatter().unwrap(), &original));
    }

    #[test]
    fn test_large_limits_saturate() {
        let config = RotateConfig::new("logs", "app")
            .with_max_size_mb(u64::MAX)
            .with_max_age_days(u64::MAX);
        assert_eq!(config.policy.strategy.max_bytes(), Some(u64::MAX));
        assert_eq!(config.policy.max_age, Some(Duration::from_secs(u64::MAX)));

        let config = RotateConfig::new("logs", "app")
            .with_max_size_mb(2)
            .with_max_age_days(1);
        assert_eq!(config.policy.strategy.max_bytes(), Some(2 * 1024 * 1024));
        assert_eq!(config.policy.max_age, Some(Duration::from_secs(86_400)));
    }
}
