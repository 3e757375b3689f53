//! Rotating file sink
//!
//! [`RotatingFileWriter`] appends raw bytes to `<name>.log` and, when the
//! configured [`RotationStrategy`] says so, moves it aside as `<name>.log.1`
//! (shifting older backups up by one), optionally gzip-compressing it.
//! Backups beyond `max_backups` or older than `max_age` are removed.

use super::Sink;
use crate::core::error::{LoggerError, Result};
use chrono::{DateTime, Local, Timelike};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Default write buffer size
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

const MAX_DELETION_FAILURES: usize = 5;

/// When to rotate the active file
///
/// # Examples
///
/// ```
/// use repo_logger::appenders::RotationStrategy;
/// use std::time::Duration;
///
/// // Rotate once the file reaches 100 MB
/// let by_size = RotationStrategy::size(100 * 1024 * 1024);
///
/// // Rotate when the file is an hour old
/// let by_age = RotationStrategy::age(Duration::from_secs(3600));
///
/// // Whichever comes first
/// let hybrid = RotationStrategy::hybrid(50 * 1024 * 1024, Duration::from_secs(24 * 3600));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationStrategy {
    /// Rotate when the file reaches `max_bytes`
    Size { max_bytes: u64 },

    /// Rotate when the file has been open for `interval`
    Age { interval: Duration },

    /// Rotate on the first write of a new day at or after `hour` (0-23)
    Daily { hour: u8 },

    /// Rotate on size or age, whichever comes first
    Hybrid { max_bytes: u64, interval: Duration },

    /// Never rotate; pruning and compression are not applied either
    Never,
}

impl Default for RotationStrategy {
    fn default() -> Self {
        RotationStrategy::Size {
            max_bytes: 100 * 1024 * 1024,
        }
    }
}

impl RotationStrategy {
    #[must_use]
    pub fn size(max_bytes: u64) -> Self {
        RotationStrategy::Size { max_bytes }
    }

    #[must_use]
    pub fn age(interval: Duration) -> Self {
        RotationStrategy::Age { interval }
    }

    /// # Panics
    ///
    /// Panics if `hour` is greater than 23
    #[must_use]
    pub fn daily(hour: u8) -> Self {
        assert!(hour <= 23, "Hour must be between 0 and 23");
        RotationStrategy::Daily { hour }
    }

    #[must_use]
    pub fn hybrid(max_bytes: u64, interval: Duration) -> Self {
        RotationStrategy::Hybrid {
            max_bytes,
            interval,
        }
    }

    #[must_use]
    pub fn never() -> Self {
        RotationStrategy::Never
    }

    /// Size limit, if the strategy has one
    #[must_use]
    pub fn max_bytes(&self) -> Option<u64> {
        match self {
            RotationStrategy::Size { max_bytes } | RotationStrategy::Hybrid { max_bytes, .. } => {
                Some(*max_bytes)
            }
            _ => None,
        }
    }
}

/// Rotation and retention settings
///
/// # Examples
///
/// ```
/// use repo_logger::appenders::{RotationPolicy, RotationStrategy};
/// use std::time::Duration;
///
/// let policy = RotationPolicy::new()
///     .with_strategy(RotationStrategy::size(50 * 1024 * 1024))
///     .with_max_backups(7)
///     .with_max_age(Duration::from_secs(7 * 24 * 3600))
///     .with_compression(true);
/// assert_eq!(policy.max_backups, 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    pub strategy: RotationStrategy,
    /// Rotated files kept; 0 keeps none
    pub max_backups: usize,
    /// Rotated files older than this are removed
    pub max_age: Option<Duration>,
    /// Gzip rotated files
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            strategy: RotationStrategy::default(),
            max_backups: 5,
            max_age: None,
            compress: false,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_strategy(mut self, strategy: RotationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Shorthand for a [`RotationStrategy::Size`] strategy
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size(mut self, max_bytes: u64) -> Self {
        self.strategy = RotationStrategy::Size { max_bytes };
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_age(mut self, age: Duration) -> Self {
        self.max_age = Some(age);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }
}

/// Size- and age-rotated log file
///
/// Writes go through an internal buffer; call [`Sink::flush`] (or wrap the
/// writer in a [`ChannelWriter`](super::ChannelWriter), which flushes
/// periodically) to push them to disk. Dropping the writer flushes too.
///
/// ```no_run
/// use repo_logger::appenders::{RotatingFileWriter, RotationPolicy, Sink};
///
/// let mut file = RotatingFileWriter::with_policy(
///     "/var/log/app/server.log",
///     RotationPolicy::new().with_max_size(10 * 1024 * 1024).with_max_backups(3),
/// )
/// .unwrap();
/// file.write(b"hello\n").unwrap();
/// ```
pub struct RotatingFileWriter {
    path: PathBuf,
    policy: RotationPolicy,
    buffer_size: usize,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    opened_at: SystemTime,
    deletion_failures: usize,
}

impl RotatingFileWriter {
    /// Open `path` with the default policy
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// Open `path` for appending, creating missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the file cannot be created.
    pub fn with_policy<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        Self::with_buffer_size(path, policy, DEFAULT_BUFFER_SIZE)
    }

    /// Like [`with_policy`](Self::with_policy) with an explicit buffer size.
    /// A size of 0 writes straight through.
    pub fn with_buffer_size<P: AsRef<Path>>(
        path: P,
        policy: RotationPolicy,
        buffer_size: usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "creating log directory",
                    format!("cannot create '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let (file, current_size, opened_at) = open_append(&path)?;
        let writer = Self {
            path,
            policy,
            buffer_size,
            writer: Some(BufWriter::with_capacity(buffer_size, file)),
            current_size,
            opened_at,
            deletion_failures: 0,
        };
        writer.prune_expired();
        Ok(writer)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Bytes in the active file, buffered ones included
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    /// Path of the `index`th backup, uncompressed form
    #[must_use]
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app.log");
        self.path.with_file_name(format!("{}.{}", name, index))
    }

    fn should_rotate(&self, incoming: u64) -> bool {
        let age = || {
            SystemTime::now()
                .duration_since(self.opened_at)
                .unwrap_or(Duration::ZERO)
        };
        // An empty file is never rotated for size; an oversized line still lands somewhere
        let too_big = |max: u64| self.current_size > 0 && self.current_size + incoming > max;

        match &self.policy.strategy {
            RotationStrategy::Never => false,
            RotationStrategy::Size { max_bytes } => too_big(*max_bytes),
            RotationStrategy::Age { interval } => age() >= *interval,
            RotationStrategy::Daily { hour } => {
                let now: DateTime<Local> = SystemTime::now().into();
                let opened: DateTime<Local> = self.opened_at.into();
                now.date_naive() != opened.date_naive() && now.hour() >= u32::from(*hour)
            }
            RotationStrategy::Hybrid {
                max_bytes,
                interval,
            } => too_big(*max_bytes) || age() >= *interval,
        }
    }

    /// Close the active file, shift backups and start a fresh file.
    ///
    /// # Errors
    ///
    /// Returns an error if the active file cannot be moved aside or
    /// reopened; the writer then keeps appending to the old file.
    pub fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            Write::flush(&mut writer).map_err(|e| {
                LoggerError::file_rotation(
                    self.path.display().to_string(),
                    format!("flush before rotation failed: {}", e),
                )
            })?;
        }

        let result = self.shift_backups();
        // Always reopen, whether or not the shift worked
        let (file, size, opened_at) = open_append(&self.path)?;
        self.writer = Some(BufWriter::with_capacity(self.buffer_size, file));
        self.current_size = size;
        self.opened_at = opened_at;
        result?;

        self.prune_expired();
        Ok(())
    }

    fn shift_backups(&mut self) -> Result<()> {
        if self.policy.max_backups == 0 {
            return fs::remove_file(&self.path).map_err(|e| {
                LoggerError::file_rotation(
                    self.path.display().to_string(),
                    format!("cannot discard rotated file: {}", e),
                )
            });
        }

        let oldest = self.backup_path(self.policy.max_backups);
        let mut deletion_failed = false;
        for victim in [gz_path(&oldest), oldest] {
            if victim.exists() {
                if let Err(e) = fs::remove_file(&victim) {
                    deletion_failed = true;
                    eprintln!(
                        "[LOGGER WARNING] Failed to remove oldest backup {}: {} (failure #{}/{})",
                        victim.display(),
                        e,
                        self.deletion_failures + 1,
                        MAX_DELETION_FAILURES
                    );
                }
            }
        }
        if deletion_failed {
            self.deletion_failures += 1;
            if self.deletion_failures >= MAX_DELETION_FAILURES {
                return Err(LoggerError::file_rotation(
                    self.path.display().to_string(),
                    format!(
                        "rotation aborted after {} consecutive failures to delete old backups",
                        self.deletion_failures
                    ),
                ));
            }
        } else {
            self.deletion_failures = 0;
        }

        for i in (1..self.policy.max_backups).rev() {
            let from = self.backup_path(i);
            let to = self.backup_path(i + 1);
            for (from, to) in [(gz_path(&from), gz_path(&to)), (from, to)] {
                if from.exists() {
                    fs::rename(&from, &to).map_err(|e| {
                        LoggerError::file_rotation(
                            from.display().to_string(),
                            format!("cannot shift backup: {}", e),
                        )
                    })?;
                }
            }
        }

        let first = self.backup_path(1);
        fs::rename(&self.path, &first).map_err(|e| {
            LoggerError::file_rotation(
                self.path.display().to_string(),
                format!("cannot move active file aside: {}", e),
            )
        })?;
        if self.policy.compress {
            compress_file(&first)?;
        }
        Ok(())
    }

    /// Remove backups older than `max_age`. Failures are reported, not returned.
    fn prune_expired(&self) {
        let Some(max_age) = self.policy.max_age else {
            return;
        };
        let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
            return;
        };

        for i in 1..=self.policy.max_backups {
            let plain = self.backup_path(i);
            for path in [gz_path(&plain), plain] {
                let expired = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .map(|modified| modified < cutoff)
                    .unwrap_or(false);
                if expired {
                    if let Err(e) = fs::remove_file(&path) {
                        eprintln!(
                            "[LOGGER WARNING] Failed to remove expired backup {}: {}",
                            path.display(),
                            e
                        );
                    }
                }
            }
        }
    }
}

impl Sink for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        let incoming = buf.len() as u64;
        if self.should_rotate(incoming) {
            if let Err(e) = self.rotate() {
                eprintln!(
                    "[LOGGER WARNING] Log rotation failed: {}. Continuing with current file.",
                    e
                );
                // Avoid retrying on every write
                self.current_size = 0;
                self.opened_at = SystemTime::now();
            }
        }

        if self.writer.is_none() {
            let (file, size, opened_at) = open_append(&self.path)?;
            self.writer = Some(BufWriter::with_capacity(self.buffer_size, file));
            self.current_size = size;
            self.opened_at = opened_at;
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::other("log file is not open"))?;
        writer.write_all(buf)?;
        self.current_size += incoming;
        Ok(())
    }

    fn flush(&mut self) -> Option<io::Result<()>> {
        Some(self.writer.as_mut().map_or(Ok(()), Write::flush))
    }
}

impl Drop for RotatingFileWriter {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = Write::flush(&mut writer);
        }
    }
}

fn open_append(path: &Path) -> Result<(File, u64, SystemTime)> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            LoggerError::file_appender(path.display().to_string(), format!("cannot open: {}", e))
        })?;
    let metadata = file.metadata().map_err(|e| {
        LoggerError::file_appender(
            path.display().to_string(),
            format!("cannot read metadata: {}", e),
        )
    })?;
    // Append to a non-empty file: count its age from its last change
    let opened_at = if metadata.len() > 0 {
        metadata.modified().unwrap_or_else(|_| SystemTime::now())
    } else {
        SystemTime::now()
    };
    Ok((file, metadata.len(), opened_at))
}

fn gz_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

/// Gzip `path` to `path.gz` through a temporary file; the original is
/// removed only once the archive is complete.
fn compress_file(path: &Path) -> Result<()> {
    let gz = gz_path(path);
    let mut tmp = gz.clone().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let compress = || -> io::Result<()> {
        let mut reader = BufReader::with_capacity(64 * 1024, File::open(path)?);
        let output = BufWriter::with_capacity(64 * 1024, File::create(&tmp)?);
        let mut encoder = GzEncoder::new(output, Compression::default());
        io::copy(&mut reader, &mut encoder)?;
        Write::flush(&mut encoder.finish()?)?;
        fs::rename(&tmp, &gz)
    };

    if let Err(e) = compress() {
        let _ = fs::remove_file(&tmp);
        return Err(LoggerError::io_operation(
            "compressing rotated log",
            format!("cannot compress '{}'", path.display()),
            e,
        ));
    }

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compressed {} but could not remove the original: {}",
            path.display(),
            e
        );
    }
    Ok(())
}
