//! Formatters render accepted log entries into lines on a writer
//!
//! The registry holds exactly one active [`Formatter`]. Every formatter
//! writes a whole rendered line with a single `write_all` call, so a
//! [`ChannelWriter`](crate::appenders::ChannelWriter) sink receives one
//! queued buffer per log line. The writer is only flushed by
//! [`Formatter::flush`].

pub mod json;
pub mod nil;
pub mod pretty;
pub mod string;

pub use json::JsonFormatter;
pub use nil::NilFormatter;
pub use pretty::PrettyFormatter;
pub use string::StringFormatter;

use crate::core::error::LoggerError;
use crate::core::field::{truncate, FieldValue, MAX_VALUE_LEN};
use crate::core::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::panic::Location;
use std::str::FromStr;
use std::sync::Arc;

/// Source of the timestamp stamped on each line
pub type Clock = fn() -> DateTime<Utc>;

/// Source position of a logging call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite<'a> {
    pub file: &'a str,
    pub line: u32,
}

impl CallSite<'static> {
    /// Position of the caller, seen through `#[track_caller]` frames
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }
}

impl CallSite<'_> {
    /// `file:line` with the directory part stripped
    pub fn short(&self) -> String {
        let base = self
            .file
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(self.file);
        format!("{}:{}", base, self.line)
    }
}

impl From<&'static Location<'static>> for CallSite<'static> {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for CallSite<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Everything about an entry except its payload
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    /// Package that produced the entry
    pub package: &'a str,
    pub level: LogLevel,
    /// Call site of the logging call
    pub location: CallSite<'a>,
    /// Key-value pairs accumulated on the logger handle
    pub fields: &'a [(&'a str, &'a FieldValue)],
}

/// Rendering behavior switches, applied with [`Formatter::options`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatterOption {
    /// Log the call site as `src=file:line`
    WithCaller,
    /// Do not log the call site
    NoCaller,
    SkipTime,
    SkipLevel,
    /// Log the full source path of the call site
    WithLocation,
    /// Color lines by level (pretty formatter only)
    WithColor,
    /// Keep null and empty values in key-value output
    PrintEmpty,
}

/// Renders log entries
///
/// Implementations are shared behind an `Arc` and called while the registry
/// lock is held, so they must not log through the registry themselves.
pub trait Formatter: Send + Sync {
    /// Render freeform values, separated by the formatter's separator
    fn format(&self, record: &Record<'_>, entries: &[FieldValue]);

    /// Render key-value pairs
    fn format_kv(&self, record: &Record<'_>, pairs: &[(&str, &FieldValue)]);

    /// Push buffered output to the underlying writer
    fn flush(&self);

    /// Adjust rendering behavior
    fn options(&self, ops: &[FormatterOption]);
}

/// Formatter selector used by configuration and the environment bootstrap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatterKind {
    #[default]
    Default,
    Pretty,
    String,
    Json,
    Nil,
}

impl FormatterKind {
    /// Build a formatter of this kind writing to `writer`
    pub fn build<W: Write + Send + 'static>(self, writer: W) -> Arc<dyn Formatter> {
        match self {
            FormatterKind::Default | FormatterKind::Pretty => Arc::new(PrettyFormatter::new(writer)),
            FormatterKind::String => Arc::new(StringFormatter::new(writer)),
            FormatterKind::Json => Arc::new(JsonFormatter::new(writer)),
            FormatterKind::Nil => Arc::new(NilFormatter::new()),
        }
    }
}

impl FromStr for FormatterKind {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DEFAULT" => Ok(FormatterKind::Default),
            "PRETTY" => Ok(FormatterKind::Pretty),
            "STRING" => Ok(FormatterKind::String),
            "JSON" => Ok(FormatterKind::Json),
            "NIL" => Ok(FormatterKind::Nil),
            _ => Err(LoggerError::config("formatter", format!("unknown formatter: {}", s))),
        }
    }
}

/// Default formatter: pretty lines on stderr
pub fn default_formatter() -> Arc<dyn Formatter> {
    FormatterKind::Default.build(std::io::stderr())
}

/// Settings shared by the built-in formatters
#[derive(Debug, Clone, Copy)]
pub(crate) struct FormatConfig {
    pub with_caller: bool,
    pub skip_time: bool,
    pub skip_level: bool,
    pub print_empty: bool,
    pub with_location: bool,
    pub color: bool,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            with_caller: true,
            skip_time: false,
            skip_level: false,
            print_empty: false,
            with_location: false,
            color: false,
        }
    }
}

impl FormatConfig {
    pub fn apply(&mut self, ops: &[FormatterOption]) {
        for op in ops {
            match op {
                FormatterOption::WithCaller => self.with_caller = true,
                FormatterOption::NoCaller => self.with_caller = false,
                FormatterOption::SkipTime => self.skip_time = true,
                FormatterOption::SkipLevel => self.skip_level = true,
                FormatterOption::WithLocation => self.with_location = true,
                FormatterOption::WithColor => self.color = true,
                FormatterOption::PrintEmpty => self.print_empty = true,
            }
        }
    }

    /// `src` value for the record, if the call site is to be logged
    pub fn source(&self, record: &Record<'_>) -> Option<String> {
        if self.with_location {
            Some(record.location.to_string())
        } else if self.with_caller {
            Some(record.location.short())
        } else {
            None
        }
    }
}

/// Render `key=value`, or `None` if the value is empty and empty values
/// are not printed.
pub(crate) fn flatten_pair(key: &str, value: &FieldValue, print_empty: bool) -> Option<String> {
    if value.is_empty() && !print_empty {
        return None;
    }
    let val = value.escaped();
    let marker = if val.starts_with('"') { "...\"" } else { "..." };
    Some(format!("{}={}", key, truncate(val, MAX_VALUE_LEN, marker)))
}

/// Payload of a text line
pub(crate) enum Payload<'a> {
    Values(&'a [FieldValue]),
    Pairs(&'a [(&'a str, &'a FieldValue)]),
}

/// Append `pkg=`, `src=`, the record's fields and the payload to `out`,
/// joined by `separator`, and terminate the line.
pub(crate) fn write_entries(
    out: &mut String,
    config: &FormatConfig,
    record: &Record<'_>,
    separator: &str,
    payload: Payload<'_>,
) {
    let mut parts: Vec<String> = Vec::new();
    if !record.package.is_empty() {
        parts.push(format!("pkg={}", record.package));
    }
    if let Some(src) = config.source(record) {
        parts.push(format!("src={}", src));
    }
    parts.extend(
        record
            .fields
            .iter()
            .filter_map(|(k, v)| flatten_pair(k, v, config.print_empty)),
    );
    match payload {
        Payload::Values(values) => parts.extend(values.iter().map(FieldValue::escaped)),
        Payload::Pairs(pairs) => parts.extend(
            pairs
                .iter()
                .filter_map(|(k, v)| flatten_pair(k, v, config.print_empty)),
        ),
    }

    out.push_str(&parts.join(separator));
    if !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Emit one finished line; write failures are reported, never propagated.
///
/// The line goes out in a single `write_all`. Buffering below the formatter
/// is left alone until [`Formatter::flush`].
pub(crate) fn emit<W: Write>(writer: &mut W, line: &str) {
    if let Err(e) = writer.write_all(line.as_bytes()) {
        eprintln!("[LOGGER ERROR] Formatter failed to write: {}", e);
    }
}
