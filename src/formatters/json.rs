//! JSON formatter
//!
//! Each entry becomes one JSON object on its own line. Keys are emitted in
//! sorted order; `time`, `level`, `pkg`, `src` and `msg` take precedence over
//! user fields of the same name.

use super::{emit, Clock, FormatConfig, Formatter, FormatterOption, Record};
use crate::core::field::{truncate, FieldValue, MAX_VALUE_LEN};
use crate::core::log_level::LogLevel;
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::io::Write;

pub struct JsonFormatter<W: Write + Send> {
    writer: Mutex<W>,
    config: Mutex<FormatConfig>,
    clock: Clock,
}

impl<W: Write + Send> JsonFormatter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            config: Mutex::new(FormatConfig::default()),
            clock: Utc::now,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_options(self, ops: &[FormatterOption]) -> Self {
        self.config.lock().apply(ops);
        self
    }

    fn render(&self, record: &Record<'_>, mut object: Map<String, Value>, msg: Option<String>) {
        let config = *self.config.lock();

        for (key, value) in record.fields.iter().rev() {
            object
                .entry((*key).to_string())
                .or_insert_with(|| value.to_json_value());
        }
        if !config.skip_time {
            let now = (self.clock)().to_rfc3339_opts(SecondsFormat::Secs, true);
            object.insert("time".into(), Value::String(now));
        }
        if !config.skip_level {
            object.insert("level".into(), Value::String(record.level.as_char().to_string()));
        }
        if !record.package.is_empty() {
            object.insert("pkg".into(), Value::String(record.package.to_string()));
        }
        let src = if record.level == LogLevel::Error && config.source(record).is_none() {
            Some(record.location.short())
        } else {
            config.source(record)
        };
        if let Some(src) = src {
            object.insert("src".into(), Value::String(src));
        }
        if let Some(msg) = msg {
            object.insert("msg".into(), Value::String(msg));
        }

        match serde_json::to_string(&Value::Object(object)) {
            Ok(mut line) => {
                line.push('\n');
                emit(&mut *self.writer.lock(), &line);
            }
            Err(e) => eprintln!("[LOGGER ERROR] Failed to encode JSON entry: {}", e),
        }
    }
}

impl<W: Write + Send> Formatter for JsonFormatter<W> {
    fn format(&self, record: &Record<'_>, entries: &[FieldValue]) {
        let msg = if entries.is_empty() {
            None
        } else {
            let joined = entries
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            Some(truncate(joined, MAX_VALUE_LEN, ""))
        };
        self.render(record, Map::new(), msg);
    }

    fn format_kv(&self, record: &Record<'_>, pairs: &[(&str, &FieldValue)]) {
        let mut object = Map::new();
        for (key, value) in pairs {
            object.insert((*key).to_string(), value.to_json_value());
        }
        self.render(record, object, None);
    }

    fn flush(&self) {
        let _ = self.writer.lock().flush();
    }

    fn options(&self, ops: &[FormatterOption]) {
        self.config.lock().apply(ops);
    }
}
