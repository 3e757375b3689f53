//! Human-readable formatter, the default
//!
//! Lines look like
//! `2021-04-01 00:00:00.000000 I | pkg=server, src=main.rs:10, "message"`.

use super::{emit, write_entries, Clock, FormatConfig, Formatter, FormatterOption, Payload, Record};
use crate::core::field::FieldValue;
use chrono::Utc;
#[cfg(feature = "color")]
use colored::Colorize;
use parking_lot::Mutex;
use std::io::Write;

pub struct PrettyFormatter<W: Write + Send> {
    writer: Mutex<W>,
    config: Mutex<FormatConfig>,
    clock: Clock,
}

impl<W: Write + Send> PrettyFormatter<W> {
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

    fn render(&self, record: &Record<'_>, payload: Payload<'_>) {
        let config = *self.config.lock();
        let mut line = String::with_capacity(128);
        if !config.skip_time {
            let now = (self.clock)();
            line.push_str(&now.format("%Y-%m-%d %H:%M:%S%.6f ").to_string());
        }

        let mut body = String::with_capacity(96);
        if !config.skip_level {
            body.push(record.level.as_char());
            body.push_str(" | ");
        }
        write_entries(&mut body, &config, record, ", ", payload);

        if config.color {
            line.push_str(&colorize(record, body.trim_end_matches('\n')));
            line.push('\n');
        } else {
            line.push_str(&body);
        }
        emit(&mut *self.writer.lock(), &line);
    }
}

#[cfg(feature = "color")]
fn colorize(record: &Record<'_>, body: &str) -> String {
    body.color(record.level.color_code()).to_string()
}

#[cfg(not(feature = "color"))]
fn colorize(_record: &Record<'_>, body: &str) -> String {
    body.to_string()
}

impl<W: Write + Send> Formatter for PrettyFormatter<W> {
    fn format(&self, record: &Record<'_>, entries: &[FieldValue]) {
        self.render(record, Payload::Values(entries));
    }

    fn format_kv(&self, record: &Record<'_>, pairs: &[(&str, &FieldValue)]) {
        self.render(record, Payload::Pairs(pairs));
    }

    fn flush(&self) {
        let _ = self.writer.lock().flush();
    }

    fn options(&self, ops: &[FormatterOption]) {
        self.config.lock().apply(ops);
    }
}
