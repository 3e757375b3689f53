//! logfmt-style formatter: `time=... level=I pkg=... src=... k=v`

use super::{emit, write_entries, Clock, FormatConfig, Formatter, FormatterOption, Payload, Record};
use crate::core::field::FieldValue;
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use std::io::Write;

pub struct StringFormatter<W: Write + Send> {
    writer: Mutex<W>,
    config: Mutex<FormatConfig>,
    clock: Clock,
}

impl<W: Write + Send> StringFormatter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            config: Mutex::new(FormatConfig::default()),
            clock: Utc::now,
        }
    }

    /// Replace the timestamp source
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Apply options while building
    #[must_use]
    pub fn with_options(self, ops: &[FormatterOption]) -> Self {
        self.config.lock().apply(ops);
        self
    }

    fn render(&self, record: &Record<'_>, payload: Payload<'_>) {
        let config = *self.config.lock();
        let mut line = String::with_capacity(128);
        if !config.skip_time {
            line.push_str("time=");
            line.push_str(&(self.clock)().to_rfc3339_opts(SecondsFormat::Secs, true));
            line.push(' ');
        }
        if !config.skip_level {
            line.push_str("level=");
            line.push(record.level.as_char());
            line.push(' ');
        }
        write_entries(&mut line, &config, record, " ", payload);
        emit(&mut *self.writer.lock(), &line);
    }
}

impl<W: Write + Send> Formatter for StringFormatter<W> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::LogLevel;
    use crate::formatters::testing::{fixed_clock, Capture};
    use crate::formatters::CallSite;

    fn record<'a>(fields: &'a [(&'a str, &'a FieldValue)]) -> Record<'a> {
        Record {
            package: "server",
            level: LogLevel::Info,
            location: CallSite::caller(),
            fields,
        }
    }

    #[test]
    fn test_string_format() {
        let out = Capture::default();
        let f = StringFormatter::new(out.clone())
            .with_clock(fixed_clock)
            .with_options(&[FormatterOption::NoCaller]);

        f.format(&record(&[]), &[FieldValue::from("Test Info")]);
        assert_eq!(
            out.take(),
            "time=2021-04-01T00:00:00Z level=I pkg=server \"Test Info\"\n"
        );
    }

    #[test]
    fn test_string_format_kv() {
        let out = Capture::default();
        let f = StringFormatter::new(out.clone())
            .with_clock(fixed_clock)
            .with_options(&[FormatterOption::NoCaller]);

        let one = FieldValue::from(1);
        let no = FieldValue::from(false);
        let empty = FieldValue::Null;
        f.format_kv(&record(&[]), &[("k1", &one), ("k2", &no), ("k3", &empty)]);
        assert_eq!(
            out.take(),
            "time=2021-04-01T00:00:00Z level=I pkg=server k1=1 k2=false\n"
        );

        f.options(&[FormatterOption::PrintEmpty, FormatterOption::SkipTime]);
        f.format_kv(&record(&[]), &[("k3", &empty)]);
        assert_eq!(out.take(), "level=I pkg=server k3=null\n");
    }

    #[test]
    fn test_string_format_with_caller_and_fields() {
        let out = Capture::default();
        let f = StringFormatter::new(out.clone()).with_options(&[FormatterOption::SkipTime]);

        let user = FieldValue::from("alice");
        let fields = [("user", &user)];
        let rec = record(&fields);
        f.format(&rec, &[FieldValue::from("hello")]);

        let line = out.take();
        assert!(line.starts_with("level=I pkg=server src=string.rs:"));
        assert!(line.ends_with(" user=\"alice\" \"hello\"\n"));
    }
}
