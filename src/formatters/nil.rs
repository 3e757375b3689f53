//! Formatter that discards every entry

use super::{Formatter, FormatterOption, Record};
use crate::core::field::FieldValue;

#[derive(Debug, Clone, Copy, Default)]
pub struct NilFormatter;

impl NilFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl Formatter for NilFormatter {
    fn format(&self, _record: &Record<'_>, _entries: &[FieldValue]) {}

    fn format_kv(&self, _record: &Record<'_>, _pairs: &[(&str, &FieldValue)]) {}

    fn flush(&self) {}

    fn options(&self, _ops: &[FormatterOption]) {}
}
