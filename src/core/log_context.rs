//! Request-scoped key-value entries
//!
//! A `LogContext` travels with a unit of work (a request, a job) and carries
//! key-value entries that `context_kv` prepends to every entry it logs.

use super::field::FieldValue;
use std::fmt;
use std::sync::Arc;

/// Ordered key-value entries attached to a unit of work
///
/// Cloning is cheap: entries are shared until a clone is extended.
///
/// # Example
///
/// ```
/// use repo_logger::LogContext;
///
/// let ctx = LogContext::new()
///     .with_kv("request_id", "abc-123")
///     .with_kv("user", 42);
/// assert_eq!(ctx.entries().len(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    entries: Arc<Vec<FieldValue>>,
}

impl LogContext {
    /// Create a new empty log context
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one key-value pair
    #[must_use]
    pub fn with_kv<K, V>(self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.with_entries([FieldValue::String(key.into()), value.into()])
    }

    /// Append raw alternating key/value entries
    #[must_use]
    pub fn with_entries<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = FieldValue>,
    {
        Arc::make_mut(&mut self.entries).extend(entries);
        self
    }

    /// All entries in insertion order
    pub fn entries(&self) -> &[FieldValue] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for pair in self.entries.chunks(2) {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            match pair {
                [k, v] => write!(f, "{}={}", k, v.escaped())?,
                [k] => write!(f, "{}=", k)?,
                _ => {}
            }
        }
        Ok(())
    }
}
