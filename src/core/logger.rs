//! Package logger handles
//!
//! A [`PackageLogger`] is the handle a package logs through. It shares its
//! level slot with every other handle of the same package, so level changes
//! made through the [`Registry`] apply immediately. Entries that pass the
//! level gate are rendered by the registry's formatter while the registry
//! lock is held.
//!
//! Call sites are captured with `#[track_caller]`; every logging method
//! reports the location of the code that called it.

use super::field::{key_value_pairs, validate_key_values, FieldValue};
use super::log_context::LogContext;
use super::log_level::LogLevel;
use super::registry::{PackageSlot, Registry};
use crate::formatters::{CallSite, Record};
use std::fmt;
use std::sync::Arc;

/// Logging interface shared by [`PackageLogger`] and [`NilLogger`]
///
/// Plain entries are rendered one after another; key-value entries must
/// alternate string keys and values.
pub trait Logger: Send + Sync {
    /// Log entries at `level`
    #[track_caller]
    fn log(&self, level: LogLevel, entries: &[FieldValue]);

    /// Log a formatted message at `level`
    #[track_caller]
    fn logf(&self, level: LogLevel, args: fmt::Arguments<'_>);

    /// Log alternating key/value entries at `level`.
    ///
    /// # Panics
    ///
    /// If `entries` has an odd length or a key is not a string.
    #[track_caller]
    fn kv(&self, level: LogLevel, entries: &[FieldValue]);

    /// Like [`kv`](Self::kv), with the context's entries prepended
    #[track_caller]
    fn context_kv(&self, ctx: &LogContext, level: LogLevel, entries: &[FieldValue]);

    /// Whether entries at `level` would currently be emitted
    fn level_at(&self, level: LogLevel) -> bool;

    fn flush(&self);

    /// Log at CRITICAL, then exit the process
    #[track_caller]
    fn fatal(&self, entries: &[FieldValue]);

    #[track_caller]
    fn fatalf(&self, args: fmt::Arguments<'_>);

    /// Log at CRITICAL, then panic with the same message
    #[track_caller]
    fn panic(&self, entries: &[FieldValue]) -> !;

    #[track_caller]
    fn panicf(&self, args: fmt::Arguments<'_>) -> !;

    #[track_caller]
    fn critical(&self, entries: &[FieldValue]) {
        self.log(LogLevel::Critical, entries);
    }

    #[track_caller]
    fn criticalf(&self, args: fmt::Arguments<'_>) {
        self.logf(LogLevel::Critical, args);
    }

    #[track_caller]
    fn error(&self, entries: &[FieldValue]) {
        self.log(LogLevel::Error, entries);
    }

    #[track_caller]
    fn errorf(&self, args: fmt::Arguments<'_>) {
        self.logf(LogLevel::Error, args);
    }

    #[track_caller]
    fn warning(&self, entries: &[FieldValue]) {
        self.log(LogLevel::Warning, entries);
    }

    #[track_caller]
    fn warningf(&self, args: fmt::Arguments<'_>) {
        self.logf(LogLevel::Warning, args);
    }

    #[track_caller]
    fn notice(&self, entries: &[FieldValue]) {
        self.log(LogLevel::Notice, entries);
    }

    #[track_caller]
    fn noticef(&self, args: fmt::Arguments<'_>) {
        self.logf(LogLevel::Notice, args);
    }

    #[track_caller]
    fn info(&self, entries: &[FieldValue]) {
        self.log(LogLevel::Info, entries);
    }

    #[track_caller]
    fn infof(&self, args: fmt::Arguments<'_>) {
        self.logf(LogLevel::Info, args);
    }

    #[track_caller]
    fn trace(&self, entries: &[FieldValue]) {
        self.log(LogLevel::Trace, entries);
    }

    #[track_caller]
    fn tracef(&self, args: fmt::Arguments<'_>) {
        self.logf(LogLevel::Trace, args);
    }

    #[track_caller]
    fn debug(&self, entries: &[FieldValue]) {
        self.log(LogLevel::Debug, entries);
    }

    #[track_caller]
    fn debugf(&self, args: fmt::Arguments<'_>) {
        self.logf(LogLevel::Debug, args);
    }
}

enum Entry<'a> {
    Values(&'a [FieldValue]),
    Pairs(&'a [(&'a str, &'a FieldValue)]),
    Message(fmt::Arguments<'a>),
}

/// Logger of one package, created by [`Registry::package_logger`]
///
/// # Example
///
/// ```
/// use repo_logger::{FieldValue, Logger, Registry};
///
/// let registry = Registry::new();
/// let logger = registry.package_logger("github.com/acme/api", "server");
/// logger.info(&["listening".into(), FieldValue::from(8080)]);
/// logger.infof(format_args!("{} workers", 4));
/// ```
#[derive(Clone)]
pub struct PackageLogger {
    registry: Arc<Registry>,
    slot: Arc<PackageSlot>,
    values: Arc<Vec<FieldValue>>,
}

impl PackageLogger {
    pub(crate) fn new(registry: Arc<Registry>, slot: Arc<PackageSlot>) -> Self {
        Self {
            registry,
            slot,
            values: Arc::new(Vec::new()),
        }
    }

    pub fn package(&self) -> &str {
        self.slot.name()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub(crate) fn slot(&self) -> &PackageSlot {
        &self.slot
    }

    /// Current level of the package
    pub fn level(&self) -> LogLevel {
        self.registry.level_of(&self.slot)
    }

    /// Key-value pairs attached to this handle
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// New handle of the same package with `entries` appended to its
    /// key-value pairs. This handle is left untouched.
    ///
    /// # Panics
    ///
    /// If the combined pairs have an odd length or a non-string key.
    #[track_caller]
    #[must_use]
    pub fn with_values(&self, entries: &[FieldValue]) -> PackageLogger {
        let mut values = Vec::with_capacity(self.values.len() + entries.len());
        values.extend_from_slice(&self.values);
        values.extend_from_slice(entries);
        validate_key_values(&values);

        PackageLogger {
            registry: Arc::clone(&self.registry),
            slot: Arc::clone(&self.slot),
            values: Arc::new(values),
        }
    }

    fn emit(&self, level: LogLevel, location: CallSite<'_>, entry: Entry<'_>) {
        self.registry.dispatch(&self.slot, level, |formatter| {
            let fields = key_value_pairs(&self.values);
            let record = Record {
                package: self.slot.name(),
                level,
                location,
                fields: &fields,
            };
            match entry {
                Entry::Values(values) => formatter.format(&record, values),
                Entry::Pairs(pairs) => formatter.format_kv(&record, pairs),
                Entry::Message(args) => {
                    formatter.format(&record, &[FieldValue::String(args.to_string())])
                }
            }
        });
    }

    /// Log key-value pairs attributed to `site` rather than the caller
    #[cfg_attr(not(feature = "log-compat"), allow(dead_code))]
    pub(crate) fn kv_at(&self, level: LogLevel, site: CallSite<'_>, pairs: &[(&str, &FieldValue)]) {
        self.emit(level, site, Entry::Pairs(pairs));
    }

    fn exit(&self) {
        let exit = self.registry.exit_fn();
        exit(1);
    }
}

impl Logger for PackageLogger {
    fn log(&self, level: LogLevel, entries: &[FieldValue]) {
        self.emit(level, CallSite::caller(), Entry::Values(entries));
    }

    fn logf(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        self.emit(level, CallSite::caller(), Entry::Message(args));
    }

    fn kv(&self, level: LogLevel, entries: &[FieldValue]) {
        let pairs = key_value_pairs(entries);
        self.emit(level, CallSite::caller(), Entry::Pairs(&pairs));
    }

    fn context_kv(&self, ctx: &LogContext, level: LogLevel, entries: &[FieldValue]) {
        let mut all = Vec::with_capacity(ctx.entries().len() + entries.len());
        all.extend_from_slice(ctx.entries());
        all.extend_from_slice(entries);
        let pairs = key_value_pairs(&all);
        self.emit(level, CallSite::caller(), Entry::Pairs(&pairs));
    }

    fn level_at(&self, level: LogLevel) -> bool {
        self.level() >= level
    }

    fn flush(&self) {
        self.registry.flush();
    }

    fn fatal(&self, entries: &[FieldValue]) {
        self.emit(LogLevel::Critical, CallSite::caller(), Entry::Values(entries));
        self.exit();
    }

    fn fatalf(&self, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Critical, CallSite::caller(), Entry::Message(args));
        self.exit();
    }

    fn panic(&self, entries: &[FieldValue]) -> ! {
        let msg = join_entries(entries);
        self.emit(
            LogLevel::Critical,
            CallSite::caller(),
            Entry::Values(&[FieldValue::String(msg.clone())]),
        );
        panic!("{}", msg)
    }

    fn panicf(&self, args: fmt::Arguments<'_>) -> ! {
        let msg = args.to_string();
        self.emit(
            LogLevel::Critical,
            CallSite::caller(),
            Entry::Values(&[FieldValue::String(msg.clone())]),
        );
        panic!("{}", msg)
    }
}

impl fmt::Debug for PackageLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageLogger")
            .field("package", &self.package())
            .field("values", &self.values.len())
            .finish()
    }
}

fn join_entries(entries: &[FieldValue]) -> String {
    entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Logger that produces no output; `panic` still panics
#[derive(Debug, Clone, Copy, Default)]
pub struct NilLogger;

impl NilLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for NilLogger {
    fn log(&self, _level: LogLevel, _entries: &[FieldValue]) {}

    fn logf(&self, _level: LogLevel, _args: fmt::Arguments<'_>) {}

    fn kv(&self, _level: LogLevel, _entries: &[FieldValue]) {}

    fn context_kv(&self, _ctx: &LogContext, _level: LogLevel, _entries: &[FieldValue]) {}

    fn level_at(&self, _level: LogLevel) -> bool {
        false
    }

    fn flush(&self) {}

    fn fatal(&self, _entries: &[FieldValue]) {}

    fn fatalf(&self, _args: fmt::Arguments<'_>) {}

    fn panic(&self, entries: &[FieldValue]) -> ! {
        panic!("{}", join_entries(entries))
    }

    fn panicf(&self, args: fmt::Arguments<'_>) -> ! {
        panic!("{}", args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatters::testing::Capture;
    use crate::formatters::{FormatterOption, StringFormatter};
    use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

    fn setup() -> (Arc<Registry>, Capture) {
        let out = Capture::default();
        let formatter = StringFormatter::new(out.clone())
            .with_options(&[FormatterOption::SkipTime, FormatterOption::NoCaller]);
        (Registry::with_formatter(Arc::new(formatter)), out)
    }

    #[test]
    fn test_level_gate() {
        let (reg, out) = setup();
        let logger = reg.package_logger("acme", "db");

        logger.info(&["shown".into()]);
        logger.debug(&["hidden".into()]);
        assert_eq!(out.take(), "level=I pkg=db \"shown\"\n");

        reg.set_package_level("acme", "db", LogLevel::Debug);
        logger.debug(&["now shown".into()]);
        assert_eq!(out.take(), "level=D pkg=db \"now shown\"\n");
    }

    #[test]
    fn test_critical_always_emitted() {
        let (reg, out) = setup();
        let logger = reg.package_logger("acme", "db");
        reg.set_global_level(LogLevel::Critical);

        logger.error(&["dropped".into()]);
        logger.critical(&["kept".into()]);
        assert_eq!(out.take(), "level=C pkg=db \"kept\"\n");
    }

    #[test]
    fn test_logf() {
        let (reg, out) = setup();
        let logger = reg.package_logger("acme", "db");
        logger.noticef(format_args!("{} rows in {}ms", 12, 3));
        assert_eq!(out.take(), "level=N pkg=db \"12 rows in 3ms\"\n");

        logger.tracef(format_args!("{}", "hidden"));
        assert_eq!(out.take(), "");
    }

    #[test]
    fn test_kv_and_context_kv() {
        let (reg, out) = setup();
        let logger = reg.package_logger("acme", "db");

        logger.kv(LogLevel::Info, &["rows".into(), 12.into(), "ok".into(), true.into()]);
        assert_eq!(out.take(), "level=I pkg=db rows=12 ok=true\n");

        let ctx = LogContext::new().with_kv("request_id", "r-1");
        logger.context_kv(&ctx, LogLevel::Warning, &["slow".into(), true.into()]);
        assert_eq!(out.take(), "level=W pkg=db request_id=\"r-1\" slow=true\n");
    }

    #[test]
    #[should_panic(expected = "odd number of key-value entries: 3")]
    fn test_kv_odd_entries_panics() {
        let (reg, _out) = setup();
        let logger = reg.package_logger("acme", "db");
        logger.kv(LogLevel::Info, &["a".into(), 1.into(), "b".into()]);
    }

    #[test]
    #[should_panic(expected = "key is not a string")]
    fn test_kv_non_string_key_panics() {
        let (reg, _out) = setup();
        let logger = reg.package_logger("acme", "db");
        logger.kv(LogLevel::Info, &[1.into(), 2.into()]);
    }

    #[test]
    #[should_panic(expected = "odd number of key-value entries: 3")]
    fn test_with_values_rejects_odd_list() {
        let (reg, _out) = setup();
        let logger = reg
            .package_logger("acme", "db")
            .with_values(&["conn".into(), 7.into()]);
        let _ = logger.with_values(&["dangling".into()]);
    }

    #[test]
    fn test_with_values_is_independent() {
        let (reg, out) = setup();
        let base = reg.package_logger("acme", "db");
        let derived = base.with_values(&["conn".into(), 7.into()]);

        derived.info(&["query".into()]);
        assert_eq!(out.take(), "level=I pkg=db conn=7 \"query\"\n");

        base.info(&["plain".into()]);
        assert_eq!(out.take(), "level=I pkg=db \"plain\"\n");
        assert!(base.values().is_empty());

        // level changes reach derived handles too
        reg.set_package_level("acme", "db", LogLevel::Error);
        derived.info(&["hidden".into()]);
        assert_eq!(out.take(), "");
    }

    #[test]
    fn test_on_error_only_for_emitted_entries() {
        let (reg, _out) = setup();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        reg.set_on_error(move |_pkg| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let logger = reg.package_logger("acme", "db");
        logger.error(&["counted".into()]);
        logger.warning(&["not an error".into()]);
        reg.set_package_level("acme", "db", LogLevel::Critical);
        logger.error(&["filtered".into()]);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_caller_location() {
        let out = Capture::default();
        let formatter =
            StringFormatter::new(out.clone()).with_options(&[FormatterOption::SkipTime]);
        let reg = Registry::with_formatter(Arc::new(formatter));
        let logger = reg.package_logger("acme", "db");

        logger.info(&["here".into()]);
        let line = line!() - 1;
        assert_eq!(
            out.take(),
            format!("level=I pkg=db src=logger.rs:{} \"here\"\n", line)
        );

        let dyn_logger: &dyn Logger = &logger;
        dyn_logger.warningf(format_args!("dyn"));
        let line = line!() - 1;
        assert!(out.take().contains(&format!("src=logger.rs:{}", line)));
    }

    #[test]
    fn test_fatal_calls_exit_hook() {
        let (reg, out) = setup();
        let code = Arc::new(AtomicI32::new(0));
        let seen = Arc::clone(&code);
        reg.set_exit_fn(move |c| seen.store(c, Ordering::SeqCst));
        reg.set_global_level(LogLevel::Critical);

        let logger = reg.package_logger("acme", "db");
        logger.fatalf(format_args!("cannot start: {}", "port busy"));

        assert_eq!(code.load(Ordering::SeqCst), 1);
        assert_eq!(out.take(), "level=C pkg=db \"cannot start: port busy\"\n");
    }

    #[test]
    fn test_panic_logs_then_panics() {
        let (reg, out) = setup();
        let logger = reg.package_logger("acme", "db");

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            logger.panic(&["bad".into(), "state".into()]);
        }));
        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<String>().unwrap(), "bad state");
        assert_eq!(out.take(), "level=C pkg=db \"bad state\"\n");
    }

    #[test]
    fn test_level_at() {
        let (reg, _out) = setup();
        let logger = reg.package_logger("acme", "db");
        assert!(logger.level_at(LogLevel::Info));
        assert!(!logger.level_at(LogLevel::Debug));
        assert!(logger.level_at(LogLevel::Critical));
    }

    #[test]
    fn test_nil_logger() {
        let nil = NilLogger::new();
        nil.info(&["nothing".into()]);
        nil.kv(LogLevel::Error, &["odd".into()]);
        nil.fatal(&["no exit".into()]);
        assert!(!nil.level_at(LogLevel::Critical));

        let result = std::panic::catch_unwind(|| {
            nil.panicf(format_args!("still {}", "panics"));
        });
        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<String>().unwrap(), "still panics");
    }
}
