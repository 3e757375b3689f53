//! Level registry
//!
//! A [`Registry`] maps `repository → package → level` and owns the single
//! active [`Formatter`], the optional error hook and the process-exit hook.
//! All of it sits behind one mutex: level changes, formatter swaps and the
//! formatting of each accepted entry are serialized against each other.
//!
//! Most programs use the process-wide instance from [`Registry::global`];
//! tests build their own with [`Registry::new`] to get isolated state.

use super::config::LoggerConfig;
use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::logger::PackageLogger;
use crate::formatters::{default_formatter, Formatter};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI8, Ordering};
use std::sync::{Arc, OnceLock};

/// Called with the package name whenever an ERROR entry is emitted
pub type ErrorHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Called with the exit code by `fatal`
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// Wildcard naming every package of a repository, or every repository
pub const WILDCARD: &str = "*";

/// Level slot of one package, shared by every handle of that package.
///
/// The level is only read and written while the registry lock is held;
/// the atomic just lets the slot be shared without a second lock.
#[derive(Debug)]
pub(crate) struct PackageSlot {
    name: String,
    level: AtomicI8,
}

impl PackageSlot {
    fn new(name: &str, level: LogLevel) -> Self {
        Self {
            name: name.to_string(),
            level: AtomicI8::new(level as i8),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> LogLevel {
        LogLevel::from_i8(self.level.load(Ordering::Relaxed)).unwrap_or_default()
    }

    fn set_level(&self, level: LogLevel) {
        self.level.store(level as i8, Ordering::Relaxed);
    }
}

type PackageMap = HashMap<String, Arc<PackageSlot>>;

struct State {
    repos: HashMap<String, PackageMap>,
    default_level: LogLevel,
    formatter: Option<Arc<dyn Formatter>>,
    on_error: Option<ErrorHook>,
    exit_fn: ExitHook,
}

impl State {
    fn set_repo_level(&self, repo: &str, level: LogLevel) {
        if let Some(packages) = self.repos.get(repo) {
            for slot in packages.values() {
                slot.set_level(level);
            }
        }
    }
}

/// Registry of package levels and the active formatter
pub struct Registry {
    state: Mutex<State>,
}

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

fn process_exit(code: i32) {
    std::process::exit(code)
}

impl Registry {
    /// Create an empty registry writing pretty lines to stderr
    pub fn new() -> Arc<Self> {
        Self::with_formatter(default_formatter())
    }

    /// Create an empty registry with the given formatter
    pub fn with_formatter(formatter: Arc<dyn Formatter>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                repos: HashMap::new(),
                default_level: LogLevel::Info,
                formatter: Some(formatter),
                on_error: None,
                exit_fn: Arc::new(process_exit),
            }),
        })
    }

    /// The process-wide registry.
    ///
    /// Created on first use; `XLOG_LEVEL` and `XLOG_FORMATTER` are applied
    /// at that point. An invalid value is reported on stderr and ignored;
    /// the other variable still applies.
    pub fn global() -> Arc<Registry> {
        GLOBAL
            .get_or_init(|| {
                let registry = Registry::new();
                let (config, errors) = LoggerConfig::from_env_lenient();
                for e in errors {
                    eprintln!("[LOGGER WARNING] Ignoring logging environment: {}", e);
                }
                config.apply(&registry);
                registry
            })
            .clone()
    }

    /// Get the logger of `pkg` in `repo`, registering the package on first
    /// use at the registry's default level (INFO unless configured).
    pub fn package_logger(self: &Arc<Self>, repo: &str, pkg: &str) -> PackageLogger {
        let slot = {
            let mut state = self.state.lock();
            let default_level = state.default_level;
            state
                .repos
                .entry(repo.to_string())
                .or_default()
                .entry(pkg.to_string())
                .or_insert_with(|| Arc::new(PackageSlot::new(pkg, default_level)))
                .clone()
        };
        PackageLogger::new(Arc::clone(self), slot)
    }

    /// Handle over the packages of `repo`
    pub fn repo_logger(self: &Arc<Self>, repo: &str) -> Result<RepoLogger> {
        if self.state.lock().repos.contains_key(repo) {
            Ok(RepoLogger {
                registry: Arc::clone(self),
                repo: repo.to_string(),
            })
        } else {
            Err(LoggerError::repo_not_found(repo))
        }
    }

    /// Like [`repo_logger`](Self::repo_logger), but panics if `repo` was
    /// never registered.
    #[track_caller]
    pub fn must_repo_logger(self: &Arc<Self>, repo: &str) -> RepoLogger {
        match self.repo_logger(repo) {
            Ok(r) => r,
            Err(e) => panic!("{}", e),
        }
    }

    /// Set the level of every registered package of every repository.
    /// Packages registered later still start at the default level.
    pub fn set_global_level(&self, level: LogLevel) {
        let state = self.state.lock();
        for repo in state.repos.keys() {
            state.set_repo_level(repo, level);
        }
    }

    /// Level given to packages when they are first registered
    pub fn set_default_level(&self, level: LogLevel) {
        self.state.lock().default_level = level;
    }

    /// Set the level of every package of `repo`; unknown repositories are
    /// ignored.
    pub fn set_repo_level(&self, repo: &str, level: LogLevel) {
        self.state.lock().set_repo_level(repo, level);
    }

    /// Set the level of one package. An empty or `*` package name means the
    /// whole repository; unknown repositories and packages are ignored.
    pub fn set_package_level(&self, repo: &str, pkg: &str, level: LogLevel) {
        if pkg.is_empty() || pkg == WILDCARD {
            self.set_repo_level(repo, level);
            return;
        }
        let state = self.state.lock();
        if let Some(slot) = state.repos.get(repo).and_then(|p| p.get(pkg)) {
            slot.set_level(level);
        }
    }

    /// Apply a list of level settings in order. A `*` repository means
    /// every repository. Entries whose level does not parse are skipped.
    pub fn set_repo_levels(&self, levels: &[RepoLogLevel]) {
        for entry in levels {
            let level = match entry.level.parse::<LogLevel>() {
                Ok(l) => l,
                Err(e) => {
                    eprintln!(
                        "[LOGGER WARNING] Skipping level setting for {}/{}: {}",
                        entry.repo, entry.package, e
                    );
                    continue;
                }
            };
            if entry.repo == WILDCARD {
                self.set_global_level(level);
            } else {
                self.set_package_level(&entry.repo, &entry.package, level);
            }
        }
    }

    /// Snapshot of every registered package's level, sorted by repository
    /// then package. The empty package name is reported as `*`.
    pub fn levels(&self) -> Vec<RepoLogLevel> {
        let state = self.state.lock();
        let mut list: Vec<RepoLogLevel> = state
            .repos
            .iter()
            .flat_map(|(repo, packages)| {
                packages.iter().map(move |(pkg, slot)| RepoLogLevel {
                    repo: repo.clone(),
                    package: if pkg.is_empty() { WILDCARD.to_string() } else { pkg.clone() },
                    level: slot.level().to_string(),
                })
            })
            .collect();
        list.sort_by(|a, b| (&a.repo, &a.package).cmp(&(&b.repo, &b.package)));
        list
    }

    pub fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        self.state.lock().formatter = Some(formatter);
    }

    pub fn formatter(&self) -> Option<Arc<dyn Formatter>> {
        self.state.lock().formatter.clone()
    }

    /// Install `formatter` and return the one it replaces, in one step
    pub fn replace_formatter(
        &self,
        formatter: Option<Arc<dyn Formatter>>,
    ) -> Option<Arc<dyn Formatter>> {
        std::mem::replace(&mut self.state.lock().formatter, formatter)
    }

    /// Install a hook called with the package name for each emitted ERROR
    /// entry. The hook runs under the registry lock and must not log.
    pub fn set_on_error<F>(&self, hook: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.state.lock().on_error = Some(Arc::new(hook));
    }

    pub fn clear_on_error(&self) {
        self.state.lock().on_error = None;
    }

    /// Replace the function `fatal` calls after logging
    pub fn set_exit_fn<F>(&self, exit: F)
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.state.lock().exit_fn = Arc::new(exit);
    }

    pub(crate) fn exit_fn(&self) -> ExitHook {
        Arc::clone(&self.state.lock().exit_fn)
    }

    /// Current level of a package slot
    pub(crate) fn level_of(&self, slot: &PackageSlot) -> LogLevel {
        let _state = self.state.lock();
        slot.level()
    }

    /// Run `render` against the active formatter if `level` passes the
    /// slot's level gate. Returns whether the entry was emitted.
    pub(crate) fn dispatch<F>(&self, slot: &PackageSlot, level: LogLevel, render: F) -> bool
    where
        F: FnOnce(&dyn Formatter),
    {
        let state = self.state.lock();
        if !slot.level().allows(level) {
            return false;
        }
        if level == LogLevel::Error {
            if let Some(hook) = &state.on_error {
                hook(slot.name());
            }
        }
        if let Some(formatter) = &state.formatter {
            render(formatter.as_ref());
        }
        true
    }

    /// Flush the active formatter
    pub fn flush(&self) {
        let state = self.state.lock();
        if let Some(formatter) = &state.formatter {
            formatter.flush();
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Registry")
            .field("repos", &state.repos.len())
            .field("default_level", &state.default_level)
            .field("has_formatter", &state.formatter.is_some())
            .finish()
    }
}

/// Handle over the packages of one repository
#[derive(Clone)]
pub struct RepoLogger {
    registry: Arc<Registry>,
    repo: String,
}

impl RepoLogger {
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Set the level of every package in the repository
    pub fn set_repo_level(&self, level: LogLevel) {
        self.registry.set_repo_level(&self.repo, level);
    }

    /// Set package levels from a map of package name to level.
    ///
    /// A `*` entry is applied to every package first, then specific names
    /// override it, regardless of map order. Names not registered at the
    /// time of the call are ignored.
    pub fn set_levels(&self, levels: &HashMap<String, LogLevel>) {
        let state = self.registry.state.lock();
        let Some(packages) = state.repos.get(&self.repo) else {
            return;
        };
        if let Some(level) = levels.get(WILDCARD) {
            for slot in packages.values() {
                slot.set_level(*level);
            }
        }
        for (pkg, level) in levels {
            if pkg == WILDCARD {
                continue;
            }
            if let Some(slot) = packages.get(pkg) {
                slot.set_level(*level);
            }
        }
    }

    /// Parse `pkg=LEVEL,pkg2=LEVEL` into a map for [`set_levels`](Self::set_levels)
    pub fn parse_level_config(&self, conf: &str) -> Result<HashMap<String, LogLevel>> {
        let mut out = HashMap::new();
        for item in conf.split(',') {
            let setting: Vec<&str> = item.split('=').collect();
            if setting.len() != 2 {
                return Err(LoggerError::config(
                    "RepoLogger",
                    format!("oddly structured `pkg=level` option: {}", item),
                ));
            }
            let level = setting[1].parse::<LogLevel>()?;
            out.insert(setting[0].to_string(), level);
        }
        Ok(out)
    }

    /// Names of the registered packages, sorted
    pub fn packages(&self) -> Vec<String> {
        let state = self.registry.state.lock();
        let mut names: Vec<String> = state
            .repos
            .get(&self.repo)
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Current level of a registered package
    pub fn level(&self, pkg: &str) -> Option<LogLevel> {
        let state = self.registry.state.lock();
        state
            .repos
            .get(&self.repo)
            .and_then(|p| p.get(pkg))
            .map(|slot| slot.level())
    }
}

impl fmt::Debug for RepoLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoLogger").field("repo", &self.repo).finish()
    }
}

/// One level setting: `repo` (`*` for every repository), `package`
/// (empty or `*` for the whole repository) and a level name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoLogLevel {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub package: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub level: String,
}

impl RepoLogLevel {
    pub fn new(repo: impl Into<String>, package: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            package: package.into(),
            level: level.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatters::NilFormatter;
    use std::sync::atomic::AtomicUsize;

    fn registry() -> Arc<Registry> {
        Registry::with_formatter(Arc::new(NilFormatter::new()))
    }

    #[test]
    fn test_package_logger_is_idempotent() {
        let reg = registry();
        let a = reg.package_logger("acme/api", "server");
        let b = reg.package_logger("acme/api", "server");
        assert_eq!(a.level(), LogLevel::Info);

        reg.set_package_level("acme/api", "server", LogLevel::Debug);
        assert_eq!(a.level(), LogLevel::Debug);
        assert_eq!(b.level(), LogLevel::Debug);
        assert_eq!(reg.levels().len(), 1);
    }

    #[test]
    fn test_repo_logger_not_found() {
        let reg = registry();
        let err = reg.repo_logger("nowhere").unwrap_err();
        assert_eq!(err.to_string(), "no packages registered for repo: nowhere");

        reg.package_logger("somewhere", "pkg");
        assert!(reg.repo_logger("somewhere").is_ok());
    }

    #[test]
    #[should_panic(expected = "no packages registered for repo: nowhere")]
    fn test_must_repo_logger_panics() {
        let reg = registry();
        let _ = reg.must_repo_logger("nowhere");
    }

    #[test]
    fn test_wildcard_applied_before_specific() {
        let reg = registry();
        reg.package_logger("acme", "a");
        reg.package_logger("acme", "b");
        reg.package_logger("acme", "c");
        let repo = reg.must_repo_logger("acme");

        // Repeat with fresh maps: HashMap iteration order differs per instance
        for _ in 0..16 {
            let mut levels = HashMap::new();
            levels.insert("b".to_string(), LogLevel::Debug);
            levels.insert("*".to_string(), LogLevel::Error);
            levels.insert("unknown".to_string(), LogLevel::Trace);
            repo.set_levels(&levels);

            assert_eq!(repo.level("a"), Some(LogLevel::Error));
            assert_eq!(repo.level("b"), Some(LogLevel::Debug));
            assert_eq!(repo.level("c"), Some(LogLevel::Error));
        }
        assert_eq!(repo.level("unknown"), None);
        assert_eq!(repo.packages(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_set_global_level_only_affects_registered() {
        let reg = registry();
        let early = reg.package_logger("r1", "p");
        let other = reg.package_logger("r2", "p");
        reg.set_global_level(LogLevel::Warning);
        let late = reg.package_logger("r3", "p");

        assert_eq!(early.level(), LogLevel::Warning);
        assert_eq!(other.level(), LogLevel::Warning);
        assert_eq!(late.level(), LogLevel::Info);
    }

    #[test]
    fn test_default_level_for_new_packages() {
        let reg = registry();
        reg.set_default_level(LogLevel::Trace);
        assert_eq!(reg.package_logger("r", "p").level(), LogLevel::Trace);
    }

    #[test]
    fn test_set_package_level_wildcard_and_unknown() {
        let reg = registry();
        let a = reg.package_logger("repo", "a");
        let b = reg.package_logger("repo", "b");

        reg.set_package_level("repo", "*", LogLevel::Notice);
        assert_eq!(a.level(), LogLevel::Notice);
        assert_eq!(b.level(), LogLevel::Notice);

        reg.set_package_level("repo", "", LogLevel::Trace);
        assert_eq!(a.level(), LogLevel::Trace);

        // unknown repo and package: no effect, no registration
        reg.set_package_level("repo", "zzz", LogLevel::Error);
        reg.set_package_level("nope", "a", LogLevel::Error);
        assert_eq!(reg.levels().len(), 2);
    }

    #[test]
    fn test_parse_level_config() {
        let reg = registry();
        reg.package_logger("repo", "a");
        let repo = reg.must_repo_logger("repo");

        let map = repo.parse_level_config("a=DEBUG,*=E").unwrap();
        assert_eq!(map["a"], LogLevel::Debug);
        assert_eq!(map["*"], LogLevel::Error);

        let err = repo.parse_level_config("a=DEBUG,broken").unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("broken"));

        let err = repo.parse_level_config("a=LOUD").unwrap_err();
        assert_eq!(err.to_string(), "unable to parse log level: LOUD");
    }

    #[test]
    fn test_levels_snapshot_sorted() {
        let reg = registry();
        reg.package_logger("zeta", "x");
        reg.package_logger("alpha", "b");
        reg.package_logger("alpha", "a");
        reg.package_logger("alpha", "");
        reg.set_package_level("alpha", "b", LogLevel::Debug);

        let levels = reg.levels();
        let keys: Vec<(&str, &str, &str)> = levels
            .iter()
            .map(|l| (l.repo.as_str(), l.package.as_str(), l.level.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("alpha", "*", "INFO"),
                ("alpha", "a", "INFO"),
                ("alpha", "b", "DEBUG"),
                ("zeta", "x", "INFO"),
            ]
        );
    }

    #[test]
    fn test_set_repo_levels_is_lenient() {
        let reg = registry();
        let a = reg.package_logger("r1", "a");
        let b = reg.package_logger("r2", "b");

        reg.set_repo_levels(&[
            RepoLogLevel::new("*", "", "WARNING"),
            RepoLogLevel::new("r1", "a", "bogus"),
            RepoLogLevel::new("r2", "b", "DEBUG"),
        ]);

        assert_eq!(a.level(), LogLevel::Warning);
        assert_eq!(b.level(), LogLevel::Debug);
    }

    #[test]
    fn test_replace_formatter() {
        let reg = registry();
        let replacement: Arc<dyn Formatter> = Arc::new(NilFormatter::new());
        let previous = reg.replace_formatter(Some(Arc::clone(&replacement)));
        assert!(previous.is_some());
        assert!(Arc::ptr_eq(&reg.formatter().unwrap(), &replacement));

        reg.replace_formatter(previous);
        assert!(!Arc::ptr_eq(&reg.formatter().unwrap(), &replacement));
    }

    #[test]
    fn test_dispatch_gate_and_error_hook() {
        let reg = registry();
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&errors);
        reg.set_on_error(move |pkg| {
            assert_eq!(pkg, "p");
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let logger = reg.package_logger("r", "p");
        let slot = logger.slot();
        assert!(reg.dispatch(slot, LogLevel::Error, |_| {}));
        assert!(!reg.dispatch(slot, LogLevel::Debug, |_| {}));

        reg.set_package_level("r", "p", LogLevel::Critical);
        assert!(!reg.dispatch(slot, LogLevel::Error, |_| {}));
        assert!(reg.dispatch(slot, LogLevel::Critical, |_| {}));

        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_repo_log_level_serde() {
        let json = r#"[{"repo":"*","level":"INFO"},{"repo":"acme","package":"db","level":"DEBUG"}]"#;
        let levels: Vec<RepoLogLevel> = serde_json::from_str(json).unwrap();
        assert_eq!(levels[0], RepoLogLevel::new("*", "", "INFO"));
        assert_eq!(levels[1].package, "db");

        let out = serde_json::to_string(&levels[0]).unwrap();
        assert_eq!(out, r#"{"repo":"*","level":"INFO"}"#);
    }
}
