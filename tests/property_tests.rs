//! Property-based tests for repo_logger using proptest

use proptest::prelude::*;
use repo_logger::prelude::*;
use repo_logger::{SharedSink, StringFormatter};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop::sample::select(LogLevel::ALL.to_vec())
}

const PACKAGES: [&str; 5] = ["api", "db", "cache", "queue", "auth"];

// ============================================================================
// LogLevel
// ============================================================================

proptest! {
    /// Names and single characters parse back to the same level
    #[test]
    fn test_level_parse_roundtrip(level in any_level()) {
        prop_assert_eq!(level.to_str().parse::<LogLevel>().unwrap(), level);
        prop_assert_eq!(level.to_str().to_lowercase().parse::<LogLevel>().unwrap(), level);
        prop_assert_eq!(level.as_char().to_string().parse::<LogLevel>().unwrap(), level);
    }

    /// A package at `config` emits `entry` iff it is at most as verbose, or CRITICAL
    #[test]
    fn test_level_gate(config in any_level(), entry in any_level()) {
        let expected = entry == LogLevel::Critical || entry <= config;
        prop_assert_eq!(config.allows(entry), expected);
        prop_assert!(config.allows(LogLevel::Critical));
    }

    /// Anything that is not a level name fails to parse
    #[test]
    fn test_level_parse_rejects_garbage(s in "[a-z]{6,12}") {
        let known = ["critical", "warning", "notice"];
        prop_assume!(!known.contains(&s.as_str()));
        prop_assert!(s.parse::<LogLevel>().is_err());
    }
}

// ============================================================================
// Registry
// ============================================================================

proptest! {
    /// The wildcard applies first, specific entries override it, whatever
    /// order the map yields them in
    #[test]
    fn test_wildcard_before_specific(
        wildcard in proptest::option::of(any_level()),
        settings in prop::collection::vec((prop::sample::select(PACKAGES.to_vec()), any_level()), 0..8),
    ) {
        let specific: HashMap<&str, LogLevel> = settings.into_iter().collect();
        let registry = Registry::new();
        for pkg in PACKAGES {
            registry.package_logger("acme", pkg);
        }
        let repo = registry.must_repo_logger("acme");

        let mut levels: HashMap<String, LogLevel> = specific
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        if let Some(w) = wildcard {
            levels.insert("*".to_string(), w);
        }
        repo.set_levels(&levels);

        for pkg in PACKAGES {
            let expected = specific
                .get(pkg)
                .copied()
                .or(wildcard)
                .unwrap_or(LogLevel::Info);
            prop_assert_eq!(repo.level(pkg), Some(expected));
        }
    }

    /// Level lists are applied in order; the last setting for a package wins
    #[test]
    fn test_level_list_last_wins(
        settings in prop::collection::vec((prop::sample::select(PACKAGES.to_vec()), any_level()), 1..20),
    ) {
        let registry = Registry::new();
        for pkg in PACKAGES {
            registry.package_logger("acme", pkg);
        }
        let list: Vec<RepoLogLevel> = settings
            .iter()
            .map(|(pkg, level)| RepoLogLevel::new("acme", *pkg, level.to_str()))
            .collect();
        registry.set_repo_levels(&list);

        let repo = registry.must_repo_logger("acme");
        for pkg in PACKAGES {
            let expected = settings
                .iter()
                .rev()
                .find(|(p, _)| *p == pkg)
                .map(|(_, l)| *l)
                .unwrap_or(LogLevel::Info);
            prop_assert_eq!(repo.level(pkg), Some(expected));
        }
    }

    /// Exactly the entries passing the gate reach the formatter
    #[test]
    fn test_emitted_entries_match_gate(
        config in any_level(),
        entries in prop::collection::vec(any_level(), 0..50),
    ) {
        let out = SharedSink::new(Vec::new());
        let formatter = StringFormatter::new(out.clone())
            .with_options(&[FormatterOption::SkipTime, FormatterOption::NoCaller]);
        let registry = Registry::with_formatter(Arc::new(formatter));
        let logger = registry.package_logger("acme", "db");
        registry.set_package_level("acme", "db", config);

        for level in &entries {
            logger.log(*level, &["x".into()]);
        }

        let expected: String = entries
            .iter()
            .filter(|l| config.allows(**l))
            .map(|l| format!("level={} pkg=db \"x\"\n", l.as_char()))
            .collect();
        let actual = out.with(|buf| String::from_utf8(buf.clone()).unwrap());
        prop_assert_eq!(actual, expected);
    }
}

// ============================================================================
// ChannelWriter
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever is written arrives once, in order, by the time stop returns
    #[test]
    fn test_channel_writer_delivers_in_order(
        buffers in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..100),
        capacity in 1usize..16,
    ) {
        let sink = SharedSink::new(Vec::new());
        let writer = ChannelWriter::new(sink.clone(), capacity, Duration::from_millis(1)).unwrap();
        for buf in &buffers {
            writer.write(buf).unwrap();
        }
        writer.stop();

        let expected: Vec<u8> = buffers.concat();
        prop_assert_eq!(sink.with(|v| v.clone()), expected);
        prop_assert_eq!(writer.metrics().written_count() as usize, buffers.len());
    }
}
