//! Log level definitions

use super::error::LoggerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Severity of a log entry.
///
/// Levels are ordered by verbosity: `Critical` is the lowest (most severe)
/// and `Debug` the highest. A package configured at level `L` emits every
/// entry whose level is `<= L`; `Critical` entries are always emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(i8)]
pub enum LogLevel {
    /// Errors that will end the program
    Critical = -1,
    /// Errors that are not fatal but lead to troubling behavior
    Error = 0,
    /// Unusual conditions, often misconfiguration
    Warning = 1,
    /// Normal but significant conditions
    Notice = 2,
    /// Common, everyday updates
    #[default]
    Info = 3,
    /// Call-by-call tracing
    Trace = 4,
    /// Verbose internal details, hidden by default
    Debug = 5,
}

impl LogLevel {
    /// All levels, from most to least severe
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Critical,
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Notice,
        LogLevel::Info,
        LogLevel::Trace,
        LogLevel::Debug,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Critical => "CRITICAL",
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Notice => "NOTICE",
            LogLevel::Info => "INFO",
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Single-character representation used by the text formatters
    pub fn as_char(&self) -> char {
        match self {
            LogLevel::Critical => 'C',
            LogLevel::Error => 'E',
            LogLevel::Warning => 'W',
            LogLevel::Notice => 'N',
            LogLevel::Info => 'I',
            LogLevel::Trace => 'T',
            LogLevel::Debug => 'D',
        }
    }

    pub(crate) fn from_i8(value: i8) -> Option<LogLevel> {
        LogLevel::ALL.iter().copied().find(|l| *l as i8 == value)
    }

    /// Whether a package configured at `self` emits an entry at `entry`.
    #[inline]
    pub fn allows(&self, entry: LogLevel) -> bool {
        entry == LogLevel::Critical || entry <= *self
    }

    #[cfg(feature = "color")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            LogLevel::Critical | LogLevel::Error => BrightRed,
            LogLevel::Warning => BrightYellow,
            LogLevel::Notice => BrightGreen,
            LogLevel::Info => BrightCyan,
            LogLevel::Trace => White,
            LogLevel::Debug => Magenta,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = LoggerError;

    /// Accepts level names, their single-character forms, and the numeric
    /// forms `0`..`5` (ERROR..DEBUG). Matching is case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CRITICAL" | "C" => Ok(LogLevel::Critical),
            "ERROR" | "0" | "E" => Ok(LogLevel::Error),
            "WARNING" | "WARN" | "1" | "W" => Ok(LogLevel::Warning),
            "NOTICE" | "2" | "N" => Ok(LogLevel::Notice),
            "INFO" | "3" | "I" => Ok(LogLevel::Info),
            "TRACE" | "4" | "T" => Ok(LogLevel::Trace),
            "DEBUG" | "5" | "D" => Ok(LogLevel::Debug),
            _ => Err(LoggerError::parse_level(s)),
        }
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.to_str())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
