//! Log level selection from the `LOG_LEVEL` environment variable

use std::fmt;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

/// Environment variable holding the log level
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";

/// Recognized `LOG_LEVEL` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Critical,
    Error,
    #[default]
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    /// All levels, most severe first
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Critical,
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Info,
        LogLevel::Debug,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Critical => "CRITICAL",
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Tracing has no critical level; it shares the error filter
    pub fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Critical | LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
        }
    }

    /// Resolves the level from an optional `LOG_LEVEL` value
    ///
    /// Unset means the default. An unrecognized value also yields the
    /// default, together with a diagnostic for the error stream.
    pub fn resolve(value: Option<&str>) -> (LogLevel, Option<String>) {
        match value.map(str::parse::<LogLevel>) {
            None => (LogLevel::default(), None),
            Some(Ok(level)) => (level, None),
            Some(Err(err)) => (LogLevel::default(), Some(err.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized `LOG_LEVEL` value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Expected log level: CRITICAL|ERROR|WARNING|INFO|DEBUG, got: {0}. Using default level WARNING.")]
pub struct UnknownLogLevel(pub String);

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| UnknownLogLevel(s.to_string()))
    }
}

/// Installs the global subscriber, writing to stderr
///
/// Returns the level in effect.
pub fn init() -> LogLevel {
    let value = std::env::var(LOG_LEVEL_VAR).ok();
    let (level, diagnostic) = LogLevel::resolve(value.as_deref());
    if let Some(message) = diagnostic {
        eprintln!("{message}");
    }

    // a subscriber may already be installed, e.g. by a test harness
    let _ = tracing_subscriber::fmt()
        .with_max_level(level.filter())
        .with_writer(std::io::stderr)
        .try_init();
    level
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels() {
        assert_eq!("CRITICAL".parse::<LogLevel>(), Ok(LogLevel::Critical));
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert!("debug".parse::<LogLevel>().is_err());
        assert!("TRACE".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_resolve_unset() {
        assert_eq!(LogLevel::resolve(None), (LogLevel::Warning, None));
    }

    #[test]
    fn test_resolve_known() {
        assert_eq!(LogLevel::resolve(Some("INFO")), (LogLevel::Info, None));
    }

    #[test]
    fn test_resolve_unknown_falls_back() {
        let (level, diagnostic) = LogLevel::resolve(Some("LOUD"));
        assert_eq!(level, LogLevel::Warning);
        let message = diagnostic.unwrap();
        assert!(message.contains("got: LOUD"));
        assert!(message.contains("WARNING"));
    }

    #[test]
    fn test_filters() {
        assert_eq!(LogLevel::Critical.filter(), LevelFilter::ERROR);
        assert_eq!(LogLevel::Warning.filter(), LevelFilter::WARN);
        assert_eq!(LogLevel::Debug.filter(), LevelFilter::DEBUG);
        assert_eq!(LogLevel::Info.to_string(), "INFO");
    }
}
