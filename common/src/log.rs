//! Verbosity levels and the logging targets shared by every crate.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! binary's job. The level travels explicitly as a [`LogLevel`] value.

use std::fmt;
use std::str::FromStr;

/// Target for plain report output that bypasses the level symbols.
pub const PRINT_TARGET: &str = "sshsweep::print";

/// Target for positive confirmations rendered with their own symbol.
pub const SUCCESS_TARGET: &str = "sshsweep::success";

/// Logs a positive confirmation such as "found 3 devices".
#[macro_export]
macro_rules! success {
    ($($arg:tt)+) => {
        $crate::log::__tracing::info!(target: "sshsweep::success", $($arg)+)
    };
}

#[doc(hidden)]
pub use tracing as __tracing;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Resolves the configured level, falling back to `INFO`.
    ///
    /// The rejected input is handed back so the caller can warn about it once
    /// a subscriber is installed.
    pub fn resolve(configured: Option<&str>) -> (LogLevel, Option<String>) {
        match configured.map(str::trim).filter(|s| !s.is_empty()) {
            None => (LogLevel::default(), None),
            Some(raw) => match raw.parse() {
                Ok(level) => (level, None),
                Err(_) => (LogLevel::default(), Some(raw.to_string())),
            },
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_directive().to_ascii_uppercase())
    }
}
