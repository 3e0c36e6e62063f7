use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How serious a log record is.
///
/// Ordered from most to least severe: a record passes a maximum level
/// filter when `record.level <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Fatal,
    /// A compilation or render failed.
    Error,
    /// Something was corrected or ignored, e.g. an invalid configuration value.
    Warn,
    /// Progress messages, and `print` output from compiler programs.
    Info,
    /// Compilation steps, include resolution, cache hits.
    Debug,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Fatal => "FATAL",
            Severity::Error => "ERROR",
            Severity::Warn => "WARN",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.label())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fatal" => Ok(Severity::Fatal),
            "error" => Ok(Severity::Error),
            "warn" | "warning" => Ok(Severity::Warn),
            "info" => Ok(Severity::Info),
            "debug" => Ok(Severity::Debug),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}

/// One log record, as forwarded to an embedding host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogMessage {
    pub level: Severity,
    pub msg: String,
}

impl LogMessage {
    pub fn new(level: Severity, msg: impl Into<String>) -> Self {
        LogMessage {
            level,
            msg: msg.into(),
        }
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level, self.msg)
    }
}
