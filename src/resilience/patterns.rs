//! Coarse error classification for recurring-failure diagnostics

use serde::{Deserialize, Serialize};

/// Coarse error family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPattern {
    Connection,
    Timeout,
    Duplicate,
    NotFound,
    Unknown,
}

impl ErrorPattern {
    /// Classify an error by its message
    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();

        // Timeouts first: "connection timed out" is a timeout
        if message.contains("timeout") || message.contains("timed out") {
            ErrorPattern::Timeout
        } else if ["econnrefused", "connection", "refused", "reset by peer", "broken pipe"]
            .iter()
            .any(|needle| message.contains(needle))
        {
            ErrorPattern::Connection
        } else if ["duplicate", "unique constraint", "already exists"]
            .iter()
            .any(|needle| message.contains(needle))
        {
            ErrorPattern::Duplicate
        } else if message.contains("not found") || message.contains("no rows") {
            ErrorPattern::NotFound
        } else {
            ErrorPattern::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorPattern::Connection => "connection",
            ErrorPattern::Timeout => "timeout",
            ErrorPattern::Duplicate => "duplicate",
            ErrorPattern::NotFound => "not_found",
            ErrorPattern::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of recording one error occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPatternReport {
    pub name: String,
    pub pattern: ErrorPattern,
    pub occurrences: u64,
    /// Set once the pattern has recurred often enough to warrant attention
    pub recurring: bool,
}
