//! Error types for the resilience subsystem

use thiserror::Error;

/// Result type alias for the resilience subsystem
pub type Result<T> = std::result::Result<T, ResilienceError>;

/// Main error type for the resilience subsystem
#[derive(Error, Debug)]
pub enum ResilienceError {
    /// The breaker rejected the call without attempting it
    #[error("Circuit breaker '{name}' is open")]
    CircuitOpen { name: String },

    /// The guarded operation itself failed
    #[error("Operation failed: {0}")]
    Operation(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// Recovery action errors
    #[error("Recovery error: {0}")]
    Recovery(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tokio::time::error::Elapsed> for ResilienceError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Self::Timeout(err.to_string())
    }
}
