//! Helper functions for creating and inspecting errors

use super::types::ResilienceError;

#[allow(dead_code)]
impl ResilienceError {
    pub fn circuit_open<S: Into<String>>(name: S) -> Self {
        Self::CircuitOpen { name: name.into() }
    }

    pub fn operation<S: Into<String>>(message: S) -> Self {
        Self::Operation(message.into())
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    pub fn notification<S: Into<String>>(message: S) -> Self {
        Self::Notification(message.into())
    }

    pub fn recovery<S: Into<String>>(message: S) -> Self {
        Self::Recovery(message.into())
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the error is a breaker-open rejection
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Whether the error refers to an unknown alert, rule, policy or task
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Short machine-readable code used in API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::CircuitOpen { .. } => "CIRCUIT_OPEN",
            Self::Operation(_) => "OPERATION_FAILED",
            Self::Timeout(_) => "TIMEOUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Notification(_) => "NOTIFICATION_FAILED",
            Self::Recovery(_) => "RECOVERY_FAILED",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::HttpClient(_) => "HTTP_CLIENT_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Yaml(_) => "YAML_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
