//! Type definitions shared by alerts, probes and synthetic transactions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Opaque key/value context attached to an alert
pub type AlertMetadata = BTreeMap<String, serde_json::Value>;

/// Alert types emitted by this subsystem
pub mod alert_types {
    pub const HEALTH_CHECK_FAILED: &str = "health_check_failed";
    pub const HEALTH_CHECK_RECOVERED: &str = "health_check_recovered";
    pub const RECOVERY_ATTEMPTED: &str = "recovery_attempted";
    pub const RECOVERY_FAILED: &str = "recovery_failed";
    pub const SYNTHETIC_FAILURE_RATE: &str = "synthetic_failure_rate";
    pub const SYNTHETIC_CONSECUTIVE_FAILURES: &str = "synthetic_consecutive_failures";
    pub const SLOW_RESPONSE: &str = "slow_response";
    pub const HIGH_ERROR_RATE: &str = "high_error_rate";
    pub const HIGH_MEMORY_USAGE: &str = "high_memory_usage";
    pub const CIRCUIT_BREAKER_OPEN: &str = "circuit_breaker_open";

    /// Every type above, in a stable order
    pub const ALL: [&str; 10] = [
        HEALTH_CHECK_FAILED,
        HEALTH_CHECK_RECOVERED,
        RECOVERY_ATTEMPTED,
        RECOVERY_FAILED,
        SYNTHETIC_FAILURE_RATE,
        SYNTHETIC_CONSECUTIVE_FAILURES,
        SLOW_RESPONSE,
        HIGH_ERROR_RATE,
        HIGH_MEMORY_USAGE,
        CIRCUIT_BREAKER_OPEN,
    ];
}

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Low => write!(f, "low"),
            AlertSeverity::Medium => write!(f, "medium"),
            AlertSeverity::High => write!(f, "high"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(AlertSeverity::Low),
            "medium" => Ok(AlertSeverity::Medium),
            "high" => Ok(AlertSeverity::High),
            "critical" => Ok(AlertSeverity::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// Alert lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Active => write!(f, "active"),
            AlertStatus::Acknowledged => write!(f, "acknowledged"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(AlertStatus::Active),
            "acknowledged" => Ok(AlertStatus::Acknowledged),
            "resolved" => Ok(AlertStatus::Resolved),
            other => Err(format!("unknown alert status '{}'", other)),
        }
    }
}

/// One delivery attempt made by an escalation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub channel: String,
    pub recipient: String,
    pub step: usize,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Alert information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique identifier
    pub id: String,
    /// Alert type, matched against rules
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub message: String,
    #[serde(default)]
    pub metadata: AlertMetadata,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub acknowledged_by: Option<String>,
    #[serde(default)]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolved_by: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Highest escalation step that has fired, if any
    #[serde(default)]
    pub escalation_level: Option<usize>,
    /// Append-only delivery log
    #[serde(default)]
    pub notification_log: Vec<NotificationRecord>,
}

impl Alert {
    /// Create an active alert with a fresh id
    pub fn new(
        alert_type: impl Into<String>,
        severity: AlertSeverity,
        message: impl Into<String>,
        metadata: AlertMetadata,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            alert_type: alert_type.into(),
            severity,
            message: message.into(),
            metadata,
            status: AlertStatus::Active,
            created_at: Utc::now(),
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_by: None,
            resolved_at: None,
            escalation_level: None,
            notification_log: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    /// Numeric metadata value, if present
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metadata.get(name).and_then(|value| value.as_f64())
    }
}

/// Build alert metadata from `key => value` pairs
#[macro_export]
macro_rules! alert_metadata {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut metadata = $crate::monitoring::AlertMetadata::new();
        $(metadata.insert($key.to_string(), serde_json::json!($value));)*
        metadata
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering_and_parsing() {
        assert!(AlertSeverity::Critical > AlertSeverity::High);
        assert!(AlertSeverity::Low < AlertSeverity::Medium);
        assert_eq!("HIGH".parse::<AlertSeverity>().unwrap(), AlertSeverity::High);
        assert!("urgent".parse::<AlertSeverity>().is_err());
    }

    #[test]
    fn test_alert_serializes_type_field() {
        let alert = Alert::new(
            alert_types::SLOW_RESPONSE,
            AlertSeverity::Medium,
            "slow",
            crate::alert_metadata!("response_time_ms" => 6200),
        );
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "slow_response");
        assert_eq!(json["status"], "active");
        assert_eq!(alert.metric("response_time_ms"), Some(6200.0));
        assert_eq!(alert.metric("missing"), None);
    }
}
