//! Health probe types and the per-probe state machine

use crate::config::ProbeKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Probe health as seen by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// No successful check yet
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Unknown => write!(f, "unknown"),
            ProbeStatus::Healthy => write!(f, "healthy"),
            ProbeStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Transition produced by one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeTransition {
    /// First success of a probe that never succeeded
    BecameHealthy,
    /// Failure streak reached the threshold
    BecameUnhealthy,
    /// First success after turning unhealthy
    Recovered,
}

/// Mutable state of one probe
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProbeState {
    pub status: ProbeStatus,
    pub consecutive_failures: u32,
    /// Set on the transition to unhealthy, cleared by the next success
    pub recovering: bool,
    pub last_check_at: Option<DateTime<Utc>>,
    pub last_response_time_ms: Option<u64>,
    pub last_error: Option<String>,
    pub total_checks: u64,
    pub total_failures: u64,
}

impl ProbeState {
    /// Fold one check result into the state
    ///
    /// A probe turns unhealthy once, when its streak reaches `failure_threshold`;
    /// further failures only extend the streak.
    pub fn apply(&mut self, success: bool, failure_threshold: u32) -> Option<ProbeTransition> {
        self.total_checks += 1;

        if success {
            self.consecutive_failures = 0;
            self.last_error = None;

            if self.recovering || self.status == ProbeStatus::Unhealthy {
                self.status = ProbeStatus::Healthy;
                self.recovering = false;
                return Some(ProbeTransition::Recovered);
            }
            if self.status == ProbeStatus::Unknown {
                self.status = ProbeStatus::Healthy;
                return Some(ProbeTransition::BecameHealthy);
            }
            return None;
        }

        self.total_failures += 1;
        self.consecutive_failures += 1;

        if self.consecutive_failures >= failure_threshold && self.status != ProbeStatus::Unhealthy {
            self.status = ProbeStatus::Unhealthy;
            self.recovering = true;
            return Some(ProbeTransition::BecameUnhealthy);
        }
        None
    }
}

/// What a successful check reports
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckOutput {
    pub message: Option<String>,
    pub details: BTreeMap<String, Value>,
    /// Host memory usage sampled by the check, if any
    pub memory_usage_percent: Option<f64>,
}

impl CheckOutput {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Result of one scheduled or manual probe execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeRun {
    pub name: String,
    pub success: bool,
    pub response_time_ms: u64,
    pub error: Option<String>,
    /// Status after this run
    pub status: ProbeStatus,
    pub consecutive_failures: u32,
    pub transition: Option<ProbeTransition>,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
}

/// Status report of one probe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub name: String,
    pub kind: ProbeKind,
    pub status: ProbeStatus,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub recovering: bool,
    pub last_check_at: Option<DateTime<Utc>>,
    pub last_response_time_ms: Option<u64>,
    pub last_error: Option<String>,
    pub total_checks: u64,
    pub total_failures: u64,
    pub interval_ms: u64,
    pub enabled: bool,
}
