//! Health probe configuration

use super::default_true;
use crate::monitoring::AlertSeverity;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Probe kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Process is up and answering
    Liveness,
    /// Host resource usage
    Detailed,
    /// An external dependency, through its breaker
    Dependency,
    /// The primary data store, through its breaker
    DataStore,
}

impl ProbeKind {
    /// Severity of the alert raised when a probe of this kind turns unhealthy
    pub fn default_severity(self) -> AlertSeverity {
        match self {
            ProbeKind::DataStore => AlertSeverity::Critical,
            ProbeKind::Dependency => AlertSeverity::High,
            ProbeKind::Liveness | ProbeKind::Detailed => AlertSeverity::Medium,
        }
    }
}

/// Recovery strategy attempted when a probe turns unhealthy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecoveryConfig {
    /// Force the named breaker closed
    ResetBreaker { breaker: String },
}

/// One scheduled probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub name: String,
    pub kind: ProbeKind,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Ceiling on a single check
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Consecutive failures before the probe turns unhealthy
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Checks slower than this count as failures
    #[serde(default = "default_response_time_ceiling_ms")]
    pub response_time_ceiling_ms: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Breaker / health predicate name for dependency and data store probes
    #[serde(default)]
    pub dependency: Option<String>,
    /// HTTP endpoint polled instead of the registered predicate
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub recovery: Option<RecoveryConfig>,
    /// Overrides the per-kind alert severity
    #[serde(default)]
    pub severity: Option<AlertSeverity>,
}

fn default_interval_ms() -> u64 {
    30_000
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_response_time_ceiling_ms() -> u64 {
    5_000
}

impl ProbeConfig {
    pub fn new(name: impl Into<String>, kind: ProbeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
            failure_threshold: default_failure_threshold(),
            response_time_ceiling_ms: default_response_time_ceiling_ms(),
            enabled: true,
            dependency: None,
            url: None,
            recovery: None,
            severity: None,
        }
    }

    /// Probe a named dependency and reset its breaker on failure
    pub fn for_dependency(name: impl Into<String>, kind: ProbeKind, dependency: &str) -> Self {
        let mut probe = Self::new(name, kind);
        probe.dependency = Some(dependency.to_string());
        probe.recovery = Some(RecoveryConfig::ResetBreaker {
            breaker: dependency.to_string(),
        });
        probe
    }

    pub fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn severity(&self) -> AlertSeverity {
        self.severity.unwrap_or_else(|| self.kind.default_severity())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Health probe section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_probes")]
    pub probes: Vec<ProbeConfig>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probes: default_probes(),
        }
    }
}

/// Liveness and host probes plus the data store and third-party API
pub fn default_probes() -> Vec<ProbeConfig> {
    vec![
        ProbeConfig::new("basic", ProbeKind::Liveness),
        ProbeConfig::new("detailed", ProbeKind::Detailed).with_interval(60_000),
        ProbeConfig::for_dependency("database", ProbeKind::DataStore, "database"),
        ProbeConfig::for_dependency("external_api", ProbeKind::Dependency, "external_api")
            .with_interval(60_000),
    ]
}
