//! Alert rules, escalation policies and query types

use crate::monitoring::types::{Alert, AlertSeverity, AlertStatus, alert_types};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

/// Comparison operators for rule conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Equal,
    NotEqual,
}

impl Comparator {
    pub fn evaluate(self, observed: f64, threshold: f64) -> bool {
        match self {
            Comparator::GreaterThan => observed > threshold,
            Comparator::GreaterThanOrEqual => observed >= threshold,
            Comparator::LessThan => observed < threshold,
            Comparator::LessThanOrEqual => observed <= threshold,
            Comparator::Equal => (observed - threshold).abs() < f64::EPSILON,
            Comparator::NotEqual => (observed - threshold).abs() >= f64::EPSILON,
        }
    }
}

/// Metric condition attached to a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    /// Metadata key holding the observed value
    pub metric: String,
    pub comparator: Comparator,
    pub value: f64,
    /// How long the condition must hold; informational
    #[serde(default)]
    pub duration_ms: u64,
}

impl RuleCondition {
    /// Whether `alert` satisfies the condition
    ///
    /// An alert that does not carry the metric matches on type alone.
    pub fn matches(&self, alert: &Alert) -> bool {
        match alert.metric(&self.metric) {
            Some(observed) => self.comparator.evaluate(observed, self.value),
            None => true,
        }
    }
}

/// Binding from an alert type to an escalation policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Assigned on creation when empty
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: AlertSeverity,
    #[serde(default)]
    pub condition: Option<RuleCondition>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_policy_id")]
    pub escalation_policy_id: String,
    /// Channels used by steps that name none
    #[serde(default)]
    pub channels: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_policy_id() -> String {
    "default".to_string()
}

impl AlertRule {
    pub fn new(
        id: impl Into<String>,
        alert_type: impl Into<String>,
        severity: AlertSeverity,
        escalation_policy_id: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            alert_type: alert_type.into(),
            severity,
            condition: None,
            enabled: true,
            escalation_policy_id: escalation_policy_id.into(),
            channels: vec!["email".to_string()],
        }
    }

    pub fn with_condition(mut self, condition: RuleCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Whether the rule fires for `alert`
    pub fn matches(&self, alert: &Alert) -> bool {
        self.enabled
            && self.alert_type == alert.alert_type
            && self
                .condition
                .as_ref()
                .is_none_or(|condition| condition.matches(alert))
    }
}

/// One delayed notification step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationStep {
    /// Delay from alert creation
    pub delay_ms: u64,
    #[serde(default)]
    pub channels: Vec<String>,
    /// Plain recipients apply to every channel; `channel:recipient` to one
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl EscalationStep {
    pub fn new(delay_ms: u64, channels: &[&str], recipients: &[&str]) -> Self {
        Self {
            delay_ms,
            channels: channels.iter().map(|c| c.to_string()).collect(),
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Every (channel, recipient) pair this step delivers to
    pub fn deliveries(&self, fallback_channels: &[String]) -> Vec<(String, String)> {
        let channels: &[String] = if self.channels.is_empty() {
            fallback_channels
        } else {
            &self.channels
        };

        let mut pairs = Vec::new();
        for channel in channels {
            for recipient in &self.recipients {
                match recipient.split_once(':') {
                    Some((scope, target)) if is_channel_scope(scope) => {
                        if scope == channel {
                            pairs.push((channel.clone(), target.to_string()));
                        }
                    }
                    _ => pairs.push((channel.clone(), recipient.clone())),
                }
            }
        }
        pairs
    }
}

fn is_channel_scope(scope: &str) -> bool {
    matches!(scope, "email" | "sms" | "webhook" | "slack")
}

/// Ordered, time-delayed notification steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub steps: Vec<EscalationStep>,
}

const MINUTE_MS: u64 = 60_000;

/// Built-in escalation policies
pub fn default_policies() -> Vec<EscalationPolicy> {
    vec![
        EscalationPolicy {
            id: "default".to_string(),
            name: "Default escalation".to_string(),
            steps: vec![
                EscalationStep::new(0, &["email"], &["ops@caregrid.local"]),
                EscalationStep::new(
                    15 * MINUTE_MS,
                    &["email", "sms"],
                    &["email:ops-lead@caregrid.local", "sms:+10000000000"],
                ),
            ],
        },
        EscalationPolicy {
            id: "critical".to_string(),
            name: "Critical escalation".to_string(),
            steps: vec![
                EscalationStep::new(
                    0,
                    &["email", "sms", "webhook"],
                    &[
                        "email:ops@caregrid.local",
                        "sms:+10000000000",
                        "webhook:oncall",
                    ],
                ),
                EscalationStep::new(5 * MINUTE_MS, &["sms"], &["+10000000001"]),
                EscalationStep::new(15 * MINUTE_MS, &["webhook"], &["incident"]),
            ],
        },
    ]
}

/// Built-in rules, one per alert type emitted by the subsystem
pub fn default_rules() -> Vec<AlertRule> {
    use alert_types::*;

    vec![
        AlertRule::new("health-check-failed", HEALTH_CHECK_FAILED, AlertSeverity::High, "critical"),
        AlertRule::new("health-check-recovered", HEALTH_CHECK_RECOVERED, AlertSeverity::Low, "default"),
        AlertRule::new("recovery-attempted", RECOVERY_ATTEMPTED, AlertSeverity::Medium, "default"),
        AlertRule::new("recovery-failed", RECOVERY_FAILED, AlertSeverity::High, "critical"),
        AlertRule::new("synthetic-failure-rate", SYNTHETIC_FAILURE_RATE, AlertSeverity::High, "default")
            .with_condition(RuleCondition {
                metric: "success_rate".to_string(),
                comparator: Comparator::LessThan,
                value: 80.0,
                duration_ms: 0,
            }),
        AlertRule::new(
            "synthetic-consecutive-failures",
            SYNTHETIC_CONSECUTIVE_FAILURES,
            AlertSeverity::Critical,
            "critical",
        ),
        AlertRule::new("slow-response", SLOW_RESPONSE, AlertSeverity::Medium, "default"),
        AlertRule::new("high-error-rate", HIGH_ERROR_RATE, AlertSeverity::High, "default"),
        AlertRule::new("high-memory-usage", HIGH_MEMORY_USAGE, AlertSeverity::High, "default"),
        AlertRule::new("circuit-breaker-open", CIRCUIT_BREAKER_OPEN, AlertSeverity::High, "critical"),
    ]
}

/// Filters for history queries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFilter {
    pub severity: Option<AlertSeverity>,
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
    pub status: Option<AlertStatus>,
    pub limit: Option<usize>,
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        self.severity.is_none_or(|s| alert.severity == s)
            && self.alert_type.as_ref().is_none_or(|t| &alert.alert_type == t)
            && self.status.is_none_or(|s| alert.status == s)
    }
}

/// Alert counts by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub critical: u64,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: AlertSeverity) {
        match severity {
            AlertSeverity::Low => self.low += 1,
            AlertSeverity::Medium => self.medium += 1,
            AlertSeverity::High => self.high += 1,
            AlertSeverity::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.low + self.medium + self.high + self.critical
    }
}

/// Alert statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertStatistics {
    /// Alerts retained in history
    pub total: u64,
    pub active: u64,
    pub acknowledged: u64,
    pub resolved: u64,
    pub last_24h: SeverityCounts,
    pub last_7d: SeverityCounts,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
}

/// Serialisable copy of the engine state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSnapshot {
    pub taken_at: DateTime<Utc>,
    /// Oldest first
    pub alerts: Vec<Alert>,
    pub rules: Vec<AlertRule>,
    pub policies: Vec<EscalationPolicy>,
}

/// Alert tables guarded by one lock
#[derive(Debug, Default)]
pub(super) struct AlertStorage {
    pub alerts: HashMap<String, Alert>,
    /// Alert ids, oldest first
    pub history: VecDeque<String>,
    /// Ids of alerts that are not yet resolved
    pub active: HashSet<String>,
}

impl AlertStorage {
    /// Insert a new alert, dropping the oldest history entries past `capacity`
    pub fn insert(&mut self, alert: Alert, capacity: usize) {
        if alert.status != AlertStatus::Resolved {
            self.active.insert(alert.id.clone());
        }
        self.history.push_back(alert.id.clone());
        self.alerts.insert(alert.id.clone(), alert);

        while self.history.len() > capacity.max(1) {
            if let Some(evicted) = self.history.pop_front() {
                if !self.active.contains(&evicted) {
                    self.alerts.remove(&evicted);
                }
            }
        }
    }

    /// History, newest first
    pub fn newest_first(&self) -> impl Iterator<Item = &Alert> {
        self.history.iter().rev().filter_map(|id| self.alerts.get(id))
    }
}
