//! Threshold and suppression configuration

use crate::monitoring::alert_types;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Numeric limits evaluated by the threshold monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Alert when the synthetic success rate falls below this percentage
    pub synthetic_success_rate_min: f64,
    /// Alert after this many consecutive failures of one transaction type
    pub synthetic_consecutive_failures: u32,
    pub response_time_ms: u64,
    pub error_rate_percent: f64,
    pub memory_usage_percent: f64,
    /// A breaker is rated once this many calls arrived since its last rating
    pub min_requests_for_error_rate: u64,
    /// The synthetic success rate is rated once this many runs completed
    /// since its last rating
    pub min_runs_for_success_rate: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            synthetic_success_rate_min: 80.0,
            synthetic_consecutive_failures: 5,
            response_time_ms: 5_000,
            error_rate_percent: 10.0,
            memory_usage_percent: 90.0,
            min_requests_for_error_rate: 10,
            min_runs_for_success_rate: 10,
        }
    }
}

/// Suppression windows by alert type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionConfig {
    #[serde(default = "default_windows")]
    pub windows_ms: BTreeMap<String, u64>,
    #[serde(default = "default_window_ms")]
    pub default_window_ms: u64,
}

const MINUTE_MS: u64 = 60_000;

fn default_window_ms() -> u64 {
    5 * MINUTE_MS
}

fn default_windows() -> BTreeMap<String, u64> {
    [
        (alert_types::SLOW_RESPONSE, 10),
        (alert_types::HIGH_ERROR_RATE, 10),
        (alert_types::HIGH_MEMORY_USAGE, 15),
        (alert_types::SYNTHETIC_FAILURE_RATE, 15),
        (alert_types::SYNTHETIC_CONSECUTIVE_FAILURES, 10),
        (alert_types::CIRCUIT_BREAKER_OPEN, 5),
    ]
    .into_iter()
    .map(|(alert_type, minutes)| (alert_type.to_string(), minutes * MINUTE_MS))
    .collect()
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            windows_ms: default_windows(),
            default_window_ms: default_window_ms(),
        }
    }
}

impl SuppressionConfig {
    pub fn window_for(&self, alert_type: &str) -> Duration {
        let ms = self
            .windows_ms
            .get(alert_type)
            .copied()
            .unwrap_or(self.default_window_ms);
        Duration::from_millis(ms)
    }
}

/// Threshold monitor section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default)]
    pub limits: Thresholds,
    #[serde(default)]
    pub suppression: SuppressionConfig,
    /// Period of the breaker error-rate sweep
    #[serde(default = "default_evaluation_interval_ms")]
    pub evaluation_interval_ms: u64,
}

fn default_evaluation_interval_ms() -> u64 {
    MINUTE_MS
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            limits: Thresholds::default(),
            suppression: SuppressionConfig::default(),
            evaluation_interval_ms: default_evaluation_interval_ms(),
        }
    }
}
