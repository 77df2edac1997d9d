//! Synthetic transaction configuration

use crate::monitoring::synthetic::ScriptStep;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Timer settings for one transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub interval_ms: u64,
    pub enabled: bool,
}

impl ScheduleConfig {
    pub fn new(interval_ms: u64, enabled: bool) -> Self {
        Self {
            interval_ms,
            enabled,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Synthetic transaction section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Public base URL of the API under test
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Credentials of the synthetic user
    #[serde(default = "default_email")]
    pub email: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_search_location")]
    pub search_location: String,
    /// Completed transactions kept in history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Ceiling on a single step
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,
    #[serde(default = "default_schedules")]
    pub schedules: BTreeMap<String, ScheduleConfig>,
    /// Scripts added to, or replacing, the built-in ones
    #[serde(default)]
    pub scripts: BTreeMap<String, Vec<ScriptStep>>,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_email() -> String {
    "synthetic-monitor@caregrid.local".to_string()
}

fn default_password() -> String {
    "synthetic-monitor-password".to_string()
}

fn default_search_location() -> String {
    "London".to_string()
}

fn default_history_capacity() -> usize {
    100
}

fn default_step_timeout_ms() -> u64 {
    10_000
}

/// health 60s, login/search 5min, contact 15min; booking and registration
/// are off by default since they create real records
pub fn default_schedules() -> BTreeMap<String, ScheduleConfig> {
    BTreeMap::from([
        ("health".to_string(), ScheduleConfig::new(60_000, true)),
        ("login".to_string(), ScheduleConfig::new(300_000, true)),
        ("search".to_string(), ScheduleConfig::new(300_000, true)),
        ("contact".to_string(), ScheduleConfig::new(900_000, true)),
        ("booking".to_string(), ScheduleConfig::new(1_800_000, false)),
        ("registration".to_string(), ScheduleConfig::new(3_600_000, false)),
    ])
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            email: default_email(),
            password: default_password(),
            search_location: default_search_location(),
            history_capacity: default_history_capacity(),
            step_timeout_ms: default_step_timeout_ms(),
            schedules: default_schedules(),
            scripts: BTreeMap::new(),
        }
    }
}

impl SyntheticConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }
}
