//! Types and configuration for circuit breakers

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls flow normally
    Closed,
    /// Calls are rejected without being attempted
    Open,
    /// The cooldown elapsed and calls are let through to probe recovery
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Circuit breaker configuration, fixed for the lifetime of a breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Cooldown after the last failure before a trial call is let through
    #[serde(default = "default_reset_timeout_ms")]
    pub reset_timeout_ms: u64,
    /// Optional ceiling on a single call; exceeding it counts as a failure
    #[serde(default)]
    pub call_timeout_ms: Option<u64>,
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_reset_timeout_ms() -> u64 {
    60_000
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_timeout_ms: default_reset_timeout_ms(),
            call_timeout_ms: None,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new(failure_threshold: u32, reset_timeout_ms: u64) -> Self {
        Self {
            failure_threshold,
            reset_timeout_ms,
            call_timeout_ms: None,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout_ms: u64) -> Self {
        self.call_timeout_ms = Some(call_timeout_ms);
        self
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}

/// Point-in-time snapshot of a breaker's state and counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    pub name: String,
    pub state: CircuitState,
    /// Consecutive failures since the last success
    pub failure_count: u32,
    pub failure_threshold: u32,
    pub reset_timeout_ms: u64,
    /// Every call that reached the breaker, rejected ones included
    pub total_requests: u64,
    pub total_failures: u64,
    pub total_successes: u64,
    pub total_rejections: u64,
    /// Mean latency of attempted calls
    pub average_latency_ms: f64,
    pub last_failure_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_state_change_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl CircuitBreakerMetrics {
    /// Calls that were actually attempted
    pub fn attempted(&self) -> u64 {
        self.total_failures + self.total_successes
    }

    /// Failure percentage over attempted calls
    pub fn error_rate(&self) -> f64 {
        let attempted = self.attempted();
        if attempted == 0 {
            return 0.0;
        }
        self.total_failures as f64 / attempted as f64 * 100.0
    }
}

/// Observable breaker transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BreakerEvent {
    Opened { name: String, failure_count: u32 },
    Reset { name: String },
    Failure {
        name: String,
        error: String,
        failure_count: u32,
    },
}

impl BreakerEvent {
    pub fn breaker_name(&self) -> &str {
        match self {
            BreakerEvent::Opened { name, .. }
            | BreakerEvent::Reset { name }
            | BreakerEvent::Failure { name, .. } => name,
        }
    }
}
