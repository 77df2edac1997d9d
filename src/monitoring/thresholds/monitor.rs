//! Threshold evaluation feeding the alert engine

use super::suppression::SuppressionTracker;
use crate::alert_metadata;
use crate::config::{SuppressionConfig, ThresholdConfig, Thresholds, Validate};
use crate::monitoring::alerts::AlertManager;
use crate::monitoring::health::ProbeRun;
use crate::monitoring::synthetic::{SyntheticSummary, SyntheticTransaction, TransactionStatus};
use crate::monitoring::types::{Alert, AlertMetadata, AlertSeverity, alert_types};
use crate::resilience::{BreakerEvent, CircuitBreakerMetrics};
use crate::utils::error::{ResilienceError, Result};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Identifier used for subsystem-wide breaches
pub const OVERALL: &str = "overall";

/// Cumulative counters as of the last rated window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RateWindow {
    attempted: u64,
    failures: u64,
    latency_total_ms: f64,
}

impl RateWindow {
    fn failure_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        self.failures as f64 / self.attempted as f64 * 100.0
    }

    fn average_latency_ms(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        self.latency_total_ms / self.attempted as f64
    }
}

/// Turns probe, transaction and breaker outputs into suppressed alerts
///
/// Evaluation never fails; a breach that cannot be alerted is logged.
#[derive(Debug, Clone)]
pub struct ThresholdMonitor {
    alerts: AlertManager,
    thresholds: Arc<RwLock<Thresholds>>,
    suppression: Arc<SuppressionTracker>,
    consecutive_failures: Arc<DashMap<String, u32>>,
    baselines: Arc<DashMap<String, RateWindow>>,
}

impl ThresholdMonitor {
    pub fn new(alerts: AlertManager, config: &ThresholdConfig) -> Self {
        Self {
            alerts,
            thresholds: Arc::new(RwLock::new(config.limits.clone())),
            suppression: Arc::new(SuppressionTracker::new(config.suppression.clone())),
            consecutive_failures: Arc::new(DashMap::new()),
            baselines: Arc::new(DashMap::new()),
        }
    }

    pub fn alerts(&self) -> &AlertManager {
        &self.alerts
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds.read().clone()
    }

    pub fn update_thresholds(&self, thresholds: Thresholds) -> Result<Thresholds> {
        thresholds.validate().map_err(ResilienceError::validation)?;
        *self.thresholds.write() = thresholds.clone();
        info!("Thresholds updated: {:?}", thresholds);
        Ok(thresholds)
    }

    pub fn suppression(&self) -> SuppressionConfig {
        self.suppression.config()
    }

    pub fn update_suppression(&self, config: SuppressionConfig) -> SuppressionConfig {
        self.suppression.set_config(config.clone());
        info!("Suppression windows updated");
        config
    }

    /// Current consecutive failure streak of a transaction type
    pub fn consecutive_failures(&self, transaction_type: &str) -> u32 {
        self.consecutive_failures
            .get(transaction_type)
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// Counters accumulated since the last rated window of `key`
    ///
    /// Returns `None` until at least `minimum` new calls arrived; the baseline
    /// only moves when a window is returned. Counters that went backwards
    /// (cleared history) restart the baseline from zero.
    fn next_window(&self, key: &str, current: RateWindow, minimum: u64) -> Option<RateWindow> {
        let mut baseline = self.baselines.entry(key.to_string()).or_default();
        if current.attempted < baseline.attempted || current.failures < baseline.failures {
            *baseline = RateWindow::default();
        }

        let attempted = current.attempted - baseline.attempted;
        if attempted == 0 || attempted < minimum {
            return None;
        }

        let window = RateWindow {
            attempted,
            failures: current.failures - baseline.failures,
            latency_total_ms: (current.latency_total_ms - baseline.latency_total_ms).max(0.0),
        };
        *baseline = current;
        Some(window)
    }

    /// Create an alert unless `(alert_type, identifier)` is inside its window
    pub fn raise(
        &self,
        alert_type: &str,
        identifier: &str,
        severity: AlertSeverity,
        message: impl Into<String>,
        metadata: AlertMetadata,
    ) -> Option<Alert> {
        if !self.suppression.try_acquire(alert_type, identifier) {
            debug!("Suppressed {} alert for {}", alert_type, identifier);
            return None;
        }

        Some(self.notify(alert_type, identifier, severity, message, metadata))
    }

    /// Create an alert without consulting the suppression windows
    ///
    /// For one-shot transitions such as a probe turning unhealthy, which can
    /// only repeat after the opposite transition.
    pub fn notify(
        &self,
        alert_type: &str,
        identifier: &str,
        severity: AlertSeverity,
        message: impl Into<String>,
        mut metadata: AlertMetadata,
    ) -> Alert {
        metadata
            .entry("identifier".to_string())
            .or_insert_with(|| serde_json::json!(identifier));
        self.alerts
            .create_alert(alert_type, severity, message, metadata)
    }

    /// Track failure streaks and slow runs of one completed transaction
    pub fn evaluate_transaction(&self, transaction: &SyntheticTransaction) -> Vec<Alert> {
        let limits = self.thresholds();
        let kind = transaction.transaction_type.as_str();
        let mut raised = Vec::new();

        if transaction.status == TransactionStatus::Success {
            self.consecutive_failures.insert(kind.to_string(), 0);
        } else {
            let streak = {
                let mut count = self.consecutive_failures.entry(kind.to_string()).or_insert(0);
                *count += 1;
                *count
            };

            if streak >= limits.synthetic_consecutive_failures {
                warn!(
                    "Synthetic transaction {} failed {} times in a row",
                    kind, streak
                );
                raised.extend(self.raise(
                    alert_types::SYNTHETIC_CONSECUTIVE_FAILURES,
                    kind,
                    AlertSeverity::Critical,
                    format!("Synthetic {} transaction failed {} consecutive times", kind, streak),
                    alert_metadata!(
                        "transaction_type" => kind,
                        "consecutive_failures" => streak,
                        "last_error" => transaction.error,
                    ),
                ));
            }
        }

        if transaction.duration_ms > limits.response_time_ms {
            raised.extend(self.raise(
                alert_types::SLOW_RESPONSE,
                &format!("synthetic:{}", kind),
                AlertSeverity::Medium,
                format!(
                    "Synthetic {} transaction took {}ms (limit {}ms)",
                    kind, transaction.duration_ms, limits.response_time_ms
                ),
                alert_metadata!(
                    "transaction_type" => kind,
                    "response_time_ms" => transaction.duration_ms,
                ),
            ));
        }

        raised
    }

    /// Alert when the synthetic success rate of the runs since the last rated
    /// window drops below the minimum
    pub fn evaluate_summary(&self, summary: &SyntheticSummary) -> Option<Alert> {
        if summary.total == 0 {
            return None;
        }

        let limits = self.thresholds();
        let current = RateWindow {
            attempted: summary.total,
            failures: summary.failed,
            latency_total_ms: summary.average_duration_ms * summary.total as f64,
        };
        let window = self.next_window("synthetic:overall", current, limits.min_runs_for_success_rate)?;

        let success_rate = 100.0 - window.failure_rate();
        if success_rate >= limits.synthetic_success_rate_min {
            return None;
        }

        self.raise(
            alert_types::SYNTHETIC_FAILURE_RATE,
            OVERALL,
            AlertSeverity::High,
            format!(
                "Synthetic success rate {:.1}% is below {:.1}%",
                success_rate, limits.synthetic_success_rate_min
            ),
            alert_metadata!(
                "success_rate" => success_rate,
                "window_runs" => window.attempted,
                "window_failed" => window.failures,
                "total" => summary.total,
            ),
        )
    }

    /// Alert on slow probe checks
    pub fn evaluate_probe(&self, run: &ProbeRun) -> Option<Alert> {
        let limits = self.thresholds();
        if run.response_time_ms <= limits.response_time_ms {
            return None;
        }

        self.raise(
            alert_types::SLOW_RESPONSE,
            &run.name,
            AlertSeverity::Medium,
            format!(
                "Probe {} took {}ms (limit {}ms)",
                run.name, run.response_time_ms, limits.response_time_ms
            ),
            alert_metadata!(
                "probe" => run.name,
                "response_time_ms" => run.response_time_ms,
            ),
        )
    }

    /// Alert when host memory usage exceeds the limit
    pub fn evaluate_memory(&self, usage_percent: f64) -> Option<Alert> {
        let limits = self.thresholds();
        if usage_percent <= limits.memory_usage_percent {
            return None;
        }

        self.raise(
            alert_types::HIGH_MEMORY_USAGE,
            "system",
            AlertSeverity::High,
            format!(
                "Memory usage {:.1}% exceeds {:.1}%",
                usage_percent, limits.memory_usage_percent
            ),
            alert_metadata!("memory_usage_percent" => usage_percent),
        )
    }

    /// Alert on breakers whose error rate or latency since their last rated
    /// window exceeds the limits
    pub fn evaluate_breakers(&self, metrics: &[CircuitBreakerMetrics]) -> Vec<Alert> {
        let limits = self.thresholds();
        let mut raised = Vec::new();

        for breaker in metrics {
            let attempted = breaker.attempted();
            let current = RateWindow {
                attempted,
                failures: breaker.total_failures,
                latency_total_ms: breaker.average_latency_ms * attempted as f64,
            };
            let Some(window) = self.next_window(
                &format!("breaker:{}", breaker.name),
                current,
                limits.min_requests_for_error_rate,
            ) else {
                continue;
            };

            let error_rate = window.failure_rate();
            if error_rate > limits.error_rate_percent {
                raised.extend(self.raise(
                    alert_types::HIGH_ERROR_RATE,
                    &breaker.name,
                    AlertSeverity::High,
                    format!(
                        "{} error rate {:.1}% exceeds {:.1}%",
                        breaker.name, error_rate, limits.error_rate_percent
                    ),
                    alert_metadata!(
                        "dependency" => breaker.name,
                        "error_rate" => error_rate,
                        "window_requests" => window.attempted,
                        "window_failures" => window.failures,
                        "state" => breaker.state,
                    ),
                ));
            }

            let average_latency_ms = window.average_latency_ms();
            if average_latency_ms > limits.response_time_ms as f64 {
                raised.extend(self.raise(
                    alert_types::SLOW_RESPONSE,
                    &format!("breaker:{}", breaker.name),
                    AlertSeverity::Medium,
                    format!(
                        "{} average latency {:.0}ms exceeds {}ms",
                        breaker.name, average_latency_ms, limits.response_time_ms
                    ),
                    alert_metadata!(
                        "dependency" => breaker.name,
                        "response_time_ms" => average_latency_ms,
                    ),
                ));
            }
        }

        raised
    }

    /// React to one breaker transition
    pub fn handle_breaker_event(&self, event: &BreakerEvent) -> Option<Alert> {
        match event {
            BreakerEvent::Opened {
                name,
                failure_count,
            } => self.raise(
                alert_types::CIRCUIT_BREAKER_OPEN,
                name,
                AlertSeverity::High,
                format!(
                    "Circuit breaker {} opened after {} consecutive failures",
                    name, failure_count
                ),
                alert_metadata!("dependency" => name, "failure_count" => failure_count),
            ),
            BreakerEvent::Reset { name } => {
                debug!("Circuit breaker {} closed", name);
                None
            }
            BreakerEvent::Failure { .. } => None,
        }
    }

    /// Consume breaker events until the channel closes
    pub fn spawn_breaker_listener(
        &self,
        mut events: broadcast::Receiver<BreakerEvent>,
    ) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        monitor.handle_breaker_event(&event);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Breaker event listener skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Breaker event channel closed");
                        break;
                    }
                }
            }
        })
    }
}
