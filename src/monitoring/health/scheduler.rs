//! Health probe scheduler

use super::probes::{HealthCheck, build_check};
use super::recovery::{RecoveryAction, build_recovery};
use super::types::{CheckOutput, ProbeReport, ProbeRun, ProbeState, ProbeStatus, ProbeTransition};
use crate::alert_metadata;
use crate::config::ProbeConfig;
use crate::monitoring::schedule::{Job, PeriodicTasks, TaskInfo};
use crate::monitoring::thresholds::ThresholdMonitor;
use crate::monitoring::types::{AlertSeverity, alert_types};
use crate::resilience::ResilienceRegistry;
use crate::utils::error::{ResilienceError, Result};
use chrono::Utc;
use futures::FutureExt;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

struct ProbeSlot {
    config: ProbeConfig,
    check: Arc<dyn HealthCheck>,
    recovery: Option<Arc<dyn RecoveryAction>>,
    state: ProbeState,
}

/// Probe table shared with the timer tasks
#[derive(Clone)]
struct ProbeTable {
    probes: Arc<RwLock<BTreeMap<String, ProbeSlot>>>,
    monitor: ThresholdMonitor,
}

impl ProbeTable {
    fn slot<T>(&self, name: &str, f: impl FnOnce(&ProbeSlot) -> T) -> Result<T> {
        self.probes
            .read()
            .get(name)
            .map(f)
            .ok_or_else(|| ResilienceError::not_found(format!("probe {}", name)))
    }

    async fn run_probe(&self, name: &str) -> Result<ProbeRun> {
        let (config, check, recovery) = self.slot(name, |slot| {
            (slot.config.clone(), slot.check.clone(), slot.recovery.clone())
        })?;

        let started = Instant::now();
        let outcome = tokio::time::timeout(config.timeout(), check.check()).await;
        let response_time_ms = started.elapsed().as_millis() as u64;

        let result: std::result::Result<CheckOutput, String> = match outcome {
            Ok(Ok(_)) if response_time_ms > config.response_time_ceiling_ms => Err(format!(
                "response time {}ms exceeded ceiling {}ms",
                response_time_ms, config.response_time_ceiling_ms
            )),
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("check timed out after {}ms", config.timeout_ms)),
        };

        let checked_at = Utc::now();
        let (state, transition) = {
            let mut probes = self.probes.write();
            let slot = probes
                .get_mut(name)
                .ok_or_else(|| ResilienceError::not_found(format!("probe {}", name)))?;
            let transition = slot.state.apply(result.is_ok(), config.failure_threshold);
            slot.state.last_check_at = Some(checked_at);
            slot.state.last_response_time_ms = Some(response_time_ms);
            if let Err(e) = &result {
                slot.state.last_error = Some(e.clone());
            }
            (slot.state.clone(), transition)
        };

        let (details, memory_usage) = match &result {
            Ok(output) => (output.details.clone(), output.memory_usage_percent),
            Err(_) => (BTreeMap::new(), None),
        };
        let run = ProbeRun {
            name: name.to_string(),
            success: result.is_ok(),
            response_time_ms,
            error: result.err(),
            status: state.status,
            consecutive_failures: state.consecutive_failures,
            transition,
            checked_at,
            details,
        };

        match &run.error {
            None => debug!("Probe {} passed in {}ms", name, response_time_ms),
            Some(e) => warn!(
                "Probe {} failed ({}/{}): {}",
                name, state.consecutive_failures, config.failure_threshold, e
            ),
        }

        if let Some(usage) = memory_usage {
            self.monitor.evaluate_memory(usage);
        }
        self.monitor.evaluate_probe(&run);
        self.handle_transition(&config, recovery, &run).await;

        Ok(run)
    }

    async fn handle_transition(
        &self,
        config: &ProbeConfig,
        recovery: Option<Arc<dyn RecoveryAction>>,
        run: &ProbeRun,
    ) {
        let name = config.name.as_str();
        match run.transition {
            Some(ProbeTransition::BecameUnhealthy) => {
                let reason = run.error.clone().unwrap_or_default();
                error!("Probe {} is unhealthy: {}", name, reason);
                self.monitor.notify(
                    alert_types::HEALTH_CHECK_FAILED,
                    name,
                    config.severity(),
                    format!(
                        "Health check {} failed {} consecutive times: {}",
                        name, run.consecutive_failures, reason
                    ),
                    alert_metadata!(
                        "probe" => name,
                        "kind" => config.kind,
                        "consecutive_failures" => run.consecutive_failures,
                        "error" => reason,
                    ),
                );

                if let Some(action) = recovery {
                    self.attempt_recovery(config, action.as_ref()).await;
                }
            }
            Some(ProbeTransition::Recovered) => {
                info!("Probe {} recovered", name);
                self.monitor.notify(
                    alert_types::HEALTH_CHECK_RECOVERED,
                    name,
                    AlertSeverity::Low,
                    format!("Health check {} recovered", name),
                    alert_metadata!(
                        "probe" => name,
                        "response_time_ms" => run.response_time_ms,
                    ),
                );
            }
            Some(ProbeTransition::BecameHealthy) => info!("Probe {} is healthy", name),
            None => {}
        }
    }

    /// Run a recovery action once; its outcome is alerted, never retried
    async fn attempt_recovery(&self, config: &ProbeConfig, action: &dyn RecoveryAction) {
        let name = config.name.as_str();
        info!("Attempting {} recovery for probe {}", action.name(), name);

        let outcome = match tokio::time::timeout(config.timeout(), action.recover()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ResilienceError::timeout(format!(
                "{} recovery timed out after {}ms",
                action.name(),
                config.timeout_ms
            ))),
        };

        match outcome {
            Ok(description) => {
                info!("Recovery for probe {}: {}", name, description);
                self.monitor.notify(
                    alert_types::RECOVERY_ATTEMPTED,
                    name,
                    AlertSeverity::Medium,
                    format!("Recovery attempted for {}: {}", name, description),
                    alert_metadata!("probe" => name, "action" => action.name()),
                );
            }
            Err(e) => {
                error!("Recovery for probe {} failed: {}", name, e);
                self.monitor.notify(
                    alert_types::RECOVERY_FAILED,
                    name,
                    AlertSeverity::High,
                    format!("Recovery failed for {}: {}", name, e),
                    alert_metadata!(
                        "probe" => name,
                        "action" => action.name(),
                        "error" => e.to_string(),
                    ),
                );
            }
        }
    }
}

/// Runs every probe on its own timer and tracks its health state
pub struct ProbeScheduler {
    table: ProbeTable,
    tasks: PeriodicTasks,
}

impl std::fmt::Debug for ProbeScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeScheduler")
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl ProbeScheduler {
    /// Build the configured probes with their default checks and recoveries
    pub fn new(
        probes: &[ProbeConfig],
        registry: Arc<ResilienceRegistry>,
        monitor: ThresholdMonitor,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let scheduler = Self {
            table: ProbeTable {
                probes: Arc::new(RwLock::new(BTreeMap::new())),
                monitor: monitor.clone(),
            },
            tasks: PeriodicTasks::new("probe"),
        };

        for config in probes {
            let check = build_check(config, &registry, &monitor, &client);
            let recovery = config
                .recovery
                .as_ref()
                .map(|recovery| build_recovery(recovery, &registry));
            scheduler.insert(config.clone(), check, recovery);
        }

        Ok(scheduler)
    }

    fn insert(
        &self,
        config: ProbeConfig,
        check: Arc<dyn HealthCheck>,
        recovery: Option<Arc<dyn RecoveryAction>>,
    ) {
        let name = config.name.clone();
        let interval = config.interval();
        let enabled = config.enabled;

        self.table.probes.write().insert(
            name.clone(),
            ProbeSlot {
                config,
                check,
                recovery,
                state: ProbeState::default(),
            },
        );
        self.tasks.insert(name.clone(), interval, enabled, self.job(&name));
    }

    fn job(&self, name: &str) -> Job {
        let table = self.table.clone();
        let name = name.to_string();
        Arc::new(move || {
            let table = table.clone();
            let name = name.clone();
            async move {
                if let Err(e) = table.run_probe(&name).await {
                    error!("Scheduled probe {} could not run: {}", name, e);
                }
            }
            .boxed()
        })
    }

    /// Add or replace a probe with a custom check
    pub fn register_probe(&self, config: ProbeConfig, check: Arc<dyn HealthCheck>) {
        info!("Registering probe {}", config.name);
        self.insert(config, check, None);
    }

    /// Replace the check of an existing probe
    pub fn register_check(&self, name: &str, check: Arc<dyn HealthCheck>) -> Result<()> {
        let mut probes = self.table.probes.write();
        let slot = probes
            .get_mut(name)
            .ok_or_else(|| ResilienceError::not_found(format!("probe {}", name)))?;
        slot.check = check;
        Ok(())
    }

    /// Set the recovery action of an existing probe
    pub fn register_recovery(&self, name: &str, action: Arc<dyn RecoveryAction>) -> Result<()> {
        let mut probes = self.table.probes.write();
        let slot = probes
            .get_mut(name)
            .ok_or_else(|| ResilienceError::not_found(format!("probe {}", name)))?;
        debug!("Probe {} recovery set to {}", name, action.name());
        slot.recovery = Some(action);
        Ok(())
    }

    /// Run one probe now, outside its timer
    pub async fn run_probe(&self, name: &str) -> Result<ProbeRun> {
        self.table.run_probe(name).await
    }

    /// Run every probe concurrently
    pub async fn run_all(&self) -> Vec<ProbeRun> {
        let names: Vec<String> = self.table.probes.read().keys().cloned().collect();
        futures::future::join_all(names.iter().map(|name| self.table.run_probe(name)))
            .await
            .into_iter()
            .filter_map(|run| run.ok())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains(name)
    }

    pub fn probe_status(&self, name: &str) -> Result<ProbeReport> {
        let task = self.tasks.info(name)?;
        self.table.slot(name, |slot| report(slot, &task))
    }

    /// Status of every probe, keyed by name
    pub fn probe_statuses(&self) -> BTreeMap<String, ProbeReport> {
        let tasks = self.tasks.list();
        let probes = self.table.probes.read();
        tasks
            .iter()
            .filter_map(|task| {
                probes
                    .get(&task.name)
                    .map(|slot| (task.name.clone(), report(slot, task)))
            })
            .collect()
    }

    /// Whether every probe that has been checked is healthy
    pub fn all_healthy(&self) -> bool {
        self.table
            .probes
            .read()
            .values()
            .all(|slot| slot.state.status != ProbeStatus::Unhealthy)
    }

    pub fn start(&self) {
        self.tasks.start();
    }

    pub fn stop(&self) {
        self.tasks.stop();
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<TaskInfo> {
        let info = self.tasks.set_enabled(name, enabled)?;
        if let Some(slot) = self.table.probes.write().get_mut(name) {
            slot.config.enabled = enabled;
        }
        Ok(info)
    }

    pub fn set_interval(&self, name: &str, interval_ms: u64) -> Result<TaskInfo> {
        let info = self.tasks.set_interval(name, interval_ms)?;
        if let Some(slot) = self.table.probes.write().get_mut(name) {
            slot.config.interval_ms = interval_ms;
        }
        Ok(info)
    }

    pub fn schedule(&self) -> Vec<TaskInfo> {
        self.tasks.list()
    }
}

fn report(slot: &ProbeSlot, task: &TaskInfo) -> ProbeReport {
    ProbeReport {
        name: slot.config.name.clone(),
        kind: slot.config.kind,
        status: slot.state.status,
        consecutive_failures: slot.state.consecutive_failures,
        failure_threshold: slot.config.failure_threshold,
        recovering: slot.state.recovering,
        last_check_at: slot.state.last_check_at,
        last_response_time_ms: slot.state.last_response_time_ms,
        last_error: slot.state.last_error.clone(),
        total_checks: slot.state.total_checks,
        total_failures: slot.state.total_failures,
        interval_ms: task.interval_ms,
        enabled: task.enabled,
    }
}
