//! Core MonitoringSystem implementation

use crate::config::Config;
use crate::monitoring::alerts::{AlertManager, AlertStatistics};
use crate::monitoring::health::{ProbeReport, ProbeRun, ProbeScheduler};
use crate::monitoring::schedule::TaskInfo;
use crate::monitoring::synthetic::{
    SyntheticRunner, SyntheticScheduler, SyntheticSummary, SyntheticTransaction,
};
use crate::monitoring::thresholds::ThresholdMonitor;
use crate::resilience::{CircuitBreakerMetrics, ResilienceRegistry};
use crate::utils::error::{ResilienceError, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::info;

/// Main monitoring system
///
/// Owns every component; clones share them.
#[derive(Debug, Clone)]
pub struct MonitoringSystem {
    pub(super) config: Arc<Config>,
    pub(super) registry: Arc<ResilienceRegistry>,
    pub(super) alerts: AlertManager,
    pub(super) monitor: ThresholdMonitor,
    pub(super) probes: Arc<ProbeScheduler>,
    pub(super) synthetic: Arc<SyntheticScheduler>,
    /// Breaker listener and threshold sweep
    pub(super) background: Arc<Mutex<Vec<JoinHandle<()>>>>,
    pub(super) start_time: Instant,
}

/// Combined operational status
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    /// No probe unhealthy and no breaker open
    pub healthy: bool,
    pub uptime_seconds: u64,
    pub breakers: Vec<CircuitBreakerMetrics>,
    pub probes: BTreeMap<String, ProbeReport>,
    pub synthetic: SyntheticSummary,
    pub alerts: AlertStatistics,
}

/// Every timer, grouped by kind
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerOverview {
    pub probes: Vec<TaskInfo>,
    pub synthetic: Vec<TaskInfo>,
    pub threshold_evaluation_interval_ms: u64,
}

/// Result of a manually triggered task
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum TaskRun {
    Synthetic(SyntheticTransaction),
    Probe(ProbeRun),
}

impl MonitoringSystem {
    /// Build every component from configuration
    pub fn new(config: &Config) -> Result<Self> {
        info!("Initializing monitoring system");
        let config = Arc::new(config.clone());

        let registry = Arc::new(ResilienceRegistry::from_config(&config.resilience.breakers));
        let alerts = AlertManager::new(&config.alerting)?;
        let monitor = ThresholdMonitor::new(alerts.clone(), &config.thresholds);

        let probes = Arc::new(ProbeScheduler::new(
            &config.health.probes,
            registry.clone(),
            monitor.clone(),
        )?);

        let runner = Arc::new(SyntheticRunner::new(&config.synthetic)?);
        let synthetic = Arc::new(SyntheticScheduler::new(
            runner,
            monitor.clone(),
            &config.synthetic.schedules,
        ));

        info!(
            "Monitoring system initialized: {} breakers, {} probes, {} synthetic schedules",
            registry.breaker_names().len(),
            probes.schedule().len(),
            synthetic.schedule().len()
        );

        Ok(Self {
            config,
            registry,
            alerts,
            monitor,
            probes,
            synthetic,
            background: Arc::new(Mutex::new(Vec::new())),
            start_time: Instant::now(),
        })
    }

    /// Start every timer and the breaker event listener
    pub fn start(&self) {
        info!("Starting monitoring system");
        self.start_background_tasks();
        self.probes.start();
        self.synthetic.start();
        info!("Monitoring system started successfully");
    }

    /// Stop every timer and pending escalation step
    pub fn stop(&self) {
        info!("Stopping monitoring system");
        self.stop_background_tasks();
        self.probes.stop();
        self.synthetic.stop();
        self.alerts.shutdown();
        info!("Monitoring system stopped");
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ResilienceRegistry> {
        &self.registry
    }

    pub fn alerts(&self) -> &AlertManager {
        &self.alerts
    }

    pub fn monitor(&self) -> &ThresholdMonitor {
        &self.monitor
    }

    pub fn probes(&self) -> &ProbeScheduler {
        &self.probes
    }

    pub fn synthetic(&self) -> &SyntheticScheduler {
        &self.synthetic
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn status(&self) -> SystemStatus {
        let breakers = self.registry.get_all_metrics();
        let probes = self.probes.probe_statuses();
        let healthy = self.probes.all_healthy()
            && breakers
                .iter()
                .all(|breaker| breaker.state == crate::resilience::CircuitState::Closed);

        SystemStatus {
            healthy,
            uptime_seconds: self.uptime().as_secs(),
            breakers,
            probes,
            synthetic: self.synthetic.runner().summary(),
            alerts: self.alerts.get_alert_statistics(),
        }
    }

    pub fn scheduler_overview(&self) -> SchedulerOverview {
        SchedulerOverview {
            probes: self.probes.schedule(),
            synthetic: self.synthetic.schedule(),
            threshold_evaluation_interval_ms: self.config.thresholds.evaluation_interval_ms,
        }
    }

    fn unknown_task(task: &str) -> ResilienceError {
        ResilienceError::not_found(format!("scheduled task {}", task))
    }

    /// Change the period of a synthetic type or probe
    pub fn set_task_interval(&self, task: &str, interval_ms: u64) -> Result<TaskInfo> {
        if self.synthetic.contains(task) {
            self.synthetic.set_interval(task, interval_ms)
        } else if self.probes.contains(task) {
            self.probes.set_interval(task, interval_ms)
        } else {
            Err(Self::unknown_task(task))
        }
    }

    pub fn set_task_enabled(&self, task: &str, enabled: bool) -> Result<TaskInfo> {
        if self.synthetic.contains(task) {
            self.synthetic.set_enabled(task, enabled)
        } else if self.probes.contains(task) {
            self.probes.set_enabled(task, enabled)
        } else {
            Err(Self::unknown_task(task))
        }
    }

    pub fn enable_task(&self, task: &str) -> Result<TaskInfo> {
        self.set_task_enabled(task, true)
    }

    pub fn disable_task(&self, task: &str) -> Result<TaskInfo> {
        self.set_task_enabled(task, false)
    }

    /// Run a synthetic type or probe once, outside its timer
    pub async fn trigger_task(&self, task: &str) -> Result<TaskRun> {
        if self.synthetic.runner().has_script(task) {
            return self.synthetic.trigger(task).await.map(TaskRun::Synthetic);
        }
        if self.probes.contains(task) {
            return self.probes.run_probe(task).await.map(TaskRun::Probe);
        }
        Err(Self::unknown_task(task))
    }
}
