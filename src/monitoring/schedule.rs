//! Independent periodic timers for probes and synthetic transactions
//!
//! Every named task owns its own ticker. A tick spawns the run and waits for it
//! before the next tick, so a task never overlaps itself. Aborting the ticker
//! stops future runs; a run already spawned finishes on its own.

use crate::utils::error::{ResilienceError, Result};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Produces one run of a task
pub type Job = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Spawn a ticker running `job` every `period`, first after one period
pub fn spawn_periodic(name: String, period: Duration, job: Job) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            debug!("Running scheduled task {}", name);

            let run = tokio::spawn(job());
            if let Err(e) = run.await {
                warn!("Scheduled task {} panicked: {}", name, e);
            }
        }
    })
}

/// Timer settings and state of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskInfo {
    pub name: String,
    pub interval_ms: u64,
    pub enabled: bool,
    /// Whether a ticker is currently armed
    pub running: bool,
}

struct TaskEntry {
    interval: Duration,
    enabled: bool,
    job: Job,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for TaskEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskEntry")
            .field("interval", &self.interval)
            .field("enabled", &self.enabled)
            .field("armed", &self.handle.is_some())
            .finish()
    }
}

impl TaskEntry {
    fn arm(&mut self, name: &str) {
        self.disarm();
        self.handle = Some(spawn_periodic(
            name.to_string(),
            self.interval,
            self.job.clone(),
        ));
    }

    fn disarm(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    fn info(&self, name: &str) -> TaskInfo {
        TaskInfo {
            name: name.to_string(),
            interval_ms: self.interval.as_millis() as u64,
            enabled: self.enabled,
            running: self.handle.as_ref().is_some_and(|h| !h.is_finished()),
        }
    }
}

/// Named periodic tasks of one kind
#[derive(Debug)]
pub struct PeriodicTasks {
    kind: &'static str,
    tasks: Mutex<BTreeMap<String, TaskEntry>>,
    started: AtomicBool,
}

impl PeriodicTasks {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            tasks: Mutex::new(BTreeMap::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Register a task; it is armed immediately if the table is started
    pub fn insert(&self, name: impl Into<String>, interval: Duration, enabled: bool, job: Job) {
        let name = name.into();
        let mut entry = TaskEntry {
            interval,
            enabled,
            job,
            handle: None,
        };
        if enabled && self.is_started() {
            entry.arm(&name);
        }

        let mut tasks = self.tasks.lock();
        if let Some(mut previous) = tasks.insert(name, entry) {
            previous.disarm();
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.lock().contains_key(name)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Arm every enabled task
    pub fn start(&self) {
        self.started.store(true, Ordering::Release);
        let mut tasks = self.tasks.lock();
        let mut armed = 0;
        for (name, entry) in tasks.iter_mut() {
            if entry.enabled {
                entry.arm(name);
                armed += 1;
            }
        }
        info!("Started {} {} timers", armed, self.kind);
    }

    /// Disarm every task
    pub fn stop(&self) {
        self.started.store(false, Ordering::Release);
        let mut tasks = self.tasks.lock();
        for entry in tasks.values_mut() {
            entry.disarm();
        }
        info!("Stopped {} timers", self.kind);
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<TaskInfo> {
        let started = self.is_started();
        let mut tasks = self.tasks.lock();
        let entry = tasks
            .get_mut(name)
            .ok_or_else(|| ResilienceError::not_found(format!("{} task {}", self.kind, name)))?;

        entry.enabled = enabled;
        if enabled && started {
            if entry.handle.is_none() {
                entry.arm(name);
            }
        } else {
            entry.disarm();
        }

        info!(
            "{} task {} {}",
            self.kind,
            name,
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(entry.info(name))
    }

    /// Change a task's period; an armed ticker restarts with the new period
    pub fn set_interval(&self, name: &str, interval_ms: u64) -> Result<TaskInfo> {
        if interval_ms == 0 {
            return Err(ResilienceError::validation("interval must be greater than 0"));
        }

        let mut tasks = self.tasks.lock();
        let entry = tasks
            .get_mut(name)
            .ok_or_else(|| ResilienceError::not_found(format!("{} task {}", self.kind, name)))?;

        entry.interval = Duration::from_millis(interval_ms);
        if entry.handle.is_some() {
            entry.arm(name);
        }

        info!("{} task {} interval set to {}ms", self.kind, name, interval_ms);
        Ok(entry.info(name))
    }

    pub fn info(&self, name: &str) -> Result<TaskInfo> {
        self.tasks
            .lock()
            .get(name)
            .map(|entry| entry.info(name))
            .ok_or_else(|| ResilienceError::not_found(format!("{} task {}", self.kind, name)))
    }

    /// Every task, ordered by name
    pub fn list(&self) -> Vec<TaskInfo> {
        self.tasks
            .lock()
            .iter()
            .map(|(name, entry)| entry.info(name))
            .collect()
    }

    /// Names of enabled tasks
    pub fn enabled_names(&self) -> Vec<String> {
        self.tasks
            .lock()
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl Drop for PeriodicTasks {
    fn drop(&mut self) {
        for entry in self.tasks.get_mut().values_mut() {
            entry.disarm();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::AtomicU32;

    fn counting_job(counter: &Arc<AtomicU32>) -> Job {
        let counter = counter.clone();
        Arc::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_tasks_fire_on_their_own_period() {
        let fast = Arc::new(AtomicU32::new(0));
        let slow = Arc::new(AtomicU32::new(0));
        let tasks = PeriodicTasks::new("test");
        tasks.insert("fast", Duration::from_secs(1), true, counting_job(&fast));
        tasks.insert("slow", Duration::from_secs(5), true, counting_job(&slow));
        tasks.start();

        tokio::time::sleep(Duration::from_millis(10_500)).await;

        assert_eq!(fast.load(Ordering::SeqCst), 10);
        assert_eq!(slow.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_task_never_fires() {
        let counter = Arc::new(AtomicU32::new(0));
        let tasks = PeriodicTasks::new("test");
        tasks.insert("booking", Duration::from_secs(1), false, counting_job(&counter));
        tasks.start();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!tasks.info("booking").unwrap().running);

        tasks.set_enabled("booking", true).unwrap();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_does_not_cancel_in_flight_run() {
        let finished = Arc::new(AtomicU32::new(0));
        let job: Job = {
            let finished = finished.clone();
            Arc::new(move || {
                let finished = finished.clone();
                async move {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                }
                .boxed()
            })
        };

        let tasks = PeriodicTasks::new("test");
        tasks.insert("login", Duration::from_secs(1), true, job);
        tasks.start();

        // First run starts at 1s and is still sleeping at 2s
        tokio::time::sleep(Duration::from_secs(2)).await;
        tasks.set_enabled("login", false).unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_interval_rearms() {
        let counter = Arc::new(AtomicU32::new(0));
        let tasks = PeriodicTasks::new("test");
        tasks.insert("search", Duration::from_secs(60), true, counting_job(&counter));
        tasks.start();

        let info = tasks.set_interval("search", 1_000).unwrap();
        assert_eq!(info.interval_ms, 1_000);
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        assert!(tasks.set_interval("search", 0).is_err());
        assert!(tasks.set_interval("missing", 10).unwrap_err().is_not_found());
    }
}
