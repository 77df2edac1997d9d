//! Periodic synthetic transactions

use super::runner::SyntheticRunner;
use super::types::SyntheticTransaction;
use crate::config::ScheduleConfig;
use crate::monitoring::schedule::{Job, PeriodicTasks, TaskInfo};
use crate::monitoring::thresholds::ThresholdMonitor;
use crate::utils::error::Result;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, warn};

/// Runs each transaction type on its own timer and feeds the threshold monitor
#[derive(Debug)]
pub struct SyntheticScheduler {
    runner: Arc<SyntheticRunner>,
    monitor: ThresholdMonitor,
    tasks: PeriodicTasks,
}

/// Run one transaction and evaluate it together with the updated summary
async fn run_and_evaluate(
    runner: &SyntheticRunner,
    monitor: &ThresholdMonitor,
    transaction_type: &str,
) -> Result<SyntheticTransaction> {
    let transaction = runner.run(transaction_type).await?;
    monitor.evaluate_transaction(&transaction);
    monitor.evaluate_summary(&runner.summary());
    Ok(transaction)
}

impl SyntheticScheduler {
    pub fn new(
        runner: Arc<SyntheticRunner>,
        monitor: ThresholdMonitor,
        schedules: &BTreeMap<String, ScheduleConfig>,
    ) -> Self {
        let scheduler = Self {
            runner,
            monitor,
            tasks: PeriodicTasks::new("synthetic"),
        };

        for (transaction_type, schedule) in schedules {
            if !scheduler.runner.has_script(transaction_type) {
                warn!(
                    "No script for scheduled transaction type {}, skipping",
                    transaction_type
                );
                continue;
            }
            scheduler.tasks.insert(
                transaction_type.clone(),
                schedule.interval(),
                schedule.enabled,
                scheduler.job(transaction_type),
            );
        }

        scheduler
    }

    fn job(&self, transaction_type: &str) -> Job {
        let runner = self.runner.clone();
        let monitor = self.monitor.clone();
        let transaction_type = transaction_type.to_string();
        Arc::new(move || {
            let runner = runner.clone();
            let monitor = monitor.clone();
            let transaction_type = transaction_type.clone();
            async move {
                if let Err(e) = run_and_evaluate(&runner, &monitor, &transaction_type).await {
                    error!("Scheduled {} transaction could not run: {}", transaction_type, e);
                }
            }
            .boxed()
        })
    }

    pub fn runner(&self) -> &Arc<SyntheticRunner> {
        &self.runner
    }

    /// Run one type now, outside its timer
    pub async fn trigger(&self, transaction_type: &str) -> Result<SyntheticTransaction> {
        run_and_evaluate(&self.runner, &self.monitor, transaction_type).await
    }

    /// Run every enabled type concurrently
    pub async fn run_all(&self) -> Vec<SyntheticTransaction> {
        let types = self.tasks.enabled_names();
        let results = self.runner.run_types(&types).await;

        let mut transactions = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(transaction) => {
                    self.monitor.evaluate_transaction(&transaction);
                    transactions.push(transaction);
                }
                Err(e) => error!("Synthetic transaction could not run: {}", e),
            }
        }
        self.monitor.evaluate_summary(&self.runner.summary());
        transactions
    }

    pub fn start(&self) {
        self.tasks.start();
    }

    pub fn stop(&self) {
        self.tasks.stop();
    }

    pub fn contains(&self, transaction_type: &str) -> bool {
        self.tasks.contains(transaction_type)
    }

    pub fn set_enabled(&self, transaction_type: &str, enabled: bool) -> Result<TaskInfo> {
        self.tasks.set_enabled(transaction_type, enabled)
    }

    pub fn set_interval(&self, transaction_type: &str, interval_ms: u64) -> Result<TaskInfo> {
        self.tasks.set_interval(transaction_type, interval_ms)
    }

    pub fn schedule(&self) -> Vec<TaskInfo> {
        self.tasks.list()
    }
}
