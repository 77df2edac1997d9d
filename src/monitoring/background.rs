//! Background task implementations for MonitoringSystem

use super::schedule::{Job, spawn_periodic};
use super::system::MonitoringSystem;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

impl MonitoringSystem {
    /// Spawn the breaker event listener and the threshold sweep
    pub(super) fn start_background_tasks(&self) {
        let mut background = self.background.lock();
        if !background.is_empty() {
            debug!("Background tasks already running");
            return;
        }

        background.push(
            self.monitor
                .spawn_breaker_listener(self.registry.subscribe()),
        );

        let period = Duration::from_millis(self.config.thresholds.evaluation_interval_ms);
        let monitoring = self.clone();
        let sweep: Job = Arc::new(move || {
            let monitoring = monitoring.clone();
            async move {
                monitoring.evaluate_thresholds();
            }
            .boxed()
        });
        background.push(spawn_periodic("threshold-sweep".to_string(), period, sweep));

        info!(
            "Threshold sweep running every {}ms",
            period.as_millis()
        );
    }

    pub(super) fn stop_background_tasks(&self) {
        for handle in self.background.lock().drain(..) {
            handle.abort();
        }
    }

    /// Evaluate breaker error rates and the synthetic success rate once
    pub fn evaluate_thresholds(&self) -> usize {
        debug!("Evaluating breaker and synthetic thresholds");
        let mut raised = self
            .monitor
            .evaluate_breakers(&self.registry.get_all_metrics())
            .len();
        if self
            .monitor
            .evaluate_summary(&self.synthetic.runner().summary())
            .is_some()
        {
            raised += 1;
        }
        raised
    }
}
