//! Probe check implementations

use super::types::CheckOutput;
use crate::config::{ProbeConfig, ProbeKind};
use crate::monitoring::thresholds::ThresholdMonitor;
use crate::resilience::ResilienceRegistry;
use crate::utils::error::{ResilienceError, Result};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;

/// One health check; a returned error marks the check failed
#[async_trait::async_trait]
pub trait HealthCheck: Send + Sync + std::fmt::Debug {
    async fn check(&self) -> Result<CheckOutput>;
}

/// Process liveness
#[derive(Debug)]
pub struct LivenessCheck {
    started: Instant,
}

impl LivenessCheck {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for LivenessCheck {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HealthCheck for LivenessCheck {
    async fn check(&self) -> Result<CheckOutput> {
        Ok(CheckOutput::message("alive")
            .with_detail("uptime_seconds", self.started.elapsed().as_secs())
            .with_detail("pid", std::process::id()))
    }
}

/// Host memory usage sampled with sysinfo
#[cfg(feature = "metrics")]
fn sample_memory() -> Option<(f64, u64, u64)> {
    let mut system = sysinfo::System::new();
    system.refresh_memory();

    let total = system.total_memory();
    if total == 0 {
        return None;
    }
    let used = system.used_memory();
    Some((used as f64 / total as f64 * 100.0, used, total))
}

#[cfg(not(feature = "metrics"))]
fn sample_memory() -> Option<(f64, u64, u64)> {
    None
}

/// Host resources against the monitor's memory limit
#[derive(Debug)]
pub struct SystemResourceCheck {
    monitor: ThresholdMonitor,
}

impl SystemResourceCheck {
    pub fn new(monitor: ThresholdMonitor) -> Self {
        Self { monitor }
    }
}

#[async_trait::async_trait]
impl HealthCheck for SystemResourceCheck {
    async fn check(&self) -> Result<CheckOutput> {
        let Some((usage, used, total)) = sample_memory() else {
            return Ok(CheckOutput::message("memory sampling unavailable"));
        };

        let limit = self.monitor.thresholds().memory_usage_percent;
        if usage > limit {
            return Err(ResilienceError::operation(format!(
                "memory usage {:.1}% exceeds {:.1}%",
                usage, limit
            )));
        }

        let mut output = CheckOutput::message(format!("memory usage {:.1}%", usage))
            .with_detail("used_memory_bytes", used)
            .with_detail("total_memory_bytes", total);
        output.memory_usage_percent = Some(usage);
        Ok(output)
    }
}

/// A dependency checked through its circuit breaker
///
/// With a URL the endpoint must answer 2xx; otherwise the dependency's
/// registered health predicate decides, and a missing predicate passes.
#[derive(Debug)]
pub struct DependencyCheck {
    registry: Arc<ResilienceRegistry>,
    dependency: String,
    endpoint: Option<(reqwest::Client, String)>,
}

impl DependencyCheck {
    pub fn new(registry: Arc<ResilienceRegistry>, dependency: impl Into<String>) -> Self {
        Self {
            registry,
            dependency: dependency.into(),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, client: reqwest::Client, url: impl Into<String>) -> Self {
        self.endpoint = Some((client, url.into()));
        self
    }

    async fn probe(&self) -> Result<()> {
        if let Some((client, url)) = &self.endpoint {
            let response = client.get(url).send().await?;
            if !response.status().is_success() {
                return Err(ResilienceError::operation(format!(
                    "{} returned status: {}",
                    url,
                    response.status()
                )));
            }
            return Ok(());
        }

        match self.registry.health_predicate(&self.dependency) {
            Some(predicate) if !predicate().await => Err(ResilienceError::operation(format!(
                "{} reported unhealthy",
                self.dependency
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl HealthCheck for DependencyCheck {
    async fn check(&self) -> Result<CheckOutput> {
        self.registry
            .execute_protected(&self.dependency, || self.probe(), None)
            .await?;

        let mut output = CheckOutput::message(format!("{} reachable", self.dependency));
        if let Some(breaker) = self.registry.breaker(&self.dependency) {
            output = output.with_detail("breaker_state", breaker.state().to_string());
        }
        Ok(output)
    }
}

/// Check function producing a future
pub type CheckFn = Arc<dyn Fn() -> BoxFuture<'static, Result<CheckOutput>> + Send + Sync>;

/// Check backed by a closure
pub struct FnCheck {
    check: CheckFn,
}

impl FnCheck {
    pub fn new(check: CheckFn) -> Self {
        Self { check }
    }
}

impl std::fmt::Debug for FnCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCheck").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl HealthCheck for FnCheck {
    async fn check(&self) -> Result<CheckOutput> {
        (self.check)().await
    }
}

/// Check implementation for a configured probe
pub fn build_check(
    config: &ProbeConfig,
    registry: &Arc<ResilienceRegistry>,
    monitor: &ThresholdMonitor,
    client: &reqwest::Client,
) -> Arc<dyn HealthCheck> {
    match config.kind {
        ProbeKind::Liveness => Arc::new(LivenessCheck::new()),
        ProbeKind::Detailed => Arc::new(SystemResourceCheck::new(monitor.clone())),
        ProbeKind::Dependency | ProbeKind::DataStore => {
            let dependency = config.dependency.as_deref().unwrap_or(&config.name);
            let mut check = DependencyCheck::new(registry.clone(), dependency);
            if let Some(url) = &config.url {
                check = check.with_endpoint(client.clone(), url.clone());
            }
            Arc::new(check)
        }
    }
}
