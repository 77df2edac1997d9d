//! Best-effort recovery actions run when a probe turns unhealthy

use crate::config::RecoveryConfig;
use crate::resilience::ResilienceRegistry;
use crate::utils::error::{ResilienceError, Result};
use futures::future::BoxFuture;
use std::sync::Arc;

/// A recovery strategy; the returned string describes what was done
#[async_trait::async_trait]
pub trait RecoveryAction: Send + Sync + std::fmt::Debug {
    async fn recover(&self) -> Result<String>;

    fn name(&self) -> &str;
}

/// Force a dependency's breaker closed so traffic probes it again
#[derive(Debug)]
pub struct BreakerResetRecovery {
    registry: Arc<ResilienceRegistry>,
    breaker: String,
}

impl BreakerResetRecovery {
    pub fn new(registry: Arc<ResilienceRegistry>, breaker: impl Into<String>) -> Self {
        Self {
            registry,
            breaker: breaker.into(),
        }
    }
}

#[async_trait::async_trait]
impl RecoveryAction for BreakerResetRecovery {
    async fn recover(&self) -> Result<String> {
        let metrics = self
            .registry
            .reset_breaker(&self.breaker)
            .map_err(|e| ResilienceError::recovery(e.to_string()))?;
        Ok(format!("circuit breaker {} reset to {}", metrics.name, metrics.state))
    }

    fn name(&self) -> &str {
        "reset_breaker"
    }
}

pub type RecoveryFn = Arc<dyn Fn() -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// Recovery backed by a closure
pub struct FnRecovery {
    name: String,
    action: RecoveryFn,
}

impl FnRecovery {
    pub fn new(name: impl Into<String>, action: RecoveryFn) -> Self {
        Self {
            name: name.into(),
            action,
        }
    }
}

impl std::fmt::Debug for FnRecovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnRecovery")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl RecoveryAction for FnRecovery {
    async fn recover(&self) -> Result<String> {
        (self.action)().await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub fn build_recovery(
    config: &RecoveryConfig,
    registry: &Arc<ResilienceRegistry>,
) -> Arc<dyn RecoveryAction> {
    match config {
        RecoveryConfig::ResetBreaker { breaker } => {
            Arc::new(BreakerResetRecovery::new(registry.clone(), breaker.clone()))
        }
    }
}
