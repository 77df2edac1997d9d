//! Named circuit breakers, fallback strategies and dependency health predicates

use super::circuit_breaker::CircuitBreaker;
use super::patterns::{ErrorPattern, ErrorPatternReport};
use super::types::{BreakerEvent, CircuitBreakerConfig, CircuitBreakerMetrics};
use crate::utils::error::{ResilienceError, Result};
use dashmap::DashMap;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Shared fallback strategy producing a `T` from the error that triggered it
pub type Fallback<T> = Arc<dyn Fn(&ResilienceError) -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Dependency health predicate
pub type HealthPredicate = Arc<dyn Fn() -> BoxFuture<'static, bool> + Send + Sync>;

/// Occurrences of one error pattern before it is reported as recurring
pub const RECURRING_PATTERN_THRESHOLD: u64 = 5;

/// Owner of every named circuit breaker in the process
pub struct ResilienceRegistry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    fallbacks: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    health_checks: RwLock<BTreeMap<String, HealthPredicate>>,
    error_patterns: DashMap<(String, ErrorPattern), u64>,
    events: broadcast::Sender<BreakerEvent>,
}

impl std::fmt::Debug for ResilienceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilienceRegistry")
            .field("breakers", &self.breaker_names())
            .field("health_checks", &self.health_checks.read().keys())
            .finish()
    }
}

impl Default for ResilienceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResilienceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            breakers: RwLock::new(HashMap::new()),
            fallbacks: RwLock::new(HashMap::new()),
            health_checks: RwLock::new(BTreeMap::new()),
            error_patterns: DashMap::new(),
            events,
        }
    }

    /// Create a registry with one breaker per configured dependency
    pub fn from_config(breakers: &BTreeMap<String, CircuitBreakerConfig>) -> Self {
        let registry = Self::new();
        for (name, config) in breakers {
            registry.register_breaker(name.clone(), config.clone());
        }
        registry
    }

    /// Register (or replace) the breaker for a dependency
    pub fn register_breaker(
        &self,
        name: impl Into<String>,
        config: CircuitBreakerConfig,
    ) -> Arc<CircuitBreaker> {
        let name = name.into();
        info!(
            "Registering circuit breaker {} (threshold {}, reset {}ms)",
            name, config.failure_threshold, config.reset_timeout_ms
        );

        let breaker = Arc::new(CircuitBreaker::with_events(
            name.clone(),
            config,
            self.events.clone(),
        ));
        self.breakers.write().insert(name, breaker.clone());
        breaker
    }

    pub fn breaker(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.read().get(name).cloned()
    }

    pub fn has_breaker(&self, name: &str) -> bool {
        self.breakers.read().contains_key(name)
    }

    pub fn breaker_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Subscribe to the events of every registered breaker
    pub fn subscribe(&self) -> broadcast::Receiver<BreakerEvent> {
        self.events.subscribe()
    }

    /// Register the default fallback used when a caller supplies none
    pub fn register_fallback<T: 'static>(&self, name: impl Into<String>, fallback: Fallback<T>) {
        self.fallbacks
            .write()
            .insert(name.into(), Arc::new(fallback));
    }

    fn registered_fallback<T: 'static>(&self, name: &str) -> Option<Fallback<T>> {
        let stored = self.fallbacks.read().get(name).cloned()?;
        match stored.downcast_ref::<Fallback<T>>() {
            Some(fallback) => Some(fallback.clone()),
            None => {
                warn!(
                    "Registered fallback for {} does not produce the requested type",
                    name
                );
                None
            }
        }
    }

    /// Run `operation` through the named breaker
    ///
    /// Without a registered breaker the operation runs unprotected. Without an
    /// explicit fallback the registered one for `name`, if any, is used.
    pub async fn execute_protected<T, F, Fut>(
        &self,
        name: &str,
        operation: F,
        fallback: Option<Fallback<T>>,
    ) -> Result<T>
    where
        T: 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let fallback = fallback.or_else(|| self.registered_fallback::<T>(name));

        let Some(breaker) = self.breaker(name) else {
            warn!(
                "No circuit breaker registered for {}, executing unprotected",
                name
            );
            return match (operation().await, fallback) {
                (Ok(value), _) => Ok(value),
                (Err(error), Some(fallback)) => fallback(&error).await.map_err(|_| error),
                (Err(error), None) => Err(error),
            };
        };

        match fallback {
            Some(fallback) => {
                breaker
                    .execute_with_fallback(operation, move |error| fallback(error))
                    .await
            }
            None => breaker.execute(operation).await,
        }
    }

    /// Prefer `degraded` outright while the breaker is open, otherwise try
    /// `primary` with `degraded` as its fallback
    pub async fn with_graceful_degradation<T, P, PFut, D, DFut>(
        &self,
        name: &str,
        primary: P,
        degraded: D,
    ) -> Result<T>
    where
        P: FnOnce() -> PFut,
        PFut: Future<Output = Result<T>>,
        D: FnOnce() -> DFut,
        DFut: Future<Output = Result<T>>,
    {
        match self.breaker(name) {
            Some(breaker) if breaker.is_rejecting() => {
                debug!("Breaker {} open, serving degraded response", name);
                degraded().await
            }
            Some(breaker) => {
                breaker
                    .execute_with_fallback(primary, move |_| degraded())
                    .await
            }
            None => {
                warn!(
                    "No circuit breaker registered for {}, executing unprotected",
                    name
                );
                match primary().await {
                    Ok(value) => Ok(value),
                    Err(error) => degraded().await.map_err(|_| error),
                }
            }
        }
    }

    /// Track the recurrence of an error family for a dependency
    ///
    /// Independent of breaker failure counting.
    pub fn record_error(&self, name: &str, error: &dyn std::fmt::Display) -> ErrorPatternReport {
        let message = error.to_string();
        let pattern = ErrorPattern::classify(&message);

        let occurrences = {
            let mut count = self
                .error_patterns
                .entry((name.to_string(), pattern))
                .or_insert(0);
            *count += 1;
            *count
        };

        let recurring = occurrences >= RECURRING_PATTERN_THRESHOLD;
        if recurring {
            warn!(
                "Recurring {} errors for {} ({} occurrences): {}",
                pattern, name, occurrences, message
            );
        } else {
            debug!("Recorded {} error for {}: {}", pattern, name, message);
        }

        ErrorPatternReport {
            name: name.to_string(),
            pattern,
            occurrences,
            recurring,
        }
    }

    /// Snapshot of the recurrence counters, keyed `name -> pattern -> count`
    pub fn error_patterns(&self) -> BTreeMap<String, BTreeMap<ErrorPattern, u64>> {
        let mut patterns: BTreeMap<String, BTreeMap<ErrorPattern, u64>> = BTreeMap::new();
        for entry in self.error_patterns.iter() {
            let (name, pattern) = entry.key();
            patterns
                .entry(name.clone())
                .or_default()
                .insert(*pattern, *entry.value());
        }
        patterns
    }

    /// Metrics of every breaker, ordered by name
    pub fn get_all_metrics(&self) -> Vec<CircuitBreakerMetrics> {
        let breakers: Vec<Arc<CircuitBreaker>> = self.breakers.read().values().cloned().collect();
        let mut metrics: Vec<CircuitBreakerMetrics> =
            breakers.iter().map(|breaker| breaker.metrics()).collect();
        metrics.sort_by(|a, b| a.name.cmp(&b.name));
        metrics
    }

    pub fn get_metrics(&self, name: &str) -> Result<CircuitBreakerMetrics> {
        self.breaker(name)
            .map(|breaker| breaker.metrics())
            .ok_or_else(|| ResilienceError::not_found(format!("circuit breaker {}", name)))
    }

    /// Force the named breaker closed
    pub fn reset_breaker(&self, name: &str) -> Result<CircuitBreakerMetrics> {
        let breaker = self
            .breaker(name)
            .ok_or_else(|| ResilienceError::not_found(format!("circuit breaker {}", name)))?;
        breaker.reset();
        Ok(breaker.metrics())
    }

    /// Register a health predicate for a dependency
    pub fn register_health_check(&self, name: impl Into<String>, predicate: HealthPredicate) {
        self.health_checks.write().insert(name.into(), predicate);
    }

    pub fn health_predicate(&self, name: &str) -> Option<HealthPredicate> {
        self.health_checks.read().get(name).cloned()
    }

    /// Evaluate one dependency
    ///
    /// An open breaker reports unhealthy without running the predicate. With no
    /// predicate registered the breaker state alone decides; `None` means neither
    /// a predicate nor a breaker exists.
    pub async fn check_one(&self, name: &str) -> Option<bool> {
        let breaker = self.breaker(name);
        if breaker.as_ref().is_some_and(|b| b.is_rejecting()) {
            return Some(false);
        }

        match self.health_predicate(name) {
            Some(predicate) => Some(predicate().await),
            None => breaker.map(|_| true),
        }
    }

    /// Evaluate every registered health predicate
    pub async fn check_health(&self) -> BTreeMap<String, bool> {
        let names: Vec<String> = self.health_checks.read().keys().cloned().collect();
        let mut results = BTreeMap::new();
        for name in names {
            let healthy = self.check_one(&name).await.unwrap_or(false);
            results.insert(name, healthy);
        }
        results
    }
}
