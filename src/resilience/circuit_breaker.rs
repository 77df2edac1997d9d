//! Circuit breaker implementation for fault tolerance

use super::types::{BreakerEvent, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};
use crate::utils::error::{ResilienceError, Result};
use parking_lot::Mutex;
use std::future::Future;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Mutable breaker state, guarded by a single lock so that counter updates and
/// transitions are observed atomically by concurrent callers
#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    last_failure_at: Option<chrono::DateTime<chrono::Utc>>,
    last_state_change_at: Option<chrono::DateTime<chrono::Utc>>,
    total_requests: u64,
    total_failures: u64,
    total_successes: u64,
    total_rejections: u64,
    average_latency_ms: f64,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure: None,
            last_failure_at: None,
            last_state_change_at: None,
            total_requests: 0,
            total_failures: 0,
            total_successes: 0,
            total_rejections: 0,
            average_latency_ms: 0.0,
        }
    }

    fn transition(&mut self, state: CircuitState) {
        self.state = state;
        self.last_state_change_at = Some(chrono::Utc::now());
    }

    fn record_latency(&mut self, latency_ms: f64) {
        let attempted = (self.total_successes + self.total_failures) as f64;
        self.average_latency_ms += (latency_ms - self.average_latency_ms) / attempted;
    }
}

/// Per-dependency circuit breaker
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
    events: broadcast::Sender<BreakerEvent>,
}

impl CircuitBreaker {
    /// Create a breaker with its own event channel
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        Self::with_events(name, config, events)
    }

    /// Create a breaker publishing to a shared event channel
    pub fn with_events(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        events: broadcast::Sender<BreakerEvent>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner::new()),
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state as last recorded
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Subscribe to this breaker's events
    pub fn subscribe(&self) -> broadcast::Receiver<BreakerEvent> {
        self.events.subscribe()
    }

    /// Whether a call made now would be rejected without being attempted
    pub fn is_rejecting(&self) -> bool {
        let inner = self.inner.lock();
        inner.state == CircuitState::Open && !self.cooldown_elapsed(&inner)
    }

    /// Execute an operation under breaker protection
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.acquire()?;
        self.attempt(operation).await
    }

    /// Execute an operation, answering from `fallback` when the call is rejected
    /// or fails
    ///
    /// If the fallback itself fails, the original error is returned.
    pub async fn execute_with_fallback<T, F, Fut, FB, FbFut>(
        &self,
        operation: F,
        fallback: FB,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
        FB: FnOnce(&ResilienceError) -> FbFut,
        FbFut: Future<Output = Result<T>>,
    {
        let outcome = match self.acquire() {
            Ok(()) => self.attempt(operation).await,
            Err(rejection) => Err(rejection),
        };

        match outcome {
            Ok(value) => Ok(value),
            Err(error) => match fallback(&error).await {
                Ok(value) => {
                    debug!("Fallback answered for breaker {}", self.name);
                    Ok(value)
                }
                Err(fallback_error) => {
                    warn!(
                        "Fallback for breaker {} failed: {}",
                        self.name, fallback_error
                    );
                    Err(error)
                }
            },
        }
    }

    /// Force the breaker back to closed
    pub fn reset(&self) {
        {
            let mut inner = self.inner.lock();
            inner.failure_count = 0;
            inner.last_failure = None;
            inner.transition(CircuitState::Closed);
        }
        info!("Circuit breaker {} manually reset", self.name);
        self.emit(BreakerEvent::Reset {
            name: self.name.clone(),
        });
    }

    /// Snapshot of state and counters
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock();
        CircuitBreakerMetrics {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            failure_threshold: self.config.failure_threshold,
            reset_timeout_ms: self.config.reset_timeout_ms,
            total_requests: inner.total_requests,
            total_failures: inner.total_failures,
            total_successes: inner.total_successes,
            total_rejections: inner.total_rejections,
            average_latency_ms: inner.average_latency_ms,
            last_failure_at: inner.last_failure_at,
            last_state_change_at: inner.last_state_change_at,
        }
    }

    fn cooldown_elapsed(&self, inner: &BreakerInner) -> bool {
        inner
            .last_failure
            .map(|at| at.elapsed() > self.config.reset_timeout())
            .unwrap_or(true)
    }

    /// Admit or reject a call, moving OPEN to HALF_OPEN once the cooldown passed
    fn acquire(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.total_requests += 1;

        if inner.state == CircuitState::Open {
            if self.cooldown_elapsed(&inner) {
                inner.transition(CircuitState::HalfOpen);
                info!(
                    "Circuit breaker {} transitioning from OPEN to HALF_OPEN",
                    self.name
                );
            } else {
                inner.total_rejections += 1;
                debug!("Circuit breaker {} rejected call", self.name);
                return Err(ResilienceError::circuit_open(&self.name));
            }
        }

        Ok(())
    }

    async fn attempt<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let result = match self.config.call_timeout() {
            Some(limit) => match tokio::time::timeout(limit, operation()).await {
                Ok(result) => result,
                Err(_) => Err(ResilienceError::timeout(format!(
                    "{} call exceeded {}ms",
                    self.name,
                    limit.as_millis()
                ))),
            },
            None => operation().await,
        };
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(_) => self.on_success(latency_ms),
            Err(error) => self.on_failure(error, latency_ms),
        }

        result
    }

    fn on_success(&self, latency_ms: f64) {
        let closed = {
            let mut inner = self.inner.lock();
            inner.total_successes += 1;
            inner.record_latency(latency_ms);
            inner.failure_count = 0;

            if inner.state == CircuitState::HalfOpen {
                inner.transition(CircuitState::Closed);
                true
            } else {
                false
            }
        };

        if closed {
            info!(
                "Circuit breaker {} transitioning from HALF_OPEN to CLOSED",
                self.name
            );
            self.emit(BreakerEvent::Reset {
                name: self.name.clone(),
            });
        }
    }

    fn on_failure(&self, error: &ResilienceError, latency_ms: f64) {
        let (failure_count, opened) = {
            let mut inner = self.inner.lock();
            inner.total_failures += 1;
            inner.record_latency(latency_ms);
            inner.failure_count += 1;
            inner.last_failure = Some(Instant::now());
            inner.last_failure_at = Some(chrono::Utc::now());

            let should_open = inner.state == CircuitState::HalfOpen
                || (inner.state == CircuitState::Closed
                    && inner.failure_count >= self.config.failure_threshold);
            if should_open {
                inner.transition(CircuitState::Open);
            }
            (inner.failure_count, should_open)
        };

        self.emit(BreakerEvent::Failure {
            name: self.name.clone(),
            error: error.to_string(),
            failure_count,
        });

        if opened {
            warn!(
                "Circuit breaker {} opened after {} consecutive failures",
                self.name, failure_count
            );
            self.emit(BreakerEvent::Opened {
                name: self.name.clone(),
                failure_count,
            });
        }
    }

    fn emit(&self, event: BreakerEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}
