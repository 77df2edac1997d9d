//! Circuit breakers and the registry that owns them
//!
//! Every call to an unreliable dependency goes through
//! [`ResilienceRegistry::execute_protected`], which delegates to the named
//! [`CircuitBreaker`]. Breaker transitions are published as [`BreakerEvent`]s on a
//! broadcast channel shared by all breakers of a registry.

mod circuit_breaker;
mod patterns;
mod registry;
mod types;

pub use circuit_breaker::CircuitBreaker;
pub use patterns::{ErrorPattern, ErrorPatternReport};
pub use registry::{Fallback, HealthPredicate, RECURRING_PATTERN_THRESHOLD, ResilienceRegistry};
pub use types::{BreakerEvent, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};
