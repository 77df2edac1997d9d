//! Circuit breaker configuration

use crate::resilience::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Breakers registered at startup
///
/// A `breakers` map in the file replaces the built-in set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResilienceConfig {
    #[serde(default = "default_breakers")]
    pub breakers: BTreeMap<String, CircuitBreakerConfig>,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            breakers: default_breakers(),
        }
    }
}

/// database 5/30s, email 3/60s, external_api 5/60s, payment 3/120s
pub fn default_breakers() -> BTreeMap<String, CircuitBreakerConfig> {
    BTreeMap::from([
        ("database".to_string(), CircuitBreakerConfig::new(5, 30_000)),
        ("email".to_string(), CircuitBreakerConfig::new(3, 60_000)),
        ("external_api".to_string(), CircuitBreakerConfig::new(5, 60_000)),
        ("payment".to_string(), CircuitBreakerConfig::new(3, 120_000)),
    ])
}
