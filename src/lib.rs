//! # CareGrid Resilience
//!
//! Resilience and monitoring for the CareGrid booking API.
//!
//! ## Features
//!
//! - **Circuit breakers**: named breakers with fallbacks, graceful degradation
//!   and error-pattern tracking
//! - **Health probes**: liveness, resource, data store and dependency checks on
//!   independent timers, with automatic recovery
//! - **Synthetic transactions**: scripted user journeys run against the live API
//! - **Alerting**: threshold evaluation with suppression, escalation policies and
//!   email, SMS, Slack and webhook notifications
//! - **Admin API**: actix-web endpoints for operators
//!
//! ## Embedding
//!
//! ```rust,no_run
//! use caregrid_resilience::{Config, MonitoringSystem};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/resilience.yaml").await?;
//!     let monitoring = MonitoringSystem::new(&config)?;
//!     monitoring.start();
//!
//!     let booked = monitoring
//!         .registry()
//!         .execute_protected("payment", || async { Ok("charged") }, None)
//!         .await?;
//!     println!("{}", booked);
//!
//!     monitoring.stop();
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod monitoring;
pub mod resilience;
pub mod server;
pub mod utils;

pub use config::Config;
pub use monitoring::{Alert, AlertSeverity, AlertStatus, MonitoringSystem};
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState, ResilienceRegistry};
pub use utils::error::{ResilienceError, Result};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build information recorded by the build script
#[derive(Debug, Clone, serde::Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub build_time: &'static str,
    pub git_hash: &'static str,
    pub rust_version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: VERSION,
            build_time: option_env!("BUILD_TIME").unwrap_or("unknown"),
            git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
            rust_version: option_env!("RUST_VERSION").unwrap_or("unknown"),
        }
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert!(!info.version.is_empty());
        assert_eq!(info.version, VERSION);
    }

    #[test]
    fn test_constants() {
        assert_eq!(NAME, "caregrid-resilience");
        assert_eq!(DESCRIPTION, env!("CARGO_PKG_DESCRIPTION"));
    }
}
