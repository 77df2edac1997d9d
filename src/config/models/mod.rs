//! Configuration data models
//!
//! One module per top-level section of the YAML configuration file.

#![allow(missing_docs)]

pub mod alerting;
pub mod health;
pub mod logging;
pub mod resilience;
pub mod server;
pub mod synthetic;
pub mod thresholds;

pub use alerting::*;
pub use health::*;
pub use logging::*;
pub use resilience::*;
pub use server::*;
pub use synthetic::*;
pub use thresholds::*;

/// Default admin API host
pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default admin API port
pub fn default_port() -> u16 {
    9100
}

pub(crate) fn default_true() -> bool {
    true
}
