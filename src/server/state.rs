//! Application state shared across HTTP handlers

use crate::monitoring::MonitoringSystem;

/// HTTP server state shared across handlers
///
/// The monitoring system is cheap to clone; every clone shares the same
/// breakers, schedulers and alert store.
#[derive(Debug, Clone)]
pub struct AppState {
    pub monitoring: MonitoringSystem,
}

impl AppState {
    pub fn new(monitoring: MonitoringSystem) -> Self {
        Self { monitoring }
    }
}
