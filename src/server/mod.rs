//! Admin HTTP server
//!
//! Exposes breakers, probes, alerts, synthetic runs, timers and thresholds
//! of a running [`MonitoringSystem`](crate::monitoring::MonitoringSystem).

pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

#[cfg(test)]
mod tests;

pub use server::HttpServer;
pub use state::AppState;
