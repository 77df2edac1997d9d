//! Monitoring and alerting
//!
//! Health probes and synthetic transactions run on independent timers; the
//! threshold monitor turns their results, and breaker transitions, into
//! suppressed alerts that the alert engine escalates.

// Public submodules
pub mod alerts;
pub mod health;
pub mod schedule;
pub mod synthetic;
pub mod thresholds;

// Internal submodules
mod background;
mod system;
mod types;

// Re-export public types
pub use system::{MonitoringSystem, SchedulerOverview, SystemStatus, TaskRun};
pub use types::{Alert, AlertMetadata, AlertSeverity, AlertStatus, NotificationRecord, alert_types};
