//! Threshold evaluation and duplicate-alert suppression

mod monitor;
mod suppression;

pub use monitor::{OVERALL, ThresholdMonitor};
pub use suppression::SuppressionTracker;
