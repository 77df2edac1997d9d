//! Duplicate-alert suppression keyed by (alert type, identifier)

use crate::config::SuppressionConfig;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use tokio::time::Instant;

/// Last alert time per (alert type, identifier)
///
/// Entries live for the process lifetime.
#[derive(Debug)]
pub struct SuppressionTracker {
    entries: DashMap<(String, String), Instant>,
    config: RwLock<SuppressionConfig>,
}

impl SuppressionTracker {
    pub fn new(config: SuppressionConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config: RwLock::new(config),
        }
    }

    /// Whether an alert may be raised now, stamping the entry if so
    ///
    /// Check and stamp happen under the entry lock, so concurrent breaches of
    /// the same key admit exactly one alert.
    pub fn try_acquire(&self, alert_type: &str, identifier: &str) -> bool {
        let window = self.config.read().window_for(alert_type);
        let now = Instant::now();

        match self
            .entries
            .entry((alert_type.to_string(), identifier.to_string()))
        {
            Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) < window {
                    false
                } else {
                    entry.insert(now);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Whether `(alert_type, identifier)` is inside its window
    pub fn is_suppressed(&self, alert_type: &str, identifier: &str) -> bool {
        let window = self.config.read().window_for(alert_type);
        self.entries
            .get(&(alert_type.to_string(), identifier.to_string()))
            .is_some_and(|last| last.elapsed() < window)
    }

    pub fn config(&self) -> SuppressionConfig {
        self.config.read().clone()
    }

    pub fn set_config(&self, config: SuppressionConfig) {
        *self.config.write() = config;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
