//! Logging initialisation
//!
//! Installs the global `tracing` subscriber used by the binary. Library code only
//! emits events through the `tracing` macros.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Returns `false` when a
/// subscriber was already installed (for example by a test harness).
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_thread_ids(false);

    if config.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
