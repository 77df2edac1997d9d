//! Utility modules
//!
//! - **error**: error taxonomy and HTTP mapping
//! - **logging**: tracing subscriber setup

pub mod error;
pub mod logging;

pub use error::{ResilienceError, Result};
pub use logging::init_tracing;
