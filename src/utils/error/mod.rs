//! Error handling for the resilience subsystem
//!
//! The variants follow the failure taxonomy the subsystem reports: breaker-open
//! rejections, operation failures, not-found lookups, notification and recovery
//! failures, plus the ambient configuration and I/O errors.

#![allow(missing_docs)]

mod helpers;
mod response;
mod types;

pub use response::{ErrorDetail, ErrorResponse};
pub use types::{ResilienceError, Result};
