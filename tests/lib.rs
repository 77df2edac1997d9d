//! Test suite for caregrid-resilience
//!
//! ## Test Categories
//!
//! ### 1. Common Utilities (`common/`)
//! Shared fixtures: a mocked booking API, configuration builders and the
//! `admin_app!` macro that wraps a monitoring system in the admin HTTP app.
//!
//! ### 2. Integration Tests (`integration/`)
//! Admin API round trips, configuration loading and end-to-end flows from
//! failing dependencies to raised alerts.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all tests
//! cargo test
//!
//! # Run only integration tests
//! cargo test --test lib
//! ```

pub mod common;
pub mod integration;
