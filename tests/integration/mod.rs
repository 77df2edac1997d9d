//! Integration tests
//!
//! - `admin_api_tests`: admin HTTP API round trips
//! - `config_tests`: loading the sample configuration and overrides
//! - `flow_tests`: failures travelling from breakers and synthetic runs to
//!   alerts and notifications

pub mod admin_api_tests;
pub mod config_tests;
pub mod flow_tests;
