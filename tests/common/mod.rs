//! Common test utilities
//!
//! - Mocked booking API endpoints for synthetic transactions
//! - Monitoring systems wired to a mock server
//! - JSON helpers for admin API responses

pub mod fixtures;

pub use fixtures::{booking_api, config_for, monitoring_for};

/// Build the admin app around a monitoring system
#[macro_export]
macro_rules! admin_app {
    ($monitoring:expr) => {
        actix_web::test::init_service(
            caregrid_resilience::server::HttpServer::create_app(actix_web::web::Data::new(
                caregrid_resilience::server::AppState::new($monitoring),
            )),
        )
        .await
    };
}
