//! Test fixtures
//!
//! The booking API mock answers every built-in script so transactions pass
//! unless a test mounts a failing route first.

use caregrid_resilience::{Config, MonitoringSystem};
use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock server answering the built-in synthetic scripts
pub async fn booking_api() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "t-123" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "u-1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/clinics/search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "clinics": [{ "id": "c-7" }] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/clinics/[\w-]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "c-7" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/contact"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    server
}

/// Default configuration pointed at `base_url`
pub fn config_for(base_url: &str) -> Config {
    let mut config = Config::default();
    config.synthetic.base_url = base_url.to_string();
    config
}

pub fn monitoring_for(server: &MockServer) -> MonitoringSystem {
    MonitoringSystem::new(&config_for(&server.uri())).unwrap()
}
