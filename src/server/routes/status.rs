//! Liveness and status endpoints

use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use actix_web::{HttpResponse, Result as ActixResult, web};
use serde::Serialize;
use std::borrow::Cow;
use tracing::{debug, info};

/// Configure liveness and status routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check)).service(
        web::scope("/status")
            .route("", web::get().to(system_status))
            .route("/breakers", web::get().to(list_breakers))
            .route("/breakers/{name}", web::get().to(get_breaker))
            .route("/breakers/{name}/reset", web::post().to(reset_breaker))
            .route("/probes", web::get().to(list_probes))
            .route("/probes/{name}", web::get().to(get_probe))
            .route("/error-patterns", web::get().to(error_patterns)),
    );
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: Cow<'static, str>,
    timestamp: chrono::DateTime<chrono::Utc>,
    version: Cow<'static, str>,
    uptime_seconds: u64,
}

/// Basic health check endpoint
///
/// Answers as long as the process serves requests; probe results live
/// under `/status`.
pub async fn health_check(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    debug!("Health check requested");

    Ok(ApiResponse::ok(HealthStatus {
        status: Cow::Borrowed("healthy"),
        timestamp: chrono::Utc::now(),
        version: Cow::Borrowed(env!("CARGO_PKG_VERSION")),
        uptime_seconds: state.monitoring.uptime().as_secs(),
    }))
}

async fn system_status(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.status()))
}

async fn list_breakers(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.registry().get_all_metrics()))
}

async fn get_breaker(
    state: web::Data<AppState>,
    name: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let metrics = state.monitoring.registry().get_metrics(&name)?;
    Ok(ApiResponse::ok(metrics))
}

async fn reset_breaker(
    state: web::Data<AppState>,
    name: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let metrics = state.monitoring.registry().reset_breaker(&name)?;
    info!("Circuit breaker {} reset by operator", name);
    Ok(ApiResponse::ok(metrics))
}

async fn list_probes(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.probes().probe_statuses()))
}

async fn get_probe(
    state: web::Data<AppState>,
    name: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let report = state.monitoring.probes().probe_status(&name)?;
    Ok(ApiResponse::ok(report))
}

async fn error_patterns(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.registry().error_patterns()))
}
