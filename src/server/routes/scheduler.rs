//! Scheduler endpoints
//!
//! `{task}` names a synthetic transaction type or a health probe.

use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use actix_web::{HttpResponse, Result as ActixResult, web};
use serde::Deserialize;
use tracing::info;

/// Configure scheduler routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/scheduler")
            .route("", web::get().to(overview))
            .route("/{task}/interval", web::put().to(set_interval))
            .route("/{task}/enable", web::post().to(enable_task))
            .route("/{task}/disable", web::post().to(disable_task))
            .route("/{task}/trigger", web::post().to(trigger_task)),
    );
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntervalRequest {
    pub interval_ms: u64,
}

async fn overview(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.scheduler_overview()))
}

async fn set_interval(
    state: web::Data<AppState>,
    task: web::Path<String>,
    request: web::Json<IntervalRequest>,
) -> ActixResult<HttpResponse> {
    let info = state
        .monitoring
        .set_task_interval(&task, request.interval_ms)?;
    info!("Task {} now runs every {}ms", task, info.interval_ms);
    Ok(ApiResponse::ok(info))
}

async fn enable_task(
    state: web::Data<AppState>,
    task: web::Path<String>,
) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.enable_task(&task)?))
}

async fn disable_task(
    state: web::Data<AppState>,
    task: web::Path<String>,
) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.disable_task(&task)?))
}

async fn trigger_task(
    state: web::Data<AppState>,
    task: web::Path<String>,
) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.trigger_task(&task).await?))
}
