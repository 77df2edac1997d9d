//! Threshold and suppression endpoints

use crate::config::{SuppressionConfig, Thresholds};
use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use actix_web::{HttpResponse, Result as ActixResult, web};
use serde::Serialize;

/// Configure threshold routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/thresholds")
            .route("", web::get().to(get_thresholds))
            .route("", web::put().to(update_thresholds))
            .route("/suppression", web::get().to(get_suppression))
            .route("/suppression", web::put().to(update_suppression)),
    );
}

#[derive(Debug, Serialize)]
struct ThresholdView {
    thresholds: Thresholds,
    suppression: SuppressionConfig,
}

async fn get_thresholds(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let monitor = state.monitoring.monitor();
    Ok(ApiResponse::ok(ThresholdView {
        thresholds: monitor.thresholds(),
        suppression: monitor.suppression(),
    }))
}

/// Replace the numeric limits; rejected values leave the current ones in place
async fn update_thresholds(
    state: web::Data<AppState>,
    thresholds: web::Json<Thresholds>,
) -> ActixResult<HttpResponse> {
    let updated = state
        .monitoring
        .monitor()
        .update_thresholds(thresholds.into_inner())?;
    Ok(ApiResponse::ok(updated))
}

async fn get_suppression(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.monitor().suppression()))
}

async fn update_suppression(
    state: web::Data<AppState>,
    config: web::Json<SuppressionConfig>,
) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(
        state
            .monitoring
            .monitor()
            .update_suppression(config.into_inner()),
    ))
}
