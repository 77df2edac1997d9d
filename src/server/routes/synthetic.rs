//! Synthetic transaction endpoints

use crate::monitoring::synthetic::{ScriptStep, TransactionFilter};
use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use actix_web::{HttpResponse, Result as ActixResult, web};
use serde_json::json;
use tracing::info;

/// Configure synthetic routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/synthetic")
            .route("/run-all", web::post().to(run_all))
            .route("/run/{type}", web::post().to(run_transaction))
            .route("/history", web::get().to(history))
            .route("/history", web::delete().to(clear_history))
            .route("/summary", web::get().to(summary))
            .route("/transactions/{id}", web::get().to(get_transaction))
            .route("/types", web::get().to(transaction_types))
            .route("/scripts/{type}", web::get().to(get_script))
            .route("/scripts/{type}", web::put().to(set_script)),
    );
}

/// Run one transaction now; the result feeds the threshold monitor
async fn run_transaction(
    state: web::Data<AppState>,
    transaction_type: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let transaction = state
        .monitoring
        .synthetic()
        .trigger(&transaction_type)
        .await?;
    Ok(ApiResponse::ok(transaction))
}

async fn run_all(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let transactions = state.monitoring.synthetic().run_all().await;
    let failed = transactions.iter().filter(|t| !t.is_success()).count();
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_meta(
        &transactions,
        json!({ "total": transactions.len(), "failed": failed }),
    )))
}

async fn history(
    state: web::Data<AppState>,
    filter: web::Query<TransactionFilter>,
) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(
        state.monitoring.synthetic().runner().history(&filter),
    ))
}

async fn clear_history(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let cleared = state.monitoring.synthetic().runner().clear_history();
    info!("Synthetic history cleared: {} transactions", cleared);
    Ok(ApiResponse::ok(json!({ "cleared": cleared })))
}

async fn summary(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let summary = state.monitoring.synthetic().runner().summary();
    let success_rate = summary.success_rate();
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_meta(
        summary,
        json!({ "success_rate": success_rate }),
    )))
}

async fn get_transaction(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let transaction = state
        .monitoring
        .synthetic()
        .runner()
        .get_transaction(&id)?;
    Ok(ApiResponse::ok(transaction))
}

async fn transaction_types(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(
        state.monitoring.synthetic().runner().transaction_types(),
    ))
}

async fn get_script(
    state: web::Data<AppState>,
    transaction_type: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let steps = state
        .monitoring
        .synthetic()
        .runner()
        .script(&transaction_type)?;
    Ok(ApiResponse::ok(steps))
}

async fn set_script(
    state: web::Data<AppState>,
    transaction_type: web::Path<String>,
    steps: web::Json<Vec<ScriptStep>>,
) -> ActixResult<HttpResponse> {
    let steps = steps.into_inner();
    state
        .monitoring
        .synthetic()
        .runner()
        .set_script(transaction_type.into_inner(), steps.clone())?;
    Ok(ApiResponse::ok(steps))
}
