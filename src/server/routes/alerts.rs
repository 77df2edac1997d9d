//! Alert, rule and escalation policy endpoints

use crate::monitoring::alerts::{AlertFilter, AlertRule, EscalationPolicy};
use crate::monitoring::{AlertMetadata, AlertSeverity};
use crate::server::routes::{ActorRequest, ApiResponse};
use crate::server::state::AppState;
use crate::utils::error::ResilienceError;
use actix_web::{HttpResponse, Result as ActixResult, web};
use serde::Deserialize;

/// Configure alert routes
///
/// Literal segments are registered ahead of `/{id}`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/alerts")
            .route("", web::post().to(create_alert))
            .route("/active", web::get().to(active_alerts))
            .route("/history", web::get().to(alert_history))
            .route("/statistics", web::get().to(alert_statistics))
            .route("/rules", web::get().to(list_rules))
            .route("/rules", web::post().to(create_rule))
            .route("/rules/{id}", web::get().to(get_rule))
            .route("/rules/{id}", web::put().to(update_rule))
            .route("/rules/{id}", web::delete().to(delete_rule))
            .route("/policies", web::get().to(list_policies))
            .route("/policies", web::post().to(create_policy))
            .route("/policies/{id}", web::get().to(get_policy))
            .route("/policies/{id}", web::put().to(update_policy))
            .route("/policies/{id}", web::delete().to(delete_policy))
            .route("/{id}", web::get().to(get_alert))
            .route("/{id}/acknowledge", web::post().to(acknowledge_alert))
            .route("/{id}/resolve", web::post().to(resolve_alert)),
    );
}

/// Manually raised alert
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAlertRequest {
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub message: String,
    #[serde(default)]
    pub metadata: AlertMetadata,
}

async fn create_alert(
    state: web::Data<AppState>,
    request: web::Json<CreateAlertRequest>,
) -> ActixResult<HttpResponse> {
    let request = request.into_inner();
    if request.alert_type.trim().is_empty() {
        return Err(ResilienceError::validation("alert type cannot be empty").into());
    }

    let alert = state.monitoring.alerts().create_alert(
        request.alert_type,
        request.severity,
        request.message,
        request.metadata,
    );
    Ok(ApiResponse::created(alert))
}

async fn active_alerts(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.alerts().get_active_alerts()))
}

async fn alert_history(
    state: web::Data<AppState>,
    filter: web::Query<AlertFilter>,
) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(
        state.monitoring.alerts().get_alert_history(&filter),
    ))
}

async fn alert_statistics(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(
        state.monitoring.alerts().get_alert_statistics(),
    ))
}

async fn get_alert(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.alerts().get_alert(&id)?))
}

async fn acknowledge_alert(
    state: web::Data<AppState>,
    id: web::Path<String>,
    body: Option<web::Json<ActorRequest>>,
) -> ActixResult<HttpResponse> {
    let by = ActorRequest::actor(body);
    let alert = state.monitoring.alerts().acknowledge_alert(&id, &by)?;
    Ok(ApiResponse::ok(alert))
}

async fn resolve_alert(
    state: web::Data<AppState>,
    id: web::Path<String>,
    body: Option<web::Json<ActorRequest>>,
) -> ActixResult<HttpResponse> {
    let by = ActorRequest::actor(body);
    let alert = state.monitoring.alerts().resolve_alert(&id, &by)?;
    Ok(ApiResponse::ok(alert))
}

// ==================== Rules ====================

async fn list_rules(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.alerts().list_rules()))
}

async fn get_rule(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.alerts().get_rule(&id)?))
}

async fn create_rule(
    state: web::Data<AppState>,
    rule: web::Json<AlertRule>,
) -> ActixResult<HttpResponse> {
    let rule = state.monitoring.alerts().create_rule(rule.into_inner())?;
    Ok(ApiResponse::created(rule))
}

async fn update_rule(
    state: web::Data<AppState>,
    id: web::Path<String>,
    rule: web::Json<AlertRule>,
) -> ActixResult<HttpResponse> {
    let rule = state
        .monitoring
        .alerts()
        .update_rule(&id, rule.into_inner())?;
    Ok(ApiResponse::ok(rule))
}

async fn delete_rule(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.alerts().delete_rule(&id)?))
}

// ==================== Escalation policies ====================

async fn list_policies(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.alerts().list_policies()))
}

async fn get_policy(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(state.monitoring.alerts().get_policy(&id)?))
}

async fn create_policy(
    state: web::Data<AppState>,
    policy: web::Json<EscalationPolicy>,
) -> ActixResult<HttpResponse> {
    let policy = state
        .monitoring
        .alerts()
        .create_policy(policy.into_inner())?;
    Ok(ApiResponse::created(policy))
}

async fn update_policy(
    state: web::Data<AppState>,
    id: web::Path<String>,
    policy: web::Json<EscalationPolicy>,
) -> ActixResult<HttpResponse> {
    let policy = state
        .monitoring
        .alerts()
        .update_policy(&id, policy.into_inner())?;
    Ok(ApiResponse::ok(policy))
}

async fn delete_policy(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> ActixResult<HttpResponse> {
    Ok(ApiResponse::ok(
        state.monitoring.alerts().delete_policy(&id)?,
    ))
}
