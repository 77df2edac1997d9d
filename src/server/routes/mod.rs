//! HTTP route modules
//!
//! Handlers are grouped by the component they expose. Errors flow out as
//! [`ResilienceError`](crate::utils::error::ResilienceError), which renders
//! its own status code and body.

pub mod alerts;
pub mod scheduler;
pub mod status;
pub mod synthetic;
pub mod thresholds;

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

/// Standard API response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Additional metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// Create a successful response
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: None,
        }
    }

    /// Create a successful response with metadata
    pub fn success_with_meta(data: T, meta: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: Some(meta),
        }
    }

    /// 200 with this response as the body
    pub fn ok(data: T) -> HttpResponse {
        HttpResponse::Ok().json(Self::success(data))
    }

    /// 201 with this response as the body
    pub fn created(data: T) -> HttpResponse {
        HttpResponse::Created().json(Self::success(data))
    }
}

/// Body of acknowledge and resolve requests
#[derive(Debug, Clone, Deserialize)]
pub struct ActorRequest {
    #[serde(default = "default_actor")]
    pub by: String,
}

fn default_actor() -> String {
    "operator".to_string()
}

impl ActorRequest {
    /// Actor from an optional body
    pub fn actor(body: Option<web::Json<ActorRequest>>) -> String {
        body.map(|body| body.into_inner().by)
            .filter(|by| !by.trim().is_empty())
            .unwrap_or_else(default_actor)
    }
}

/// Register every route group
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(status::configure_routes)
        .configure(alerts::configure_routes)
        .configure(synthetic::configure_routes)
        .configure(scheduler::configure_routes)
        .configure(thresholds::configure_routes);
}
