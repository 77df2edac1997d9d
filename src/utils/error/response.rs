//! HTTP response handling for errors

use super::types::ResilienceError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

impl ResponseError for ResilienceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ResilienceError::NotFound(_) => StatusCode::NOT_FOUND,
            ResilienceError::Validation(_) => StatusCode::BAD_REQUEST,
            ResilienceError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ResilienceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ResilienceError::Operation(_) | ResilienceError::HttpClient(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let message = if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status_code).json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
                timestamp: chrono::Utc::now().timestamp(),
            },
        })
    }
}

/// Standard error response format
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

/// Error detail information
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub timestamp: i64,
}
