use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use devops_auth::TokenError;
use std::fmt;

/// Request failures, one variant per HTTP status the service can reject with.
#[derive(Debug)]
pub enum ServiceError {
    /// Missing or invalid API key or token (401)
    Authentication(String),
    /// Missing or malformed payload (400)
    Validation(String),
    /// Any method other than POST on the main route (405)
    MethodNotAllowed,
    /// Unexpected failure (500); the detail is logged, never returned
    Internal(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Authentication(msg) => write!(f, "authentication failed: {}", msg),
            ServiceError::Validation(msg) => write!(f, "validation failed: {}", msg),
            ServiceError::MethodNotAllowed => write!(f, "method not allowed"),
            ServiceError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<TokenError> for ServiceError {
    fn from(e: TokenError) -> Self {
        if e.is_authentication_failure() {
            ServiceError::Authentication(format!("JWT validation failed: {e}"))
        } else {
            ServiceError::Internal(e.to_string())
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::Authentication(msg) => {
                HttpResponse::Unauthorized().json(serde_json::json!({ "error": msg }))
            }
            ServiceError::Validation(msg) => {
                HttpResponse::BadRequest().json(serde_json::json!({ "error": msg }))
            }
            ServiceError::MethodNotAllowed => HttpResponse::MethodNotAllowed()
                .content_type("text/plain; charset=utf-8")
                .body("ERROR"),
            ServiceError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                HttpResponse::InternalServerError()
                    .json(serde_json::json!({ "error": "Internal server error" }))
            }
        }
    }
}
