use actix_web::http::header::CONTENT_TYPE;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use devops_auth::security::constant_time_eq;
use devops_auth::Claims;
use serde_json::Value;

use crate::error::ServiceError;
use crate::metrics::{self, DEVOPS_REQUESTS, TOKENS_ISSUED, TOKEN_VALIDATIONS};
use crate::payload::{is_json_content_type, parse_message};
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "X-Parse-REST-API-Key";
pub const TOKEN_HEADER: &str = "X-JWT-KWY";
pub const SERVICE_NAME: &str = "devops-microservice";

/// Largest `/DevOps` body read once the API key and token gates pass.
pub const MAX_MESSAGE_BYTES: usize = 65_536;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/DevOps")
            .route(web::post().to(devops))
            .default_service(web::to(method_not_allowed)),
    )
    .route("/health", web::get().to(health))
    .route("/admin/generate-jwt", web::post().to(generate_jwt))
    .route("/metrics", web::get().to(metrics_endpoint));
}

fn header_str<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// POST /DevOps - API key, then single-use token, then payload.
///
/// The body is only read after both gates pass, so unauthenticated callers
/// always see 401 whatever they send.
pub async fn devops(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let result = handle_devops(&req, body, &state).await;

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status_code(),
    };
    DEVOPS_REQUESTS.with_label_values(&[status.as_str()]).inc();

    result
}

async fn handle_devops(
    req: &HttpRequest,
    body: web::Payload,
    state: &AppState,
) -> Result<HttpResponse, ServiceError> {
    let api_key_ok = header_str(req, API_KEY_HEADER)
        .map(|key| state.authority.validate_api_key(key))
        .unwrap_or(false);
    if !api_key_ok {
        tracing::warn!("Rejected request with missing or invalid API key");
        return Err(ServiceError::Authentication(
            "Unauthorized - Invalid API Key".to_string(),
        ));
    }

    let token = header_str(req, TOKEN_HEADER)
        .ok_or_else(|| ServiceError::Authentication("JWT token required".to_string()))?;

    let claims = match state.authority.validate_token(token) {
        Ok(claims) => {
            TOKEN_VALIDATIONS.with_label_values(&["success"]).inc();
            claims
        }
        Err(e) => {
            TOKEN_VALIDATIONS.with_label_values(&[e.reason()]).inc();
            tracing::warn!(reason = e.reason(), error = %e, "JWT rejected");
            return Err(e.into());
        }
    };
    tracing::info!(
        jti = claims.get("jti").and_then(|v| v.as_str()).unwrap_or("unknown"),
        "Valid JWT processed for transaction"
    );

    let content_type = header_str(req, CONTENT_TYPE.as_str()).unwrap_or_default();
    if !is_json_content_type(content_type) {
        return Err(ServiceError::Validation(
            "Content-Type must be application/json".to_string(),
        ));
    }

    let body = match body.to_bytes_limited(MAX_MESSAGE_BYTES).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(_)) => {
            return Err(ServiceError::Validation(format!(
                "Payload exceeds {MAX_MESSAGE_BYTES} bytes"
            )))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            return Err(ServiceError::Validation("Invalid JSON payload".to_string()));
        }
    };

    let message = parse_message(&body)?;
    tracing::info!(to = %message.to, "Message processed successfully");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": message.confirmation(),
    })))
}

/// Every non-POST method on /DevOps.
pub async fn method_not_allowed(req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    tracing::warn!(method = %req.method(), "Method not allowed");
    DEVOPS_REQUESTS
        .with_label_values(&[StatusCode::METHOD_NOT_ALLOWED.as_str()])
        .inc();
    Err(ServiceError::MethodNotAllowed)
}

/// GET /health - service status and live ledger counts
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "transaction_stats": state.authority.stats(),
    }))
}

/// POST /admin/generate-jwt - issue a token for arbitrary claims.
///
/// Unauthenticated; meant for tests and operators. An empty body or `null`
/// issues a token for `{}`.
pub async fn generate_jwt(
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let claims = parse_claims(&body)?;

    let token = state.authority.issue_token(claims)?;
    TOKENS_ISSUED.inc();
    tracing::info!("Issued JWT via admin endpoint");

    Ok(HttpResponse::Ok().json(serde_json::json!({ "jwt_token": token })))
}

fn parse_claims(body: &[u8]) -> Result<Claims, ServiceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Claims::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(Value::Null) => Ok(Claims::new()),
        Ok(_) => Err(ServiceError::Validation(
            "Claims must be a JSON object".to_string(),
        )),
        Err(_) => Err(ServiceError::Validation("Invalid JSON payload".to_string())),
    }
}

/// GET /metrics - Prometheus exposition, bearer-gated
pub async fn metrics_endpoint(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    match &state.metrics_token {
        Some(token) => {
            let authorized = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| constant_time_eq(t.as_bytes(), token))
                .unwrap_or(false);

            if !authorized {
                return HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "Valid Bearer token required for /metrics"
                }));
            }
        }
        None => {
            if !state.public_metrics {
                return HttpResponse::Forbidden().json(serde_json::json!({
                    "error": "forbidden",
                    "message": "Set METRICS_TOKEN or DEVOPS_PUBLIC_METRICS=true to access /metrics"
                }));
            }
        }
    }
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::metrics_output())
}
