//! Gateway error taxonomy: guard failures are recovered at the
//! gateway into typed HTTP responses and never surface as internal errors.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("authentication required")]
    AuthRequired,
    #[error("access denied")]
    AccessDenied,
    #[error("not found")]
    NotFound { reason: &'static str },
    #[error("validation failed: {message}")]
    ValidationFailed { message: String },
    #[error("security check blocked the request")]
    SecurityBlocked,
    #[error("rate limited")]
    RateLimited {
        reason: String,
        limit_type: Option<String>,
        retry_after_seconds: u64,
    },
    #[error("consent required")]
    ConsentRequired { reason: String, policy_version: String },
    #[error("evaluator rejected the parse")]
    EvalFailed { body: serde_json::Value },
    #[error("schema invalid")]
    SchemaInvalid { body: serde_json::Value },
    #[error("llm provider unavailable")]
    ProviderUnavailable,
    #[error("internal error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    reason: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    consent_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    policy_version: Option<String>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, reason, message, limit_type, retry_after, consent_required, policy_version) =
            match &self {
                GatewayError::AuthRequired => (
                    StatusCode::UNAUTHORIZED,
                    "auth_required",
                    self.to_string(),
                    None,
                    None,
                    None,
                    None,
                ),
                GatewayError::AccessDenied => (
                    StatusCode::FORBIDDEN,
                    "access_denied",
                    self.to_string(),
                    None,
                    None,
                    None,
                    None,
                ),
                GatewayError::NotFound { reason } => (
                    StatusCode::NOT_FOUND,
                    *reason,
                    self.to_string(),
                    None,
                    None,
                    None,
                    None,
                ),
                GatewayError::ValidationFailed { message } => (
                    StatusCode::BAD_REQUEST,
                    "validation_failed",
                    message.clone(),
                    None,
                    None,
                    None,
                    None,
                ),
                GatewayError::SecurityBlocked => (
                    StatusCode::BAD_REQUEST,
                    "jailbreak_detected",
                    self.to_string(),
                    None,
                    None,
                    None,
                    None,
                ),
                GatewayError::RateLimited {
                    reason,
                    limit_type,
                    retry_after_seconds,
                } => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "rate_limited",
                    reason.clone(),
                    limit_type.clone(),
                    Some(*retry_after_seconds),
                    None,
                    None,
                ),
                GatewayError::ConsentRequired { reason, policy_version } => (
                    StatusCode::from_u16(451).unwrap(),
                    "consent_required",
                    reason.clone(),
                    None,
                    None,
                    Some(true),
                    Some(policy_version.clone()),
                ),
                GatewayError::EvalFailed { .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "eval_failed",
                    self.to_string(),
                    None,
                    None,
                    None,
                    None,
                ),
                GatewayError::SchemaInvalid { .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "schema_invalid",
                    self.to_string(),
                    None,
                    None,
                    None,
                    None,
                ),
                GatewayError::ProviderUnavailable => (
                    StatusCode::BAD_GATEWAY,
                    "provider_unavailable",
                    self.to_string(),
                    None,
                    None,
                    None,
                    None,
                ),
                GatewayError::Internal => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "internal error".to_string(),
                    None,
                    None,
                    None,
                    None,
                ),
            };

        let body = match &self {
            GatewayError::EvalFailed { body } | GatewayError::SchemaInvalid { body } => body.clone(),
            _ => serde_json::to_value(ErrorBody {
                reason,
                message,
                limit_type,
                retry_after_seconds: retry_after,
                consent_required,
                policy_version,
            })
            .unwrap_or(serde_json::json!({"reason": reason})),
        };

        let mut response = (status, Json(body)).into_response();
        if let GatewayError::RateLimited {
            retry_after_seconds, ..
        } = &self
        {
            if let Ok(value) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}
