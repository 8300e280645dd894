//! `/api/llm/deal-parse` handler.

use crate::audit;
use crate::auth::authenticate;
use crate::error::GatewayError;
use crate::guard::{check_input_security, check_rate_and_consent, record_request};
use crate::state::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cre_ai_consent::Feature;
use cre_ai_extraction::SessionStatus;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct DealParseRequest {
    pub input_text: String,
    #[serde(default)]
    pub input_source: Option<String>,
}

pub async fn deal_parse(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<DealParseRequest>,
) -> Result<Response, GatewayError> {
    let auth = authenticate(&headers)?;
    check_rate_and_consent(
        &state,
        &auth,
        None,
        "deal_parse",
        &body.input_text,
        Some(Feature::DealParsing),
    )
    .await?;

    let security_result = check_input_security(&state, &auth, None, "deal_parse", &body.input_text).await?;
    record_request(&state, &auth.user_id, auth.org_id.as_deref());

    let source = body.input_source.unwrap_or_else(|| "api".to_string());
    let session = state
        .orchestrator
        .parse(Some(&auth.user_id), &security_result.sanitized_input, &source)
        .await
        .map_err(|_| GatewayError::Internal)?;

    let raw_response = session.raw_provider_responses.last().cloned().unwrap_or_default();
    let output_validation = state
        .security
        .validate_output(&raw_response, cre_ai_security::ExpectedType::Structured);
    audit::record_success(
        &state,
        &auth,
        None,
        "deal_parse",
        &security_result.sanitized_input,
        &raw_response,
        &security_result,
        &output_validation,
    )
    .await;

    let body = serde_json::to_value(&session).unwrap_or(serde_json::json!({}));
    let status = match session.status {
        SessionStatus::Ok => StatusCode::OK,
        SessionStatus::EvalFailed | SessionStatus::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
        SessionStatus::ProviderError => StatusCode::BAD_GATEWAY,
        SessionStatus::Pending => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Ok((status, Json(body)).into_response())
}
