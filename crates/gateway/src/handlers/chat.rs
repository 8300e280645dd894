//! `/api/deals/{id}/chat` and `/summarize` handlers.

use crate::audit;
use crate::auth::authenticate;
use crate::error::GatewayError;
use crate::guard::{check_input_security, check_rate_and_consent, record_request};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use cre_ai_consent::Feature;
use cre_ai_extraction::{OracleRequest, PromptVariant};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub context: Vec<String>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Path(deal_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, GatewayError> {
    let auth = authenticate(&headers)?;
    check_rate_and_consent(
        &state,
        &auth,
        Some(&deal_id),
        "chat",
        &body.message,
        Some(Feature::ChatAssistant),
    )
    .await?;

    let security_result = check_input_security(&state, &auth, Some(&deal_id), "chat", &body.message).await?;
    record_request(&state, &auth.user_id, auth.org_id.as_deref());

    let request = OracleRequest {
        input_text: security_result.sanitized_input.clone(),
        variant: PromptVariant::Base,
        model: "default".to_string(),
        temperature: 0.2,
        max_tokens: 1024,
    };
    let raw_response = state
        .llm_oracle
        .call(&request)
        .await
        .map_err(|_| GatewayError::ProviderUnavailable)?;

    let output_validation = state.security.validate_output(&raw_response, cre_ai_security::ExpectedType::Chat);

    audit::record_success(
        &state,
        &auth,
        Some(&deal_id),
        "chat",
        &security_result.sanitized_input,
        &raw_response,
        &security_result,
        &output_validation,
    )
    .await;

    Ok(Json(ChatResponse {
        response: raw_response,
        context: body.conversation_history,
    }))
}
