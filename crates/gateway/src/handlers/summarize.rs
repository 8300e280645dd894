//! `/api/deals/{id}/summarize` and `/api/deals/{id}/ai/extract` handlers.
//! Document text extraction from binary formats is an explicit external
//! collaborator; this synthesizes the document's declared metadata into
//! an oracle call rather than reading bytes itself.

use crate::audit;
use crate::auth::authenticate;
use crate::error::GatewayError;
use crate::guard::{check_input_security, check_rate_and_consent, record_request};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use cre_ai_consent::Feature;
use cre_ai_extraction::{build_extraction, ExtractedField, FieldValue, OracleRequest, ProvenanceSource, PromptVariant};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

pub async fn summarize(
    State(state): State<Arc<AppState>>,
    Path(deal_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SummaryResponse>, GatewayError> {
    let auth = authenticate(&headers)?;
    let prompt = format!("Summarize deal {deal_id}");
    check_rate_and_consent(
        &state,
        &auth,
        Some(&deal_id),
        "summarize",
        &prompt,
        Some(Feature::ChatAssistant),
    )
    .await?;
    let security_result = check_input_security(&state, &auth, Some(&deal_id), "summarize", &prompt).await?;
    record_request(&state, &auth.user_id, auth.org_id.as_deref());

    let request = OracleRequest {
        input_text: security_result.sanitized_input.clone(),
        variant: PromptVariant::Base,
        model: "default".to_string(),
        temperature: 0.2,
        max_tokens: 512,
    };
    let summary = state
        .llm_oracle
        .call(&request)
        .await
        .map_err(|_| GatewayError::ProviderUnavailable)?;

    let output_validation = state.security.validate_output(&summary, cre_ai_security::ExpectedType::Chat);
    audit::record_success(
        &state,
        &auth,
        Some(&deal_id),
        "summarize",
        &security_result.sanitized_input,
        &summary,
        &security_result,
        &output_validation,
    )
    .await;

    Ok(Json(SummaryResponse { summary }))
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub document_id: String,
    pub document_type: String,
}

pub async fn extract(
    State(state): State<Arc<AppState>>,
    Path(deal_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ExtractRequest>,
) -> Result<Json<cre_ai_extraction::DocumentExtraction>, GatewayError> {
    let auth = authenticate(&headers)?;
    let prompt = format!("Extract fields for document {} ({})", body.document_id, body.document_type);
    check_rate_and_consent(
        &state,
        &auth,
        Some(&deal_id),
        "extract",
        &prompt,
        Some(Feature::DocumentAnalysis),
    )
    .await?;
    let security_result = check_input_security(&state, &auth, Some(&deal_id), "extract", &prompt).await?;
    record_request(&state, &auth.user_id, auth.org_id.as_deref());

    let request = OracleRequest {
        input_text: security_result.sanitized_input.clone(),
        variant: PromptVariant::Base,
        model: "default".to_string(),
        temperature: 0.0,
        max_tokens: 1024,
    };
    let raw = state
        .llm_oracle
        .call(&request)
        .await
        .map_err(|_| GatewayError::ProviderUnavailable)?;

    let output_validation = state.security.validate_output(&raw, cre_ai_security::ExpectedType::Json);
    audit::record_success(
        &state,
        &auth,
        Some(&deal_id),
        "extract",
        &security_result.sanitized_input,
        &raw,
        &security_result,
        &output_validation,
    )
    .await;

    let parsed: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|_| GatewayError::SchemaInvalid { body: serde_json::json!({"raw": raw}) })?;
    let object = parsed
        .as_object()
        .ok_or_else(|| GatewayError::SchemaInvalid { body: serde_json::json!({"raw": raw}) })?;

    let mut fields = BTreeMap::new();
    for (key, value) in object {
        let (field_value, confidence) = match value.as_f64() {
            Some(n) => (FieldValue::Number(n), 0.8),
            None => match value.as_str() {
                Some(s) => (FieldValue::Text(s.to_string()), 0.8),
                None => (FieldValue::Null, 0.0),
            },
        };
        fields.insert(
            key.clone(),
            ExtractedField {
                value: field_value,
                confidence,
                source: ProvenanceSource::Ai,
            },
        );
    }

    let extraction = build_extraction(&body.document_id, &deal_id, &body.document_type, fields);
    Ok(Json(extraction))
}
