//! `/api/ai-consent/*` handlers.

use crate::auth::authenticate;
use crate::error::GatewayError;
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use cre_ai_consent::{Feature, GrantOptions};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    #[serde(default)]
    pub allow_deal_parsing: Option<bool>,
    #[serde(default)]
    pub allow_chat_assistant: Option<bool>,
    #[serde(default)]
    pub allow_document_analysis: Option<bool>,
    #[serde(default)]
    pub allow_insights: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ConsentEcho {
    pub user_id: String,
    pub consent_given: bool,
    pub consent_version: String,
}

pub async fn grant(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<GrantRequest>,
) -> Result<Json<ConsentEcho>, GatewayError> {
    let auth = authenticate(&headers)?;
    let org_id = auth.org_id.unwrap_or_default();
    let opts = GrantOptions {
        deal_parsing: body.allow_deal_parsing,
        chat_assistant: body.allow_chat_assistant,
        document_analysis: body.allow_document_analysis,
        insights: body.allow_insights,
        ..Default::default()
    };
    let record = state
        .consent_engine
        .grant(&auth.user_id, &org_id, opts)
        .await
        .map_err(|_| GatewayError::Internal)?;
    Ok(Json(ConsentEcho {
        user_id: record.user_id,
        consent_given: record.consent_given,
        consent_version: record.consent_version,
    }))
}

#[derive(Debug, Deserialize, Default)]
pub struct WithdrawRequest {
    pub reason: Option<String>,
}

pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<WithdrawRequest>,
) -> Result<Json<ConsentEcho>, GatewayError> {
    let auth = authenticate(&headers)?;
    let record = state
        .consent_engine
        .withdraw(&auth.user_id, body.reason)
        .await
        .map_err(|err| match err {
            cre_ai_consent::ConsentError::NotFound => GatewayError::NotFound { reason: "no_consent_record" },
            _ => GatewayError::Internal,
        })?;
    Ok(Json(ConsentEcho {
        user_id: record.user_id,
        consent_given: record.consent_given,
        consent_version: record.consent_version,
    }))
}

#[derive(Debug, Deserialize)]
pub struct FeatureToggleRequest {
    pub feature: String,
    pub allowed: bool,
}

pub async fn update_feature(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<FeatureToggleRequest>,
) -> Result<Json<ConsentEcho>, GatewayError> {
    let auth = authenticate(&headers)?;
    let feature = parse_feature(&body.feature)
        .ok_or_else(|| GatewayError::ValidationFailed { message: "invalid feature".to_string() })?;
    let record = state
        .consent_engine
        .update_feature(&auth.user_id, feature, body.allowed)
        .await
        .map_err(|err| match err {
            cre_ai_consent::ConsentError::NotFound => GatewayError::NotFound { reason: "no_consent_record" },
            _ => GatewayError::Internal,
        })?;
    Ok(Json(ConsentEcho {
        user_id: record.user_id,
        consent_given: record.consent_given,
        consent_version: record.consent_version,
    }))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub has_consent: bool,
    pub requires_consent: bool,
    pub requires_reconsent: bool,
    pub in_grace_period: bool,
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, GatewayError> {
    let auth = authenticate(&headers)?;
    let status = state
        .consent_engine
        .get_status(&auth.user_id)
        .await
        .map_err(|_| GatewayError::Internal)?;
    Ok(Json(StatusResponse {
        has_consent: status.has_consent,
        requires_consent: status.requires_consent,
        requires_reconsent: status.requires_reconsent,
        in_grace_period: status.in_grace_period,
    }))
}

fn parse_feature(raw: &str) -> Option<Feature> {
    match raw {
        "deal_parsing" => Some(Feature::DealParsing),
        "chat_assistant" => Some(Feature::ChatAssistant),
        "document_analysis" => Some(Feature::DocumentAnalysis),
        "insights" => Some(Feature::Insights),
        _ => None,
    }
}
