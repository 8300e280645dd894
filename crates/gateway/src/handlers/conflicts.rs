//! `/api/deals/{id}/ai/synthesize` and `.../conflicts/{c}/resolve`

use crate::auth::authenticate;
use crate::error::GatewayError;
use crate::guard::check_rate_and_consent;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use cre_ai_reconciler::ExtractionConflict;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct SynthesizeResponse {
    pub conflicts: Vec<ExtractionConflict>,
}

pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    Path(deal_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SynthesizeResponse>, GatewayError> {
    let auth = authenticate(&headers)?;
    let prompt = format!("Synthesize conflicts for deal {deal_id}");
    check_rate_and_consent(&state, &auth, Some(&deal_id), "synthesize", &prompt, None).await?;

    let conflicts = state.reconciler.store().open_conflicts(&deal_id);
    Ok(Json(SynthesizeResponse { conflicts }))
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub resolved_value: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Path((deal_id, field)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<ResolveRequest>,
) -> Result<Json<ExtractionConflict>, GatewayError> {
    let auth = authenticate(&headers)?;
    let conflict = state
        .reconciler
        .resolve(&deal_id, &field, body.resolved_value, &auth.user_id, body.reason)
        .map_err(|_| GatewayError::NotFound { reason: "conflict_not_found" })?;
    Ok(Json(conflict))
}
