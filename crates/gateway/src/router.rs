//! HTTP routing for the AI endpoints.

use crate::handlers::{chat, conflicts, consent, deal_parse, summarize};
use crate::state::AppState;
use axum::routing::{get, patch, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/ai-consent/grant", post(consent::grant))
        .route("/api/ai-consent/withdraw", post(consent::withdraw))
        .route("/api/ai-consent/features", patch(consent::update_feature))
        .route("/api/ai-consent/status", get(consent::status))
        .route("/api/deals/{id}/chat", post(chat::chat))
        .route("/api/deals/{id}/summarize", post(summarize::summarize))
        .route("/api/deals/{id}/ai/extract", post(summarize::extract))
        .route("/api/deals/{id}/ai/synthesize", post(conflicts::synthesize))
        .route(
            "/api/deals/{id}/ai/conflicts/{field}/resolve",
            post(conflicts::resolve),
        )
        .route("/api/llm/deal-parse", post(deal_parse::deal_parse))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
