//! AI Safety & Governance Gateway server.

use anyhow::Context;
use cre_ai_consent::{ConsentEngine, InMemoryConsentRepository};
use cre_ai_extraction::{InMemorySessionRepository, MockLlmOracle, ParseOrchestrator, PromptVariant};
use cre_ai_gateway::{build_router, AppState, InMemoryAuditRepository};
use cre_ai_lineage::LineageLedger;
use cre_ai_policy::PolicyConfig;
use cre_ai_ratelimit::RateLimiter;
use cre_ai_reconciler::ConflictReconciler;
use cre_ai_security::SecurityPipeline;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PolicyConfig::from_env();

    let oracle = Arc::new(
        MockLlmOracle::new("gateway-default")
            .with_response(PromptVariant::Base, r#"{"name":"unknown"}"#)
            .with_response(PromptVariant::StrictRepair, r#"{"name":"unknown"}"#),
    );

    let rate_limiter = Arc::new(RateLimiter::new(config.clone()));
    rate_limiter.spawn_eviction_task();

    let state = Arc::new(AppState {
        config: config.clone(),
        rate_limiter,
        consent_engine: Arc::new(ConsentEngine::new(
            Arc::new(InMemoryConsentRepository::new()),
            config.clone(),
        )),
        security: Arc::new(SecurityPipeline::new(config.clone())),
        orchestrator: Arc::new(ParseOrchestrator::new(
            oracle.clone(),
            Arc::new(InMemorySessionRepository::new()),
            config.clone(),
        )),
        reconciler: Arc::new(ConflictReconciler::new(config.clone())),
        lineage: Arc::new(LineageLedger::new()),
        audit_repo: Arc::new(InMemoryAuditRepository::new()),
        llm_oracle: oracle,
    });

    let app = build_router(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    tracing::info!("AI Safety & Governance Gateway listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("gateway server failed")?;
    Ok(())
}
