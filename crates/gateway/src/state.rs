//! Shared application state.

use crate::audit::AuditRepository;
use cre_ai_consent::ConsentEngine;
use cre_ai_extraction::{LlmOracle, ParseOrchestrator};
use cre_ai_lineage::LineageLedger;
use cre_ai_policy::PolicyConfig;
use cre_ai_ratelimit::RateLimiter;
use cre_ai_reconciler::ConflictReconciler;
use cre_ai_security::SecurityPipeline;
use std::sync::Arc;

pub struct AppState {
    pub config: PolicyConfig,
    pub rate_limiter: Arc<RateLimiter>,
    pub consent_engine: Arc<ConsentEngine>,
    pub security: Arc<SecurityPipeline>,
    pub orchestrator: Arc<ParseOrchestrator>,
    pub reconciler: Arc<ConflictReconciler>,
    pub lineage: Arc<LineageLedger>,
    pub audit_repo: Arc<dyn AuditRepository>,
    pub llm_oracle: Arc<dyn LlmOracle>,
}
