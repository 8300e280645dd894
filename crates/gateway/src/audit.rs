//! AIAudit persistence: one record per gateway request, guard rejection
//! or otherwise.

use crate::auth::AuthContext;
use crate::state::AppState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cre_ai_security::{OutputValidationResult, SecurityCheckResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityContext {
    pub sanitization_applied: bool,
    pub jailbreak_score: f64,
    pub jailbreak_patterns: Vec<String>,
    pub output_validation_passed: bool,
}

/// One record per AI request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAudit {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub role: Option<String>,
    pub org_id: Option<String>,
    pub deal_id: Option<String>,
    pub endpoint: String,
    pub prompt_summary: String,
    pub full_prompt: Option<String>,
    pub full_response: Option<String>,
    pub system_prompt_hash: Option<String>,
    pub model_used: Option<String>,
    pub context_fields: Vec<String>,
    pub response_length: usize,
    pub validation_passed: bool,
    pub validation_issues: Vec<String>,
    pub security_context: SecurityContext,
    pub created_at: DateTime<Utc>,
}

/// Truncate a prompt to the audit-summary length.
pub fn summarize_prompt(prompt: &str) -> String {
    prompt.chars().take(200).collect()
}

/// Persist the AIAudit for a request that reached the LLM and completed
/// (step 8).
#[allow(clippy::too_many_arguments)]
pub async fn record_success(
    state: &AppState,
    auth: &AuthContext,
    deal_id: Option<&str>,
    endpoint: &str,
    prompt: &str,
    response: &str,
    security_result: &SecurityCheckResult,
    output_validation: &OutputValidationResult,
) {
    let audit = AiAudit {
        id: Uuid::new_v4(),
        user_id: Some(auth.user_id.clone()),
        role: auth.role.clone(),
        org_id: auth.org_id.clone(),
        deal_id: deal_id.map(str::to_string),
        endpoint: endpoint.to_string(),
        prompt_summary: summarize_prompt(prompt),
        full_prompt: Some(prompt.to_string()),
        full_response: Some(response.to_string()),
        system_prompt_hash: None,
        model_used: Some("default".to_string()),
        context_fields: Vec::new(),
        response_length: response.len(),
        validation_passed: output_validation.valid,
        validation_issues: output_validation.issues.iter().cloned().collect(),
        security_context: SecurityContext {
            sanitization_applied: security_result.was_modified,
            jailbreak_score: security_result.jailbreak_score,
            jailbreak_patterns: security_result.patterns_matched.clone(),
            output_validation_passed: output_validation.valid,
        },
        created_at: Utc::now(),
    };
    persist(state, audit).await;
}

/// Persist the AIAudit for a request a guard short-circuited before the LLM
/// was ever called: rate limit, consent, or security block (step 4, step 2
/// "any guard failure ... the audit record records the rejection").
pub async fn record_rejection(
    state: &AppState,
    auth: &AuthContext,
    deal_id: Option<&str>,
    endpoint: &str,
    prompt: &str,
    reason: &str,
    security_result: Option<&SecurityCheckResult>,
) {
    let audit = AiAudit {
        id: Uuid::new_v4(),
        user_id: Some(auth.user_id.clone()),
        role: auth.role.clone(),
        org_id: auth.org_id.clone(),
        deal_id: deal_id.map(str::to_string),
        endpoint: endpoint.to_string(),
        prompt_summary: summarize_prompt(prompt),
        full_prompt: Some(prompt.to_string()),
        full_response: None,
        system_prompt_hash: None,
        model_used: None,
        context_fields: Vec::new(),
        response_length: 0,
        validation_passed: false,
        validation_issues: vec![reason.to_string()],
        security_context: SecurityContext {
            sanitization_applied: security_result.map(|r| r.was_modified).unwrap_or(false),
            jailbreak_score: security_result.map(|r| r.jailbreak_score).unwrap_or(0.0),
            jailbreak_patterns: security_result.map(|r| r.patterns_matched.clone()).unwrap_or_default(),
            output_validation_passed: false,
        },
        created_at: Utc::now(),
    };
    persist(state, audit).await;
}

async fn persist(state: &AppState, audit: AiAudit) {
    if let Err(err) = state.audit_repo.persist(audit).await {
        tracing::error!(error = %err, "ai audit write failed");
    }
}

#[derive(Debug, Error)]
pub enum AuditRepoError {
    #[error("audit repository unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn persist(&self, audit: AiAudit) -> Result<(), AuditRepoError>;
}

#[derive(Default)]
pub struct InMemoryAuditRepository {
    records: Mutex<Vec<AiAudit>>,
}

impl InMemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AiAudit> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn persist(&self, audit: AiAudit) -> Result<(), AuditRepoError> {
        self.records.lock().push(audit);
        Ok(())
    }
}
