//! ParseOrchestrator: drives the LLM with retry-on-
//! validation-fail; records session + provenance.

use crate::coercion::{normalize, DECLARED_FIELDS};
use crate::evaluator::{self, EvaluatorReport};
use crate::oracle::{LlmOracle, OracleRequest};
use crate::provenance::build_provenance;
use crate::repository::SessionRepository;
use crate::types::{FieldValue, ParseSession, ParsedFields, PromptVariant, SessionStatus};
use cre_ai_policy::PolicyConfig;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("llm provider unavailable")]
    ProviderUnavailable,
    #[error("persistence failed: {0}")]
    Persistence(#[from] crate::repository::SessionRepoError),
}

pub struct ParseOrchestrator {
    oracle: Arc<dyn LlmOracle>,
    repository: Arc<dyn SessionRepository>,
    config: PolicyConfig,
    schema_version: String,
    prompt_version: String,
}

impl ParseOrchestrator {
    pub fn new(
        oracle: Arc<dyn LlmOracle>,
        repository: Arc<dyn SessionRepository>,
        config: PolicyConfig,
    ) -> Self {
        Self {
            oracle,
            repository,
            config,
            schema_version: "1".to_string(),
            prompt_version: "1".to_string(),
        }
    }

    #[tracing::instrument(skip(self, input_text))]
    pub async fn parse(
        &self,
        user_id: Option<&str>,
        input_text: &str,
        input_source: &str,
    ) -> Result<ParseSession, OrchestratorError> {
        let start = Instant::now();
        let id = Uuid::new_v4();
        let mut raw_responses = Vec::new();

        let base_request = OracleRequest {
            input_text: input_text.to_string(),
            variant: PromptVariant::Base,
            model: "default".to_string(),
            temperature: 0.0,
            max_tokens: 2048,
        };

        let raw = match self.oracle.call(&base_request).await {
            Ok(raw) => raw,
            Err(_) => {
                return Ok(self.provider_error_session(id, user_id, input_text, input_source, start));
            }
        };
        raw_responses.push(raw.clone());
        let mut attempts = 1;
        let mut fields = normalize(&raw);

        if fields.is_none() {
            let repair_request = OracleRequest {
                variant: PromptVariant::StrictRepair,
                ..base_request
            };
            match self.oracle.call(&repair_request).await {
                Ok(raw2) => {
                    raw_responses.push(raw2.clone());
                    attempts = 2;
                    fields = normalize(&raw2);
                }
                Err(_) => {
                    return Ok(self.provider_error_session(id, user_id, input_text, input_source, start));
                }
            }
        }

        let (status, parsed, report) = match fields {
            Some(parsed) => {
                let provenance = build_provenance(&parsed);
                let report = evaluator::evaluate(&parsed, &provenance, &self.config);
                let status = if report.passes(self.config.eval_min_score) {
                    SessionStatus::Ok
                } else {
                    SessionStatus::EvalFailed
                };
                (status, Some(parsed), Some((report, provenance)))
            }
            None => {
                let empty = empty_fields();
                let provenance = build_provenance(&empty);
                let report = evaluator::evaluate(&empty, &provenance, &self.config);
                (SessionStatus::ValidationFailed, Some(empty), Some((report, provenance)))
            }
        };

        let (evaluator_report, provenance): (Option<EvaluatorReport>, Vec<_>) = match report {
            Some((report, provenance)) => (Some(report), provenance),
            None => (None, Vec::new()),
        };

        let session = ParseSession {
            id,
            user_id: user_id.map(str::to_string),
            input_text: input_text.to_string(),
            input_source: input_source.to_string(),
            provider: self.oracle.provider_name().to_string(),
            model: "default".to_string(),
            prompt_version: self.prompt_version.clone(),
            schema_version: self.schema_version.clone(),
            status,
            attempts,
            raw_provider_responses: raw_responses,
            parsed_result: parsed,
            evaluator_report,
            latency_ms: start.elapsed().as_millis() as u64,
            force_accepted: false,
            force_accepted_rationale: None,
            completed_at: Some(chrono::Utc::now()),
        };

        Ok(self.repository.persist(session, provenance).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn force_accept(
        &self,
        session_id: Uuid,
        rationale: String,
    ) -> Result<ParseSession, OrchestratorError> {
        Ok(self.repository.force_accept(session_id, rationale).await?)
    }

    fn provider_error_session(
        &self,
        id: Uuid,
        user_id: Option<&str>,
        input_text: &str,
        input_source: &str,
        start: Instant,
    ) -> ParseSession {
        ParseSession {
            id,
            user_id: user_id.map(str::to_string),
            input_text: input_text.to_string(),
            input_source: input_source.to_string(),
            provider: self.oracle.provider_name().to_string(),
            model: "default".to_string(),
            prompt_version: self.prompt_version.clone(),
            schema_version: self.schema_version.clone(),
            status: SessionStatus::ProviderError,
            attempts: 0,
            raw_provider_responses: Vec::new(),
            parsed_result: None,
            evaluator_report: None,
            latency_ms: start.elapsed().as_millis() as u64,
            force_accepted: false,
            force_accepted_rationale: None,
            completed_at: Some(chrono::Utc::now()),
        }
    }
}

fn empty_fields() -> ParsedFields {
    DECLARED_FIELDS
        .iter()
        .map(|f| (f.to_string(), FieldValue::Null))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockLlmOracle;
    use crate::repository::InMemorySessionRepository;

    fn valid_deal_json() -> &'static str {
        r#"{"name":"Acme Plaza","asset_type":"Office","asset_address":"1 Main St","purchase_price":1000000,"noi":80000,"ltv":0.6,"cap_rate":0.08,"senior_debt":600000,"mezzanine_debt":0}"#
    }

    #[tokio::test]
    async fn successful_parse_yields_ok_status() {
        let oracle = Arc::new(MockLlmOracle::new("test").with_response(PromptVariant::Base, valid_deal_json()));
        let repo = Arc::new(InMemorySessionRepository::new());
        let orchestrator = ParseOrchestrator::new(oracle, repo, PolicyConfig::default());
        let session = orchestrator.parse(Some("u1"), "some input", "chat").await.unwrap();
        assert_eq!(session.status, SessionStatus::Ok);
        assert_eq!(session.attempts, 1);
    }

    #[tokio::test]
    async fn missing_required_field_yields_eval_failed() {
        let body = r#"{"name":"Acme Plaza","asset_type":"Office"}"#;
        let oracle = Arc::new(MockLlmOracle::new("test").with_response(PromptVariant::Base, body));
        let repo = Arc::new(InMemorySessionRepository::new());
        let orchestrator = ParseOrchestrator::new(oracle, repo, PolicyConfig::default());
        let session = orchestrator.parse(Some("u1"), "some input", "chat").await.unwrap();
        assert_eq!(session.status, SessionStatus::EvalFailed);
        assert!(session
            .evaluator_report
            .unwrap()
            .critical_flags
            .contains(&"missing asset_address".to_string()));
    }

    #[tokio::test]
    async fn invalid_base_triggers_repair_attempt() {
        let oracle = Arc::new(
            MockLlmOracle::new("test")
                .with_response(PromptVariant::Base, "not json")
                .with_response(PromptVariant::StrictRepair, valid_deal_json()),
        );
        let repo = Arc::new(InMemorySessionRepository::new());
        let orchestrator = ParseOrchestrator::new(oracle, repo, PolicyConfig::default());
        let session = orchestrator.parse(Some("u1"), "some input", "chat").await.unwrap();
        assert_eq!(session.attempts, 2);
        assert_eq!(session.status, SessionStatus::Ok);
    }

    #[tokio::test]
    async fn repair_still_invalid_yields_validation_failed() {
        let oracle = Arc::new(
            MockLlmOracle::new("test")
                .with_response(PromptVariant::Base, "not json")
                .with_response(PromptVariant::StrictRepair, "still not json"),
        );
        let repo = Arc::new(InMemorySessionRepository::new());
        let orchestrator = ParseOrchestrator::new(oracle, repo, PolicyConfig::default());
        let session = orchestrator.parse(Some("u1"), "some input", "chat").await.unwrap();
        assert_eq!(session.status, SessionStatus::ValidationFailed);
        assert!(session.evaluator_report.is_some());
    }

    #[tokio::test]
    async fn provider_failure_yields_provider_error() {
        let oracle = Arc::new(MockLlmOracle::new("test").with_failure(true));
        let repo = Arc::new(InMemorySessionRepository::new());
        let orchestrator = ParseOrchestrator::new(oracle, repo, PolicyConfig::default());
        let session = orchestrator.parse(Some("u1"), "some input", "chat").await.unwrap();
        assert_eq!(session.status, SessionStatus::ProviderError);
    }

    #[tokio::test]
    async fn force_accept_flips_eval_failed_to_ok() {
        let body = r#"{"name":"Acme Plaza","asset_type":"Office"}"#;
        let oracle = Arc::new(MockLlmOracle::new("test").with_response(PromptVariant::Base, body));
        let repo = Arc::new(InMemorySessionRepository::new());
        let orchestrator = ParseOrchestrator::new(oracle, repo, PolicyConfig::default());
        let session = orchestrator.parse(Some("u1"), "some input", "chat").await.unwrap();
        assert_eq!(session.status, SessionStatus::EvalFailed);

        let forced = orchestrator
            .force_accept(session.id, "manually reviewed".to_string())
            .await
            .unwrap();
        assert_eq!(forced.status, SessionStatus::Ok);
        assert!(forced.force_accepted);
    }
}
