//! LLM provider abstraction: an opaque request/response oracle with a
//! known transient-failure mode.

use crate::types::PromptVariant;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("llm provider unavailable: {0}")]
    Unavailable(String),
    #[error("llm call timed out after {0}ms")]
    Timeout(u64),
}

pub type OracleResult<T> = Result<T, OracleError>;

#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub input_text: String,
    pub variant: PromptVariant,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// `call(messages, {model, temperature, maxTokens}) -> textResponse`
#[async_trait]
pub trait LlmOracle: Send + Sync {
    async fn call(&self, request: &OracleRequest) -> OracleResult<String>;
    fn provider_name(&self) -> &str;
}

/// Scripted oracle for tests and local development: returns queued
/// responses per variant, or fails when configured to.
pub struct MockLlmOracle {
    provider: String,
    responses: HashMap<&'static str, String>,
    should_fail: bool,
}

impl MockLlmOracle {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            responses: HashMap::new(),
            should_fail: false,
        }
    }

    pub fn with_response(mut self, variant: PromptVariant, body: impl Into<String>) -> Self {
        self.responses.insert(variant_key(variant), body.into());
        self
    }

    pub fn with_failure(mut self, fail: bool) -> Self {
        self.should_fail = fail;
        self
    }
}

fn variant_key(variant: PromptVariant) -> &'static str {
    match variant {
        PromptVariant::Base => "base",
        PromptVariant::StrictRepair => "strict_repair",
    }
}

#[async_trait]
impl LlmOracle for MockLlmOracle {
    async fn call(&self, request: &OracleRequest) -> OracleResult<String> {
        if self.should_fail {
            return Err(OracleError::Unavailable("mock provider offline".into()));
        }
        self.responses
            .get(variant_key(request.variant))
            .cloned()
            .ok_or_else(|| OracleError::Unavailable("no scripted response".into()))
    }

    fn provider_name(&self) -> &str {
        &self.provider
    }
}
