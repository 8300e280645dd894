//! LLM deal-parse orchestration, field provenance, and evaluator scoring

pub mod coercion;
pub mod document;
pub mod evaluator;
pub mod oracle;
pub mod orchestrator;
pub mod provenance;
pub mod repository;
pub mod types;

pub use document::build_extraction;
pub use evaluator::{evaluate, EvaluatorReport};
pub use oracle::{LlmOracle, MockLlmOracle, OracleError, OracleRequest, OracleResult};
pub use orchestrator::{OrchestratorError, ParseOrchestrator};
pub use provenance::build_provenance;
pub use repository::{InMemorySessionRepository, SessionRepoError, SessionRepository};
pub use types::*;
