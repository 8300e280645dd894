//! AI Safety & Governance Gateway: composes the guard chain (rate limit,
//! consent, security) and dispatches to the extraction/reconciliation/
//! lineage workers.

pub mod audit;
pub mod auth;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod router;
pub mod state;

pub use audit::{AiAudit, AuditRepository, InMemoryAuditRepository};
pub use error::GatewayError;
pub use router::build_router;
pub use state::AppState;
