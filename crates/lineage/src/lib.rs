//! Append-only per-field data lineage and verification ledger.

pub mod engine;
pub mod types;

pub use engine::{LineageError, LineageLedger, ReviewSuggestion};
pub use types::*;
