//! Cross-document conflict detection with reliability-weighted
//! recommendation.

pub mod canonical;
pub mod engine;
pub mod stats;
pub mod types;

pub use canonical::normalize_field;
pub use engine::{ConflictReconciler, ConflictStore, ReconcilerError};
pub use stats::{compute, FieldStats};
pub use types::*;
