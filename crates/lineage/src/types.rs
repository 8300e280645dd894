//! Data-lineage data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    Manual,
    Document,
    Formula,
    AiExtracted,
    Imported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Unverified,
    AiExtracted,
    HumanVerified,
    NeedsReview,
}

pub const HISTORY_CAP: usize = 10;

/// One past value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub prev_value: f64,
    pub prev_updated_at: DateTime<Utc>,
    pub prev_source_type: SourceType,
    pub prev_verification_status: VerificationStatus,
}

/// One per (dealId, modelId, field).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLineage {
    pub deal_id: String,
    pub model_id: String,
    pub field: String,
    pub current_value: f64,
    pub source_type: SourceType,
    pub source_doc_id: Option<String>,
    pub source_field: Option<String>,
    pub extracted_at: Option<DateTime<Utc>>,
    pub extraction_confidence: Option<f64>,
    pub verification_status: VerificationStatus,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_notes: Option<String>,
    pub updated_at: DateTime<Utc>,
    /// Most recent first, bounded to `HISTORY_CAP`.
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone)]
pub struct TrackInput {
    pub value: f64,
    pub source_type: SourceType,
    pub source_doc_id: Option<String>,
    pub source_field: Option<String>,
    pub extraction_confidence: Option<f64>,
}
