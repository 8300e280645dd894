//! Cross-document reconciliation data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    T12,
    RentRoll,
    Appraisal,
    LoanDocuments,
    OperatingMemorandum,
    BrokerAnalysis,
}

impl DocumentType {
    /// Fixed ordinal reliability rank.
    pub fn reliability_rank(&self) -> u8 {
        match self {
            DocumentType::T12 => 5,
            DocumentType::RentRoll => 4,
            DocumentType::Appraisal => 3,
            DocumentType::LoanDocuments => 3,
            DocumentType::OperatingMemorandum => 2,
            DocumentType::BrokerAnalysis => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceValue {
    pub value: f64,
    pub confidence: f64,
    pub extraction_id: String,
    pub document_id: String,
    pub extracted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictStatus {
    Open,
    Resolved,
    Dismissed,
}

/// One per (deal, field) in OPEN status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConflict {
    pub deal_id: String,
    pub field: String,
    pub sources: BTreeMap<DocumentType, SourceValue>,
    pub variance_percent: Option<f64>,
    pub recommended_source: Option<DocumentType>,
    pub recommended_value: Option<f64>,
    pub recommended_reason: Option<String>,
    pub status: ConflictStatus,
    pub resolved_value: Option<f64>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_reason: Option<String>,
}

/// A raw per-document observation before normalization.
#[derive(Debug, Clone)]
pub struct FieldObservation {
    pub document_type: DocumentType,
    pub field_name: String,
    pub value: f64,
    pub confidence: f64,
    pub extraction_id: String,
    pub document_id: String,
    pub extracted_at: DateTime<Utc>,
}
