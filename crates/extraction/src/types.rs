//! Parsed-deal data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A single coerced field value: every declared field becomes either a
/// canonical number, a trimmed string, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

pub type ParsedFields = BTreeMap<String, FieldValue>;

/// Required string fields for a deal-parse.
pub const REQUIRED_FIELDS: [&str; 3] = ["name", "asset_type", "asset_address"];

/// Fixed field -> document-type table used to decide `evidenceNeeded`.
pub const EVIDENCE_TABLE: [(&str, &str); 4] = [
    ("purchase_price", "PSA"),
    ("noi", "T12"),
    ("ltv", "Debt Schedule"),
    ("cap_rate", "Appraisal"),
];

pub fn sensitive_numeric_document(field: &str) -> Option<&'static str> {
    EVIDENCE_TABLE
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, doc)| *doc)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Pending,
    Ok,
    EvalFailed,
    ValidationFailed,
    ProviderError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromptVariant {
    Base,
    StrictRepair,
}

/// One per parse attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseSession {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub input_text: String,
    pub input_source: String,
    pub provider: String,
    pub model: String,
    pub prompt_version: String,
    pub schema_version: String,
    pub status: SessionStatus,
    pub attempts: u32,
    pub raw_provider_responses: Vec<String>,
    pub parsed_result: Option<ParsedFields>,
    pub evaluator_report: Option<crate::evaluator::EvaluatorReport>,
    pub latency_ms: u64,
    pub force_accepted: bool,
    pub force_accepted_rationale: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Source of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvenanceSource {
    Ai,
    Doc,
    Human,
}

/// One per (session, fieldPath).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldProvenance {
    pub field_path: String,
    pub value: FieldValue,
    pub source: ProvenanceSource,
    pub confidence: f64,
    pub rationale: String,
    pub evidence_needed: Option<String>,
    pub artifact_id: Option<String>,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionStatus {
    Ok,
    Partial,
    Failed,
}

/// One per (document, extraction attempt).
/// Immutable after write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentExtraction {
    pub document_id: String,
    pub deal_id: String,
    pub extraction_type: String,
    pub extracted_data: BTreeMap<String, ExtractedField>,
    pub overall_confidence: f64,
    pub status: ExtractionStatus,
    pub extracted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedField {
    pub value: FieldValue,
    pub confidence: f64,
    pub source: ProvenanceSource,
}
