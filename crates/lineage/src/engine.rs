//! LineageLedger: append-only per-field history,
//! verification status machine, prioritized review queue.

use crate::types::{DataLineage, HistoryEntry, SourceType, TrackInput, VerificationStatus, HISTORY_CAP};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LineageError {
    #[error("no lineage record for deal {deal_id} model {model_id} field {field}")]
    NotFound {
        deal_id: String,
        model_id: String,
        field: String,
    },
}

type Key = (String, String, String);

/// Prioritized field list, highest priority first.
const PRIORITIZED_FIELDS: [&str; 10] = [
    "purchasePrice",
    "netOperatingIncome",
    "capRate",
    "grossPotentialRent",
    "effectiveGrossIncome",
    "vacancyRate",
    "operatingExpenses",
    "debtService",
    "cashOnCash",
    "irr",
];

fn priority_bonus(field: &str) -> f64 {
    PRIORITIZED_FIELDS
        .iter()
        .position(|f| *f == field)
        .map(|index| (PRIORITIZED_FIELDS.len() - index) as f64 * 10.0)
        .unwrap_or(0.0)
}

#[derive(Debug, Clone)]
pub struct ReviewSuggestion {
    pub deal_id: String,
    pub model_id: String,
    pub field: String,
    pub score: f64,
    pub reason: String,
}

#[derive(Default)]
pub struct LineageLedger {
    records: Mutex<HashMap<Key, DataLineage>>,
}

impl LineageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, deal_id: &str, model_id: &str, field: &str) -> Option<DataLineage> {
        self.records
            .lock()
            .get(&(deal_id.to_string(), model_id.to_string(), field.to_string()))
            .cloned()
    }

    /// Compute initial verification status, push history on value change,
    /// demote HUMAN_VERIFIED rows to NEEDS_REVIEW.
    #[tracing::instrument(skip(self, input))]
    pub fn track(&self, deal_id: &str, model_id: &str, field: &str, input: TrackInput) -> DataLineage {
        let now = Utc::now();
        let key = (deal_id.to_string(), model_id.to_string(), field.to_string());
        let mut guard = self.records.lock();
        let existing = guard.get(&key).cloned();

        let mut computed_status = match input.source_type {
            SourceType::AiExtracted => VerificationStatus::AiExtracted,
            SourceType::Manual => VerificationStatus::NeedsReview,
            _ => VerificationStatus::Unverified,
        };

        let mut history = existing.as_ref().map(|r| r.history.clone()).unwrap_or_default();
        if let Some(prev) = &existing {
            if prev.current_value != input.value {
                history.insert(
                    0,
                    HistoryEntry {
                        prev_value: prev.current_value,
                        prev_updated_at: prev.updated_at,
                        prev_source_type: prev.source_type,
                        prev_verification_status: prev.verification_status,
                    },
                );
                history.truncate(HISTORY_CAP);
                if prev.verification_status == VerificationStatus::HumanVerified {
                    computed_status = VerificationStatus::NeedsReview;
                }
            } else {
                computed_status = prev.verification_status;
            }
        }

        let record = DataLineage {
            deal_id: deal_id.to_string(),
            model_id: model_id.to_string(),
            field: field.to_string(),
            current_value: input.value,
            source_type: input.source_type,
            source_doc_id: input.source_doc_id,
            source_field: input.source_field,
            extracted_at: matches!(input.source_type, SourceType::AiExtracted | SourceType::Document)
                .then_some(now),
            extraction_confidence: input.extraction_confidence,
            verification_status: computed_status,
            verified_by: existing.as_ref().and_then(|r| r.verified_by.clone()),
            verified_at: existing.as_ref().and_then(|r| r.verified_at),
            verification_notes: existing.as_ref().and_then(|r| r.verification_notes.clone()),
            updated_at: now,
            history,
        };
        guard.insert(key, record.clone());
        record
    }

    pub fn verify(
        &self,
        deal_id: &str,
        model_id: &str,
        field: &str,
        verifier_id: &str,
        notes: Option<String>,
    ) -> Result<DataLineage, LineageError> {
        let key = (deal_id.to_string(), model_id.to_string(), field.to_string());
        let mut guard = self.records.lock();
        let record = guard.get_mut(&key).ok_or_else(|| LineageError::NotFound {
            deal_id: deal_id.to_string(),
            model_id: model_id.to_string(),
            field: field.to_string(),
        })?;
        record.verification_status = VerificationStatus::HumanVerified;
        record.verified_by = Some(verifier_id.to_string());
        record.verified_at = Some(Utc::now());
        record.verification_notes = notes;
        Ok(record.clone())
    }

    /// Score unverified/needs-review/ai-extracted rows and return the top
    /// `limit`.
    pub fn suggest_next(&self, deal_id: &str, model_id: &str, limit: usize) -> Vec<ReviewSuggestion> {
        let guard = self.records.lock();
        let mut scored: Vec<ReviewSuggestion> = guard
            .values()
            .filter(|r| r.deal_id == deal_id && r.model_id == model_id)
            .filter(|r| r.verification_status != VerificationStatus::HumanVerified)
            .map(|r| {
                let confidence = r.extraction_confidence.unwrap_or(0.0);
                let age_days = (Utc::now() - r.updated_at).num_days().max(0) as f64;
                let needs_review_bonus = if r.verification_status == VerificationStatus::NeedsReview {
                    30.0
                } else {
                    0.0
                };
                let score = priority_bonus(&r.field)
                    + (1.0 - confidence) * 50.0
                    + needs_review_bonus
                    + (age_days * 2.0).min(20.0);
                let reason = format!(
                    "confidence {confidence:.2}, status {:?}, age {age_days:.0}d",
                    r.verification_status
                );
                ReviewSuggestion {
                    deal_id: r.deal_id.clone(),
                    model_id: r.model_id.clone(),
                    field: r.field.clone(),
                    score,
                    reason,
                }
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        scored.truncate(limit);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_demotes_on_value_change() {
        let ledger = LineageLedger::new();
        ledger.track(
            "deal1",
            "model1",
            "capRate",
            TrackInput {
                value: 100.0,
                source_type: SourceType::Manual,
                source_doc_id: None,
                source_field: None,
                extraction_confidence: None,
            },
        );
        let verified = ledger.verify("deal1", "model1", "capRate", "reviewer1", None).unwrap();
        assert_eq!(verified.verification_status, VerificationStatus::HumanVerified);

        let tracked_again = ledger.track(
            "deal1",
            "model1",
            "capRate",
            TrackInput {
                value: 110.0,
                source_type: SourceType::Manual,
                source_doc_id: None,
                source_field: None,
                extraction_confidence: None,
            },
        );
        assert_eq!(tracked_again.verification_status, VerificationStatus::NeedsReview);
        assert_eq!(tracked_again.history[0].prev_value, 100.0);
    }

    #[test]
    fn same_value_retrack_does_not_push_history() {
        let ledger = LineageLedger::new();
        let input = || TrackInput {
            value: 50.0,
            source_type: SourceType::AiExtracted,
            source_doc_id: None,
            source_field: None,
            extraction_confidence: Some(0.8),
        };
        ledger.track("deal1", "model1", "noi", input());
        let second = ledger.track("deal1", "model1", "noi", input());
        assert!(second.history.is_empty());
    }

    #[test]
    fn history_is_bounded_to_ten() {
        let ledger = LineageLedger::new();
        for i in 0..15 {
            ledger.track(
                "deal1",
                "model1",
                "noi",
                TrackInput {
                    value: i as f64,
                    source_type: SourceType::AiExtracted,
                    source_doc_id: None,
                    source_field: None,
                    extraction_confidence: Some(0.5),
                },
            );
        }
        let record = ledger.get("deal1", "model1", "noi").unwrap();
        assert_eq!(record.history.len(), HISTORY_CAP);
        assert_eq!(record.current_value, 14.0);
    }

    #[test]
    fn verify_requires_existing_record() {
        let ledger = LineageLedger::new();
        let err = ledger.verify("deal1", "model1", "noi", "reviewer1", None).unwrap_err();
        assert!(matches!(err, LineageError::NotFound { .. }));
    }

    #[test]
    fn suggest_next_prioritizes_low_confidence_and_needs_review() {
        let ledger = LineageLedger::new();
        ledger.track(
            "deal1",
            "model1",
            "purchasePrice",
            TrackInput {
                value: 1.0,
                source_type: SourceType::AiExtracted,
                source_doc_id: None,
                source_field: None,
                extraction_confidence: Some(0.2),
            },
        );
        ledger.track(
            "deal1",
            "model1",
            "irr",
            TrackInput {
                value: 1.0,
                source_type: SourceType::AiExtracted,
                source_doc_id: None,
                source_field: None,
                extraction_confidence: Some(0.95),
            },
        );
        let suggestions = ledger.suggest_next("deal1", "model1", 5);
        assert_eq!(suggestions[0].field, "purchasePrice");
    }
}
