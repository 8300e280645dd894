//! ConflictReconciler: cross-reference fields across
//! documents; flag, rank, recommend.

use crate::canonical::normalize_field;
use crate::stats::compute;
use crate::types::{ConflictStatus, ExtractionConflict, FieldObservation, SourceValue};
use chrono::Utc;
use cre_ai_policy::PolicyConfig;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("no open conflict found for deal {deal_id} field {field}")]
    NotFound { deal_id: String, field: String },
    #[error("dismiss requires a reason")]
    ReasonRequired,
}

/// In-memory store enforcing "at most one OPEN conflict per (deal,
/// normalized field)".
#[derive(Default)]
pub struct ConflictStore {
    conflicts: Mutex<HashMap<(String, String), ExtractionConflict>>,
}

impl ConflictStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, deal_id: &str, field: &str) -> Option<ExtractionConflict> {
        self.conflicts.lock().get(&(deal_id.to_string(), field.to_string())).cloned()
    }

    pub fn open_conflicts(&self, deal_id: &str) -> Vec<ExtractionConflict> {
        self.conflicts
            .lock()
            .values()
            .filter(|c| c.deal_id == deal_id && c.status == ConflictStatus::Open)
            .cloned()
            .collect()
    }

    fn upsert(&self, conflict: ExtractionConflict) {
        self.conflicts
            .lock()
            .insert((conflict.deal_id.clone(), conflict.field.clone()), conflict);
    }
}

pub struct ConflictReconciler {
    config: PolicyConfig,
    store: ConflictStore,
}

impl ConflictReconciler {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            store: ConflictStore::new(),
        }
    }

    pub fn store(&self) -> &ConflictStore {
        &self.store
    }

    /// Normalize, cross-reference, score variance, recommend, and persist.
    #[tracing::instrument(skip(self, observations))]
    pub fn reconcile(&self, deal_id: &str, observations: &[FieldObservation]) -> Vec<ExtractionConflict> {
        let mut by_field: BTreeMap<&'static str, BTreeMap<_, _>> = BTreeMap::new();
        for obs in observations {
            let Some(canonical) = normalize_field(&obs.field_name) else {
                continue;
            };
            by_field.entry(canonical).or_default().insert(
                obs.document_type,
                SourceValue {
                    value: obs.value,
                    confidence: obs.confidence,
                    extraction_id: obs.extraction_id.clone(),
                    document_id: obs.document_id.clone(),
                    extracted_at: obs.extracted_at,
                },
            );
        }

        let mut results = Vec::new();
        for (field, sources) in by_field {
            let values: Vec<f64> = sources.values().map(|s| s.value).collect();
            let variance_percent = if values.len() >= 2 {
                compute(&values).variance_percent
            } else {
                None
            };

            let flagged = variance_percent
                .map(|v| v >= self.config.conflict_variance_threshold)
                .unwrap_or(false);

            let (recommended_source, recommended_value, recommended_reason) = if flagged {
                recommend(&sources)
            } else {
                (None, None, None)
            };

            let existing_terminal = self
                .store
                .get(deal_id, field)
                .filter(|c| c.status != ConflictStatus::Open);

            if !flagged && existing_terminal.is_none() {
                continue;
            }

            let conflict = if let Some(terminal) = existing_terminal {
                ExtractionConflict {
                    sources,
                    variance_percent,
                    recommended_source,
                    recommended_value,
                    recommended_reason,
                    ..terminal
                }
            } else {
                ExtractionConflict {
                    deal_id: deal_id.to_string(),
                    field: field.to_string(),
                    sources,
                    variance_percent,
                    recommended_source,
                    recommended_value,
                    recommended_reason,
                    status: ConflictStatus::Open,
                    resolved_value: None,
                    resolved_by: None,
                    resolved_at: None,
                    resolved_reason: None,
                }
            };

            self.store.upsert(conflict.clone());
            if conflict.status == ConflictStatus::Open {
                results.push(conflict);
            }
        }
        results
    }

    pub fn resolve(
        &self,
        deal_id: &str,
        field: &str,
        resolved_value: f64,
        resolved_by: &str,
        reason: Option<String>,
    ) -> Result<ExtractionConflict, ReconcilerError> {
        let mut conflict = self
            .store
            .get(deal_id, field)
            .ok_or_else(|| ReconcilerError::NotFound {
                deal_id: deal_id.to_string(),
                field: field.to_string(),
            })?;
        let fallback_reason = conflict.recommended_reason.clone();
        conflict.status = ConflictStatus::Resolved;
        conflict.resolved_value = Some(resolved_value);
        conflict.resolved_by = Some(resolved_by.to_string());
        conflict.resolved_at = Some(Utc::now());
        conflict.resolved_reason = reason.or(fallback_reason);
        self.store.upsert(conflict.clone());
        Ok(conflict)
    }

    pub fn dismiss(
        &self,
        deal_id: &str,
        field: &str,
        dismissed_by: &str,
        reason: String,
    ) -> Result<ExtractionConflict, ReconcilerError> {
        if reason.trim().is_empty() {
            return Err(ReconcilerError::ReasonRequired);
        }
        let mut conflict = self
            .store
            .get(deal_id, field)
            .ok_or_else(|| ReconcilerError::NotFound {
                deal_id: deal_id.to_string(),
                field: field.to_string(),
            })?;
        conflict.status = ConflictStatus::Dismissed;
        conflict.resolved_by = Some(dismissed_by.to_string());
        conflict.resolved_at = Some(Utc::now());
        conflict.resolved_reason = Some(reason);
        self.store.upsert(conflict.clone());
        Ok(conflict)
    }
}

/// Argmax of `reliabilityRank * confidence`; ties broken by higher
/// reliability then by newer `extractedAt`.
fn recommend(
    sources: &BTreeMap<crate::types::DocumentType, SourceValue>,
) -> (Option<crate::types::DocumentType>, Option<f64>, Option<String>) {
    sources
        .iter()
        .max_by(|(doc_a, val_a), (doc_b, val_b)| {
            let score_a = doc_a.reliability_rank() as f64 * val_a.confidence;
            let score_b = doc_b.reliability_rank() as f64 * val_b.confidence;
            score_a
                .partial_cmp(&score_b)
                .unwrap()
                .then(doc_a.reliability_rank().cmp(&doc_b.reliability_rank()))
                .then(val_a.extracted_at.cmp(&val_b.extracted_at))
        })
        .map(|(doc, val)| {
            let reason = format!(
                "{doc:?} has the highest reliability-weighted confidence ({:.2} x {:.2})",
                doc.reliability_rank(),
                val.confidence
            );
            (Some(*doc), Some(val.value), Some(reason))
        })
        .unwrap_or((None, None, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentType;

    fn observation(doc: DocumentType, field: &str, value: f64, confidence: f64) -> FieldObservation {
        FieldObservation {
            document_type: doc,
            field_name: field.to_string(),
            value,
            confidence,
            extraction_id: format!("{doc:?}-ext"),
            document_id: format!("{doc:?}-doc"),
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn recommends_t12_for_noi_spread() {
        let reconciler = ConflictReconciler::new(PolicyConfig::default());
        let observations = vec![
            observation(DocumentType::RentRoll, "noi", 1_200_000.0, 0.9),
            observation(DocumentType::T12, "noi", 1_080_000.0, 0.95),
        ];
        let conflicts = reconciler.reconcile("deal1", &observations);
        assert_eq!(conflicts.len(), 1);
        let conflict = &conflicts[0];
        assert_eq!(conflict.field, "netOperatingIncome");
        assert_eq!(conflict.recommended_source, Some(DocumentType::T12));
        assert!((conflict.variance_percent.unwrap() - 0.105).abs() < 0.01);
    }

    #[test]
    fn below_threshold_is_not_flagged() {
        let reconciler = ConflictReconciler::new(PolicyConfig::default());
        let observations = vec![
            observation(DocumentType::RentRoll, "noi", 1_000_000.0, 0.9),
            observation(DocumentType::T12, "noi", 1_001_000.0, 0.95),
        ];
        let conflicts = reconciler.reconcile("deal1", &observations);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn resolve_requires_existing_conflict() {
        let reconciler = ConflictReconciler::new(PolicyConfig::default());
        let err = reconciler
            .resolve("deal1", "netOperatingIncome", 1_100_000.0, "analyst1", None)
            .unwrap_err();
        assert!(matches!(err, ReconcilerError::NotFound { .. }));
    }

    #[test]
    fn dismiss_without_reason_fails() {
        let reconciler = ConflictReconciler::new(PolicyConfig::default());
        let observations = vec![
            observation(DocumentType::RentRoll, "noi", 1_200_000.0, 0.9),
            observation(DocumentType::T12, "noi", 1_080_000.0, 0.95),
        ];
        reconciler.reconcile("deal1", &observations);
        let err = reconciler
            .dismiss("deal1", "netOperatingIncome", "analyst1", "".to_string())
            .unwrap_err();
        assert!(matches!(err, ReconcilerError::ReasonRequired));
    }

    #[test]
    fn at_most_one_open_conflict_per_field() {
        let reconciler = ConflictReconciler::new(PolicyConfig::default());
        let observations = vec![
            observation(DocumentType::RentRoll, "noi", 1_200_000.0, 0.9),
            observation(DocumentType::T12, "noi", 1_080_000.0, 0.95),
        ];
        reconciler.reconcile("deal1", &observations);
        reconciler.reconcile("deal1", &observations);
        let open = reconciler.store().open_conflicts("deal1");
        assert_eq!(open.len(), 1);
    }

    #[test]
    fn resolved_conflict_is_preserved_on_rerun() {
        let reconciler = ConflictReconciler::new(PolicyConfig::default());
        let observations = vec![
            observation(DocumentType::RentRoll, "noi", 1_200_000.0, 0.9),
            observation(DocumentType::T12, "noi", 1_080_000.0, 0.95),
        ];
        reconciler.reconcile("deal1", &observations);
        reconciler
            .resolve("deal1", "netOperatingIncome", 1_100_000.0, "analyst1", None)
            .unwrap();
        reconciler.reconcile("deal1", &observations);
        let conflict = reconciler.store().get("deal1", "netOperatingIncome").unwrap();
        assert_eq!(conflict.status, ConflictStatus::Resolved);
    }
}
