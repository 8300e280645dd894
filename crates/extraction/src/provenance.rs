//! ProvenanceBuilder: tag each extracted field with source,
//! confidence, evidence-need.

use crate::types::{sensitive_numeric_document, FieldProvenance, ParsedFields, ProvenanceSource};
use chrono::Utc;

/// Build a `FieldProvenance` row per declared field.
/// Default `source=AI`, `confidence = 0 if null else 0.6`, a fixed
/// rationale, and `evidenceNeeded` set for sensitive numeric fields when
/// `source != DOC`.
pub fn build_provenance(fields: &ParsedFields) -> Vec<FieldProvenance> {
    let now = Utc::now();
    fields
        .iter()
        .map(|(path, value)| {
            let confidence = if value.is_null() { 0.0 } else { 0.6 };
            let evidence_needed = sensitive_numeric_document(path).map(|doc| doc.to_string());
            FieldProvenance {
                field_path: path.clone(),
                value: value.clone(),
                source: ProvenanceSource::Ai,
                confidence,
                rationale: "Extracted from input text".to_string(),
                evidence_needed,
                artifact_id: None,
                as_of: now,
            }
        })
        .collect()
}

/// True when a sensitive-numeric provenance row is missing required
/// evidence metadata (used by the Evaluator's provenance sub-score).
pub fn provenance_flags(rows: &[FieldProvenance]) -> usize {
    rows.iter()
        .filter(|row| sensitive_numeric_document(&row.field_path).is_some())
        .filter(|row| row.source != ProvenanceSource::Doc)
        .filter(|row| row.evidence_needed.is_none())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;

    #[test]
    fn sensitive_field_gets_evidence_needed() {
        let mut fields = ParsedFields::new();
        fields.insert("noi".to_string(), FieldValue::Number(1_000_000.0));
        let rows = build_provenance(&fields);
        assert_eq!(rows[0].evidence_needed.as_deref(), Some("T12"));
        assert_eq!(rows[0].confidence, 0.6);
    }

    #[test]
    fn null_value_has_zero_confidence() {
        let mut fields = ParsedFields::new();
        fields.insert("asset_type".to_string(), FieldValue::Null);
        let rows = build_provenance(&fields);
        assert_eq!(rows[0].confidence, 0.0);
        assert!(rows[0].evidence_needed.is_none());
    }
}
