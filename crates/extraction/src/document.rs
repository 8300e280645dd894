//! DocumentExtractor: normalize per-document extractions
//! into a confidence-scored map.

use crate::types::{DocumentExtraction, ExtractedField, ExtractionStatus};
use chrono::Utc;
use std::collections::BTreeMap;

/// Build a `DocumentExtraction` from a raw field map, computing
/// `overallConfidence` as the mean of per-field confidences and deriving
/// status from whether every field carries a value.
pub fn build_extraction(
    document_id: impl Into<String>,
    deal_id: impl Into<String>,
    extraction_type: impl Into<String>,
    fields: BTreeMap<String, ExtractedField>,
) -> DocumentExtraction {
    let overall_confidence = if fields.is_empty() {
        0.0
    } else {
        fields.values().map(|f| f.confidence).sum::<f64>() / fields.len() as f64
    };

    let status = if fields.is_empty() {
        ExtractionStatus::Failed
    } else if fields.values().any(|f| f.value.is_null()) {
        ExtractionStatus::Partial
    } else {
        ExtractionStatus::Ok
    };

    DocumentExtraction {
        document_id: document_id.into(),
        deal_id: deal_id.into(),
        extraction_type: extraction_type.into(),
        extracted_data: fields,
        overall_confidence,
        status,
        extracted_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldValue, ProvenanceSource};

    #[test]
    fn empty_fields_yield_failed_status() {
        let extraction = build_extraction("d1", "deal1", "T12", BTreeMap::new());
        assert_eq!(extraction.status, ExtractionStatus::Failed);
        assert_eq!(extraction.overall_confidence, 0.0);
    }

    #[test]
    fn full_fields_yield_ok_status_and_mean_confidence() {
        let mut fields = BTreeMap::new();
        fields.insert(
            "noi".to_string(),
            ExtractedField {
                value: FieldValue::Number(1_200_000.0),
                confidence: 0.9,
                source: ProvenanceSource::Doc,
            },
        );
        fields.insert(
            "asset_type".to_string(),
            ExtractedField {
                value: FieldValue::Text("Multifamily".into()),
                confidence: 0.7,
                source: ProvenanceSource::Doc,
            },
        );
        let extraction = build_extraction("d1", "deal1", "T12", fields);
        assert_eq!(extraction.status, ExtractionStatus::Ok);
        assert!((extraction.overall_confidence - 0.8).abs() < 1e-9);
    }
}
