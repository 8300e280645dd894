//! Evaluator: scores a parsed structure on completeness,
//! numeric sanity, and provenance.

use crate::provenance::provenance_flags;
use crate::types::{FieldProvenance, ParsedFields, REQUIRED_FIELDS};
use cre_ai_policy::PolicyConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluatorReport {
    pub schema_completeness: i32,
    pub numeric_consistency: i32,
    pub provenance: i32,
    pub critical_flags: Vec<String>,
}

impl EvaluatorReport {
    /// OK when every sub-score >= `eval_min_score` and `critical_flags` is
    /// empty.
    pub fn passes(&self, eval_min_score: u8) -> bool {
        let min = eval_min_score as i32;
        self.critical_flags.is_empty()
            && self.schema_completeness >= min
            && self.numeric_consistency >= min
            && self.provenance >= min
    }
}

fn field_present(fields: &ParsedFields, name: &str) -> bool {
    match fields.get(name) {
        None => false,
        Some(v) if v.is_null() => false,
        Some(v) => match v.as_text() {
            Some(s) if s.trim().is_empty() => false,
            Some(_) => true,
            None => true,
        },
    }
}

fn numeric(fields: &ParsedFields, name: &str) -> Option<f64> {
    fields.get(name).and_then(|v| v.as_number())
}

/// Compute schemaCompleteness, numericConsistency, and provenance
/// sub-scores plus criticalFlags.
pub fn evaluate(
    fields: &ParsedFields,
    provenance_rows: &[FieldProvenance],
    _config: &PolicyConfig,
) -> EvaluatorReport {
    let mut critical_flags = Vec::new();
    let mut schema_completeness = 100;
    for required in REQUIRED_FIELDS {
        if !field_present(fields, required) {
            schema_completeness -= 25;
            critical_flags.push(format!("missing {required}"));
        }
    }
    schema_completeness = schema_completeness.max(0);

    let mut numeric_flags = 0;
    for (_, value) in fields.iter() {
        if let Some(n) = value.as_number() {
            if n < 0.0 {
                numeric_flags += 1;
            }
        }
    }
    if let Some(cap_rate) = numeric(fields, "cap_rate") {
        if !(0.0..=1.5).contains(&cap_rate) {
            numeric_flags += 1;
        }
    }
    if let Some(ltv) = numeric(fields, "ltv") {
        if !(0.0..=2.0).contains(&ltv) {
            numeric_flags += 1;
        }
    }
    if let (Some(price), Some(ltv), Some(senior), Some(mezz)) = (
        numeric(fields, "purchase_price"),
        numeric(fields, "ltv"),
        numeric(fields, "senior_debt"),
        numeric(fields, "mezzanine_debt"),
    ) {
        if price != 0.0 {
            let debt_ratio = (senior + mezz) / price;
            if (debt_ratio - ltv).abs() > 0.05 {
                numeric_flags += 1;
            }
        }
    }
    let numeric_consistency = (100 - numeric_flags * 15).max(0);

    let provenance_flag_count = provenance_flags(provenance_rows) as i32;
    let provenance = (100 - provenance_flag_count * 20).max(0);

    EvaluatorReport {
        schema_completeness,
        numeric_consistency,
        provenance,
        critical_flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::build_provenance;
    use crate::types::FieldValue;

    #[test]
    fn missing_required_field_flags_critical() {
        let mut fields = ParsedFields::new();
        fields.insert("name".to_string(), FieldValue::Text("Acme Plaza".into()));
        fields.insert("asset_type".to_string(), FieldValue::Text("Office".into()));
        fields.insert("asset_address".to_string(), FieldValue::Null);
        let rows = build_provenance(&fields);
        let report = evaluate(&fields, &rows, &PolicyConfig::default());
        assert_eq!(report.critical_flags, vec!["missing asset_address"]);
        assert!(report.schema_completeness <= 75);
        assert!(!report.passes(70));
    }

    #[test]
    fn unknown_string_counts_as_present() {
        let mut fields = ParsedFields::new();
        fields.insert("name".to_string(), FieldValue::Text("Acme Plaza".into()));
        fields.insert("asset_type".to_string(), FieldValue::Text("UNKNOWN".into()));
        fields.insert("asset_address".to_string(), FieldValue::Text("1 Main St".into()));
        let rows = build_provenance(&fields);
        let report = evaluate(&fields, &rows, &PolicyConfig::default());
        assert_eq!(report.schema_completeness, 100);
    }

    #[test]
    fn ltv_out_of_range_reduces_numeric_score() {
        let mut fields = ParsedFields::new();
        fields.insert("ltv".to_string(), FieldValue::Number(3.0));
        let rows = build_provenance(&fields);
        let report = evaluate(&fields, &rows, &PolicyConfig::default());
        assert_eq!(report.numeric_consistency, 85);
    }

    #[test]
    fn debt_to_price_mismatch_flagged() {
        let mut fields = ParsedFields::new();
        fields.insert("purchase_price".to_string(), FieldValue::Number(1_000_000.0));
        fields.insert("ltv".to_string(), FieldValue::Number(0.5));
        fields.insert("senior_debt".to_string(), FieldValue::Number(800_000.0));
        fields.insert("mezzanine_debt".to_string(), FieldValue::Number(0.0));
        let rows = build_provenance(&fields);
        let report = evaluate(&fields, &rows, &PolicyConfig::default());
        assert_eq!(report.numeric_consistency, 85);
    }
}
