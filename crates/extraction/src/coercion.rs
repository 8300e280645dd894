//! Schema-driven coercer: every declared field
//! becomes a canonical numeric or trimmed-string value; missing or
//! non-finite becomes null.

use crate::types::{FieldValue, ParsedFields};
use serde_json::Value;

pub const DECLARED_FIELDS: [&str; 9] = [
    "name",
    "asset_type",
    "asset_address",
    "purchase_price",
    "noi",
    "ltv",
    "cap_rate",
    "senior_debt",
    "mezzanine_debt",
];

/// Returns `None` when `raw` is not a JSON object -- treated as a
/// validation failure upstream.
pub fn normalize(raw: &str) -> Option<ParsedFields> {
    let parsed: Value = serde_json::from_str(raw).ok()?;
    let object = parsed.as_object()?;

    let mut fields = ParsedFields::new();
    for field in DECLARED_FIELDS {
        let value = object.get(field).map(coerce).unwrap_or(FieldValue::Null);
        fields.insert(field.to_string(), value);
    }
    Some(fields)
}

fn coerce(value: &Value) -> FieldValue {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() => FieldValue::Number(f),
            _ => FieldValue::Null,
        },
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                FieldValue::Null
            } else {
                FieldValue::Text(trimmed.to_string())
            }
        }
        _ => FieldValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_strings_and_coerces_numbers() {
        let fields = normalize(r#"{"name": "  Acme Plaza  ", "purchase_price": 1000000}"#).unwrap();
        assert_eq!(fields["name"].as_text(), Some("Acme Plaza"));
        assert_eq!(fields["purchase_price"].as_number(), Some(1_000_000.0));
        assert!(fields["ltv"].is_null());
    }

    #[test]
    fn non_finite_number_becomes_null() {
        let fields = normalize(r#"{"ltv": "NaN is not a json number so this is text instead"}"#).unwrap();
        assert!(matches!(fields["ltv"], FieldValue::Text(_)));
    }

    #[test]
    fn non_object_input_is_rejected() {
        assert!(normalize("not json").is_none());
        assert!(normalize("[1,2,3]").is_none());
    }
}
