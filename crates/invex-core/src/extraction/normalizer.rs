//! Mapping of raw extraction keys onto schema fields.

use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{ExtractionSchema, NormalizedRecord};

/// Map a raw extraction onto the schema.
///
/// Keys are resolved in input order: a schema field name maps to itself, an
/// alias maps to its canonical field, anything else is dropped. When several
/// keys resolve to the same field the last one wins.
pub fn normalize(raw: &Map<String, Value>, schema: &ExtractionSchema) -> NormalizedRecord {
    let mut record = NormalizedRecord::empty(schema);

    for (key, value) in raw {
        match schema.resolve(key) {
            Some(field) => {
                record.set(field, value.clone());
            }
            None => debug!("Dropping key '{}' not in schema '{}'", key, schema.name()),
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> ExtractionSchema {
        ExtractionSchema::builder("test")
            .fields(["Invoice#", "Date", "Quantity (pcs)"])
            .synonym("Invoice No", "Invoice#")
            .synonym("Qty", "Quantity (pcs)")
            .build()
            .unwrap()
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_empty_input_is_all_null() {
        let schema = schema();
        let record = normalize(&Map::new(), &schema);
        assert_eq!(
            record.keys().collect::<Vec<_>>(),
            vec!["Invoice#", "Date", "Quantity (pcs)"]
        );
        assert!(record.is_degraded());
    }

    #[test]
    fn test_key_set_is_schema_fields() {
        let schema = schema();
        let raw = object(json!({
            "Vendor": "ACME",
            "Date": "2024-01-01",
            "random": [1, 2, 3],
            "": null
        }));
        let record = normalize(&raw, &schema);
        assert_eq!(
            record.keys().collect::<Vec<_>>(),
            vec!["Invoice#", "Date", "Quantity (pcs)"]
        );
        assert_eq!(record.get("Date"), Some(&json!("2024-01-01")));
        assert_eq!(record.filled_count(), 1);
    }

    #[test]
    fn test_alias_sets_canonical_field() {
        let schema = schema();
        let record = normalize(&object(json!({"Invoice No": "INV-001"})), &schema);
        assert_eq!(record.get("Invoice#"), Some(&json!("INV-001")));
        assert_eq!(record.get("Invoice No"), None);
    }

    #[test]
    fn test_last_write_wins_in_input_order() {
        let schema = schema();

        let record = normalize(&object(json!({"Quantity (pcs)": 2, "Qty": 5})), &schema);
        assert_eq!(record.get("Quantity (pcs)"), Some(&json!(5)));

        let record = normalize(&object(json!({"Qty": 5, "Quantity (pcs)": 2})), &schema);
        assert_eq!(record.get("Quantity (pcs)"), Some(&json!(2)));
    }

    #[test]
    fn test_values_are_kept_verbatim() {
        let schema = schema();
        let record = normalize(
            &object(json!({"Date": {"day": 1}, "Qty": null})),
            &schema,
        );
        assert_eq!(record.get("Date"), Some(&json!({"day": 1})));
        assert_eq!(record.get("Quantity (pcs)"), Some(&Value::Null));
    }

    #[test]
    fn test_builtin_annexure7_synonyms() {
        let schema = ExtractionSchema::builtin("annexure7").unwrap();
        let raw = object(json!({"Bill of Entry No": "1234567", "CIF Value": "5000", "Duty": "10"}));
        let record = normalize(&raw, &schema);
        assert_eq!(record.len(), schema.fields().len());
        assert_eq!(record.filled_count(), 2);
    }
}
