//! The contract boundary between raw JSON fact tables and typed records.
//!
//! Shape violations (a table that is not an array, a row that is not an
//! object) fail fast. Values inside a row never fail: unusable values are
//! simply not carried into the record.

use crate::normalize::try_number;
use core_types::{fields, CoreError, Dataset, Family, ObservationRecord};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Converts a JSON array of row objects into observation records.
pub fn records_from_json(
    value: &Value,
    source_name: &str,
) -> Result<Vec<ObservationRecord>, CoreError> {
    let rows = value
        .as_array()
        .ok_or_else(|| CoreError::NotAnArray(source_name.to_string(), json_kind(value).to_string()))?;

    rows.iter()
        .enumerate()
        .map(|(index, row)| match row.as_object() {
            Some(object) => Ok(record_from_object(object)),
            None => Err(CoreError::NotAnObject {
                source_name: source_name.to_string(),
                index,
                found: json_kind(row).to_string(),
            }),
        })
        .collect()
}

/// Converts one row object into a record.
///
/// Key fields are taken from the first alias present with a usable value.
/// Every remaining field becomes a numeric field when it coerces to a number,
/// a label when it is other text, and is dropped otherwise.
pub fn record_from_object(object: &Map<String, Value>) -> ObservationRecord {
    let mut consumed: HashSet<&str> = HashSet::new();
    let mut take_key = |aliases: &[&'static str]| -> Option<String> {
        aliases.iter().find_map(|alias| {
            let text = object.get(*alias).and_then(key_text)?;
            consumed.insert(*alias);
            Some(text)
        })
    };

    let mut record = ObservationRecord {
        subject_id: take_key(fields::SUBJECT_ID_ALIASES),
        subject_name: take_key(fields::SUBJECT_NAME_ALIASES),
        location: take_key(fields::LOCATION_ALIASES),
        date: take_key(fields::DATE_ALIASES),
        season: take_key(fields::SEASON_ALIASES),
        ..ObservationRecord::default()
    };

    for (name, value) in object {
        if consumed.contains(name.as_str()) {
            continue;
        }
        if let Some(number) = try_number(value) {
            record.numeric_fields.insert(name.clone(), number);
        } else if let Value::String(text) = value {
            if !text.trim().is_empty() {
                record.labels.insert(name.clone(), text.trim().to_string());
            }
        }
    }

    record
}

/// Converts a dataset document (`{"production": [...], "prices": [...], ...}`).
///
/// Absent family keys yield empty tables. A family key that is present must
/// hold an array. Unrecognised top-level keys are ignored.
pub fn dataset_from_json(value: &Value) -> Result<Dataset, CoreError> {
    let object = value
        .as_object()
        .ok_or_else(|| CoreError::InvalidDataset(json_kind(value).to_string()))?;

    let mut dataset = Dataset::default();
    for family in Family::ALL {
        if let Some(table) = object.get(family.key()) {
            *dataset.records_mut(family) = records_from_json(table, family.key())?;
        }
    }

    let ignored: Vec<&str> = object
        .keys()
        .map(String::as_str)
        .filter(|key| Family::ALL.iter().all(|family| family.key() != *key))
        .collect();
    if !ignored.is_empty() {
        tracing::debug!(?ignored, "Ignoring unrecognised dataset keys.");
    }

    Ok(dataset)
}

fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn reads_key_fields_from_aliases() {
        let records = records_from_json(
            &json!([{
                "product_id": 7,
                "product_name": "Rice",
                "district": "Dhaka",
                "price_date": "2024-02-01",
                "season": "Rabi",
                "wholesale_price": "40",
                "retail_price": 45
            }]),
            "prices",
        )
        .expect("array of objects");

        let record = &records[0];
        assert_eq!(record.subject_id.as_deref(), Some("7"));
        assert_eq!(record.subject_name.as_deref(), Some("Rice"));
        assert_eq!(record.location.as_deref(), Some("Dhaka"));
        assert_eq!(record.date.as_deref(), Some("2024-02-01"));
        assert_eq!(record.season.as_deref(), Some("Rabi"));
        assert_eq!(record.field("wholesale_price"), Some(dec!(40)));
        assert_eq!(record.field("retail_price"), Some(dec!(45)));
        assert_eq!(record.field("product_id"), None);
    }

    #[test]
    fn splits_remaining_fields_into_numbers_and_labels() {
        let records = records_from_json(
            &json!([{
                "demographic_group": "Rural Children",
                "per_capita_intake": "1,250",
                "humidity": null,
                "notes": "   ",
                "verified": true
            }]),
            "consumption",
        )
        .expect("array of objects");

        let record = &records[0];
        assert_eq!(record.field("per_capita_intake"), Some(dec!(1250)));
        assert_eq!(record.text("demographic_group").as_deref(), Some("Rural Children"));
        assert!(record.field("humidity").is_none());
        assert!(record.labels.get("notes").is_none());
        assert!(record.labels.get("verified").is_none());
    }

    #[test]
    fn non_array_input_fails_fast() {
        let err = records_from_json(&json!({"rows": []}), "production").unwrap_err();
        assert_eq!(
            err,
            CoreError::NotAnArray("production".to_string(), "an object".to_string())
        );
    }

    #[test]
    fn non_object_row_fails_fast() {
        let err = records_from_json(&json!([{"a": 1}, 5]), "weather").unwrap_err();
        assert!(matches!(err, CoreError::NotAnObject { index: 1, .. }));
    }

    #[test]
    fn dataset_reads_present_families_only() {
        let dataset = dataset_from_json(&json!({
            "production": [{"district": "Dhaka", "quantity_produced": 5000}],
            "nutrition": [],
            "generated_at": "2024-06-01"
        }))
        .expect("valid dataset");

        assert_eq!(dataset.production.len(), 1);
        assert!(dataset.prices.is_empty());
        assert!(dataset.nutrition.is_empty());
    }

    #[test]
    fn dataset_with_non_array_family_is_rejected() {
        let err = dataset_from_json(&json!({"prices": "oops"})).unwrap_err();
        assert!(matches!(err, CoreError::NotAnArray(ref name, _) if name == "prices"));
        assert!(dataset_from_json(&json!([])).is_err());
    }
}
