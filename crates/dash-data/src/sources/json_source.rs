//! JSON record tables

use dash_core::{Row, TabularResult, Value};
use indexmap::IndexSet;
use serde_json::Value as JsonValue;

use crate::DataError;

/// Parse an array of objects, or an object with a `data` array of objects
///
/// Headers are the union of keys in first-seen order; a record without a
/// key gets `Null` there.
pub fn parse_json_table(bytes: &[u8]) -> Result<TabularResult, DataError> {
    let doc: JsonValue =
        serde_json::from_slice(bytes).map_err(|e| DataError::InvalidJson(e.to_string()))?;

    let records = match &doc {
        JsonValue::Array(items) => items,
        JsonValue::Object(map) => match map.get("data") {
            Some(JsonValue::Array(items)) => items,
            _ => {
                return Err(DataError::InvalidJson(
                    "object has no \"data\" array".to_string(),
                ))
            }
        },
        _ => {
            return Err(DataError::InvalidJson(
                "expected an array of records".to_string(),
            ))
        }
    };

    let mut objects = Vec::with_capacity(records.len());
    let mut headers: IndexSet<String> = IndexSet::new();
    for (idx, record) in records.iter().enumerate() {
        let object = record
            .as_object()
            .ok_or_else(|| DataError::InvalidJson(format!("record {} is not an object", idx)))?;
        headers.extend(object.keys().cloned());
        objects.push(object);
    }

    let headers: Vec<String> = headers.into_iter().collect();
    let rows = objects
        .into_iter()
        .map(|object| {
            headers
                .iter()
                .map(|h| (h.clone(), object.get(h).map(Value::from).unwrap_or(Value::Null)))
                .collect::<Row>()
        })
        .collect();

    Ok(TabularResult::from_rows(headers, rows)?)
}
