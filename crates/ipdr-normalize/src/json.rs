//! Extraction of keyed rows from JSON IPDR exports.
//!
//! Accepted shapes: a top-level array of objects; an object holding such an
//! array under `records`, `data` or `ipdr_records`; or a single object that
//! is itself one record.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use ipdr_contracts::error::{IpdrError, IpdrResult};

/// Keys searched, in order, for a nested record array.
pub const NESTED_RECORD_KEYS: [&str; 3] = ["records", "data", "ipdr_records"];

pub type JsonRow = BTreeMap<String, String>;

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn object_to_row(value: &Value) -> Option<JsonRow> {
    let map = value.as_object()?;
    Some(
        map.iter()
            .filter_map(|(k, v)| stringify(v).map(|s| (k.clone(), s)))
            .collect(),
    )
}

/// Rows of an already-parsed JSON document. Non-object array items are skipped.
pub fn rows_from_value(value: &Value) -> Vec<JsonRow> {
    match value {
        Value::Array(items) => items.iter().filter_map(object_to_row).collect(),
        Value::Object(map) => {
            let nested = NESTED_RECORD_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_array));
            match nested {
                Some(items) => items.iter().filter_map(object_to_row).collect(),
                None => object_to_row(value).into_iter().collect(),
            }
        }
        _ => Vec::new(),
    }
}

/// Parse `bytes` as JSON and extract its rows.
///
/// # Errors
///
/// Returns `IpdrError::Parse` naming `filename` when the bytes are not JSON.
pub fn parse_json_rows(bytes: &[u8], filename: &str) -> IpdrResult<Vec<JsonRow>> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| IpdrError::Parse {
        filename: filename.to_string(),
        reason: format!("invalid JSON: {}", e),
    })?;
    let rows = rows_from_value(&value);
    debug!(filename = %filename, rows = rows.len(), "json rows extracted");
    Ok(rows)
}
