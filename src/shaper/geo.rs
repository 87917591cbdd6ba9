//! Geo documents
//!
//! State geometries and county lists are static JSON objects keyed by
//! two-letter state code, fetched through the file cache.

use serde_json::{Map, Value};

use super::errors::{ReportError, ReportResult};
use crate::file_cache::FileCache;

pub const STATE_GEOMETRIES: &str = "state_geometries.json";
pub const COUNTIES_BY_STATE: &str = "counties_by_state.json";

/// Codes that select the whole country; no single boundary applies
const NATIONAL_CODES: [&str; 2] = ["US", "LOCAL"];

async fn load_document(cache: &FileCache, name: &str) -> ReportResult<Map<String, Value>> {
    let handle = cache.ensure_geo(name).await?;
    let bytes = tokio::fs::read(&handle.path)
        .await
        .map_err(|e| ReportError::InvalidDocument {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
    parse_document(name, &bytes)
}

fn parse_document(name: &str, bytes: &[u8]) -> ReportResult<Map<String, Value>> {
    match serde_json::from_slice(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ReportError::InvalidDocument {
            name: name.to_string(),
            reason: "expected an object keyed by state code".to_string(),
        }),
        Err(e) => Err(ReportError::InvalidDocument {
            name: name.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Bounds and geometry for a state.
///
/// National codes yield `[]`; an unknown state is `NotFound`.
pub async fn state_bounds(cache: &FileCache, state: &str) -> ReportResult<Value> {
    let code = state.trim().to_ascii_uppercase();
    if NATIONAL_CODES.contains(&code.as_str()) {
        return Ok(Value::Array(Vec::new()));
    }
    let states = load_document(cache, STATE_GEOMETRIES).await?;
    state_entry(&states, &code)
}

fn state_entry(states: &Map<String, Value>, code: &str) -> ReportResult<Value> {
    let info = states
        .get(code)
        .ok_or_else(|| ReportError::NotFound(format!("State not found: {}", code)))?;
    Ok(serde_json::json!({
        "stateName": info.get("name").cloned().unwrap_or(Value::Null),
        "stateCode": code,
        "bounds": info.get("bounds").cloned().unwrap_or(Value::Null),
        "geometry": info.get("geometry").cloned().unwrap_or(Value::Null),
    }))
}

/// Counties of a state; `[]` when the state is unknown
pub async fn state_counties(cache: &FileCache, state: &str) -> ReportResult<Value> {
    let code = state.trim().to_ascii_uppercase();
    let counties = load_document(cache, COUNTIES_BY_STATE).await?;
    Ok(counties.get(&code).cloned().unwrap_or_else(|| Value::Array(Vec::new())))
}

/// No basin geometry is published
pub fn basin_geo() -> Value {
    Value::Array(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_entry() {
        let doc = parse_document(
            STATE_GEOMETRIES,
            br#"{"TX": {"name": "Texas", "bounds": [[-106.6, 25.8], [-93.5, 36.5]],
                "geometry": null}}"#,
        )
        .unwrap();
        let entry = state_entry(&doc, "TX").unwrap();
        assert_eq!(entry["stateName"], "Texas");
        assert_eq!(entry["stateCode"], "TX");
        assert!(matches!(state_entry(&doc, "ZZ"), Err(ReportError::NotFound(_))));
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        assert!(parse_document(COUNTIES_BY_STATE, b"[1, 2]").is_err());
        assert!(parse_document(COUNTIES_BY_STATE, b"{").is_err());
    }

    #[test]
    fn test_basin_is_empty() {
        assert_eq!(basin_geo(), json!([]));
    }
}
