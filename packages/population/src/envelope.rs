//! Permissive parsing of the open-data JSON envelope.
//!
//! A successful response looks like
//! `{ "TEMP_FOREIGNER": { "list_total_count": n, "RESULT": {..}, "row": [..] } }`.
//! Anything else (no service key, no `row` array, a bare `RESULT` error
//! object) yields an empty row list rather than an error.

use visitor_map_population_models::PopulationRecord;

/// Extracts the rows under `envelope[service]["row"]`.
///
/// Rows that are not objects or lack a tract code are skipped. Numeric
/// field values are converted to strings so they read the same as the
/// numeric-strings the API normally returns.
#[must_use]
pub fn parse_envelope(envelope: &serde_json::Value, service: &str) -> Vec<PopulationRecord> {
    let Some(rows) = envelope
        .get(service)
        .and_then(|body| body.get("row"))
        .and_then(serde_json::Value::as_array)
    else {
        log_result(envelope, service);
        return Vec::new();
    };

    let mut skipped = 0usize;
    let records: Vec<PopulationRecord> = rows
        .iter()
        .filter_map(|row| {
            let record = normalize_row(row);
            if record.is_none() {
                skipped += 1;
            }
            record
        })
        .collect();

    if skipped > 0 {
        log::warn!("Skipped {skipped} {service} rows without a tract code");
    }

    records
}

/// Converts a raw row into a record, stringifying numeric values.
fn normalize_row(row: &serde_json::Value) -> Option<PopulationRecord> {
    let object = row.as_object()?;
    let normalized: serde_json::Map<String, serde_json::Value> = object
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some((key.clone(), serde_json::Value::String(text)))
        })
        .collect();

    serde_json::from_value(serde_json::Value::Object(normalized)).ok()
}

/// Logs the API's `RESULT` status when the envelope carries no rows.
///
/// The status sits under the service key on success and at the top level
/// when the request itself was rejected (e.g. an invalid key).
fn log_result(envelope: &serde_json::Value, service: &str) {
    let result = envelope
        .get(service)
        .and_then(|body| body.get("RESULT"))
        .or_else(|| envelope.get("RESULT"));

    match result {
        Some(result) => {
            let code = result["CODE"].as_str().unwrap_or("unknown");
            let message = result["MESSAGE"].as_str().unwrap_or("");
            log::warn!("{service} returned no rows: {code} {message}");
        }
        None => log::warn!("{service} response has no row collection"),
    }
}
