//! Baseline/candidate input loading.
//!
//! Inputs arrive as JSON files, `-` for stdin, or a single combined
//! `{baseline, candidate}` document. Stdin is read once and cached so the
//! same `-` can name both sides.

use promptgate_domain::RecordInput;
use promptgate_types::InputValidationError;
use serde_json::Value as JsonValue;
use std::io::Read;

/// One-shot stdin buffer shared across both input positions.
#[derive(Default)]
pub struct StdinCache(Option<String>);

impl StdinCache {
    fn read(&mut self) -> Result<&str, InputValidationError> {
        if self.0.is_none() {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|err| {
                    InputValidationError::new(format!("Failed to read stdin: {err}."))
                })?;
            self.0 = Some(buffer);
        }
        Ok(self.0.as_deref().unwrap_or_default())
    }
}

/// Read one record document from a path (or stdin for `-`).
pub fn read_record_input(
    path: &str,
    stdin: &mut StdinCache,
) -> Result<JsonValue, InputValidationError> {
    let raw = if path == "-" {
        stdin.read()?.to_string()
    } else {
        std::fs::read_to_string(path).map_err(|err| {
            InputValidationError::new(format!("Failed to read input file '{path}': {err}."))
        })?
    };

    serde_json::from_str(&raw).map_err(|err| {
        InputValidationError::new(format!("Input '{path}' is not valid JSON: {err}."))
    })
}

/// Split a combined `{baseline, candidate}` document into the two records.
pub fn split_combined_input(
    payload: &JsonValue,
) -> Result<(RecordInput, RecordInput), InputValidationError> {
    let object = payload.as_object().ok_or_else(|| {
        InputValidationError::new("Combined input must be a JSON object.")
    })?;

    let baseline = object.get("baseline");
    let candidate = object.get("candidate");
    let (Some(baseline), Some(candidate)) = (baseline, candidate) else {
        return Err(InputValidationError::new(
            "Combined input must contain object keys 'baseline' and 'candidate'.",
        ));
    };
    if !baseline.is_object() || !candidate.is_object() {
        return Err(InputValidationError::new(
            "Combined input must contain object keys 'baseline' and 'candidate'.",
        ));
    }

    Ok((record_from_value(baseline)?, record_from_value(candidate)?))
}

/// Convert a raw JSON document into a record, ignoring unknown keys.
pub fn record_from_value(value: &JsonValue) -> Result<RecordInput, InputValidationError> {
    if !value.is_object() {
        return Err(InputValidationError::new(
            "Record input must be a JSON object.",
        ));
    }
    serde_json::from_value(value.clone())
        .map_err(|err| InputValidationError::new(format!("Malformed record input: {err}.")))
}
