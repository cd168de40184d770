use crate::policy::OutputContractConfig;
use crate::record::InvocationRecord;
use promptgate_types::{codes, PolicyName, PolicyResult, Status};
use serde_json::{json, Map, Value as JsonValue};

/// Compare the parsed JSON shape of the candidate output against the
/// baseline output. The baseline defines the contract: if it is not valid
/// JSON there is nothing to compare against and the policy allows.
pub fn evaluate(
    baseline: &InvocationRecord,
    candidate: &InvocationRecord,
    config: &OutputContractConfig,
) -> PolicyResult {
    if !config.enabled {
        return PolicyResult::allow(PolicyName::OutputContract);
    }

    let Ok(baseline_payload) = serde_json::from_str::<JsonValue>(&baseline.output) else {
        return PolicyResult::allow(PolicyName::OutputContract);
    };

    let Ok(candidate_payload) = serde_json::from_str::<JsonValue>(&candidate.output) else {
        let details = json!({"invalid_json": true, "invalid_json_count": 1});
        if config.block_on_invalid_json {
            return PolicyResult {
                policy: PolicyName::OutputContract,
                status: Status::Block,
                reasons: vec![
                    "Output contract break: candidate output is not valid JSON.".to_string(),
                ],
                codes: vec![codes::CONTRACT_BLOCK_INVALID_JSON.to_string()],
                details,
            };
        }
        return PolicyResult {
            policy: PolicyName::OutputContract,
            status: Status::Warn,
            reasons: vec!["Output contract risk: candidate output is not valid JSON.".to_string()],
            codes: vec![codes::CONTRACT_WARN_INVALID_JSON.to_string()],
            details,
        };
    };

    let mut reasons: Vec<String> = Vec::new();
    let mut result_codes: Vec<String> = Vec::new();
    let mut details = Map::new();

    let mut diff = SchemaDiff::default();
    if json_type_name(&baseline_payload) != json_type_name(&candidate_payload) {
        reasons.push(format!(
            "Output contract break: top-level JSON type changed from {} to {}.",
            json_type_name(&baseline_payload),
            json_type_name(&candidate_payload)
        ));
        result_codes.push(codes::CONTRACT_BLOCK_TYPE_CHANGE.to_string());
        details.insert("top_level_type_changed".to_string(), json!(true));
    } else {
        diff.compare(&baseline_payload, &candidate_payload, "");
    }

    if !diff.missing_keys.is_empty() && config.warn_on_missing_keys {
        diff.missing_keys.sort();
        reasons.push(capped_list_reason(
            "Output contract regression: missing keys ",
            &diff.missing_keys,
        ));
        result_codes.push(codes::CONTRACT_WARN_MISSING_KEYS.to_string());
    }

    if !diff.type_mismatches.is_empty() && config.warn_on_type_mismatch {
        diff.type_mismatches.sort();
        reasons.push(capped_list_reason(
            "Output contract regression: type mismatch for keys ",
            &diff.type_mismatches,
        ));
        result_codes.push(codes::CONTRACT_WARN_TYPE_MISMATCH.to_string());
    }

    if !diff.missing_keys.is_empty() {
        details.insert("missing_keys".to_string(), json!(diff.missing_keys));
        details.insert(
            "missing_keys_count".to_string(),
            json!(diff.missing_keys.len()),
        );
    }
    if !diff.type_mismatches.is_empty() {
        details.insert("type_mismatches".to_string(), json!(diff.type_mismatches));
        details.insert(
            "type_mismatches_count".to_string(),
            json!(diff.type_mismatches.len()),
        );
    }

    let status = if result_codes
        .iter()
        .any(|code| code.starts_with("CONTRACT_BLOCK_"))
    {
        Status::Block
    } else if reasons.is_empty() {
        Status::Allow
    } else {
        Status::Warn
    };

    PolicyResult {
        policy: PolicyName::OutputContract,
        status,
        reasons,
        codes: result_codes,
        details: JsonValue::Object(details),
    }
}

#[derive(Default)]
struct SchemaDiff {
    missing_keys: Vec<String>,
    type_mismatches: Vec<String>,
}

impl SchemaDiff {
    /// Recursive structural comparison. Objects compare key sets and recurse
    /// into shared keys; arrays compare only their representative first
    /// element under the `[0]` path suffix — later elements are deliberately
    /// not enumerated.
    fn compare(&mut self, baseline: &JsonValue, candidate: &JsonValue, path: &str) {
        if json_type_name(baseline) != json_type_name(candidate) {
            // The top level is reported separately as a type change.
            if !path.is_empty() {
                self.type_mismatches.push(path.to_string());
            }
            return;
        }

        match (baseline, candidate) {
            (JsonValue::Object(b_map), JsonValue::Object(c_map)) => {
                for key in b_map.keys() {
                    let next_path = join_path(path, key);
                    match c_map.get(key) {
                        None => self.missing_keys.push(next_path),
                        Some(c_value) => self.compare(&b_map[key], c_value, &next_path),
                    }
                }
            }
            (JsonValue::Array(b_items), JsonValue::Array(c_items)) => {
                if let (Some(b_first), Some(c_first)) = (b_items.first(), c_items.first()) {
                    self.compare(b_first, c_first, &format!("{path}[0]"));
                }
            }
            _ => {}
        }
    }
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn capped_list_reason(prefix: &str, keys: &[String]) -> String {
    let shown: Vec<&str> = keys.iter().take(10).map(String::as_str).collect();
    let suffix = if keys.len() <= 10 {
        ".".to_string()
    } else {
        format!(" (+{} more).", keys.len() - 10)
    };
    format!("{prefix}{}{suffix}", shown.join(", "))
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
