//! Merge per-policy results into a single verdict.
//!
//! Worst status wins. Strict mode promotes a WARN aggregate to BLOCK once,
//! after natural aggregation, with a synthetic trailing reason/code.

use promptgate_types::{codes, PolicyResult, Status};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct Aggregated {
    pub status: Status,
    pub reasons: Vec<String>,
    pub reason_codes: Vec<String>,
    pub metrics: BTreeMap<String, JsonValue>,
    pub details: BTreeMap<String, JsonValue>,
}

pub fn aggregate(results: &[PolicyResult], strict: bool) -> Aggregated {
    let mut reasons: Vec<String> = Vec::new();
    let mut internal_codes: Vec<String> = Vec::new();
    let mut details: BTreeMap<String, JsonValue> = BTreeMap::new();
    let mut status = Status::Allow;

    for result in results {
        reasons.extend(result.reasons.iter().cloned());
        internal_codes.extend(result.codes.iter().cloned());
        status = status.max(result.status);
        let policy_details = if result.details.is_null() {
            json!({})
        } else {
            result.details.clone()
        };
        details.insert(result.policy.as_str().to_string(), policy_details);
    }

    if strict && status == Status::Warn {
        status = Status::Block;
        reasons.push("Strict mode promoted WARN to BLOCK.".to_string());
        internal_codes.push(codes::STRICT_PROMOTED_WARN.to_string());
    }

    let reason_codes = internal_codes
        .iter()
        .map(|code| codes::to_public_code(code).to_string())
        .collect();

    let metrics = extract_metrics(&details);

    Aggregated {
        status,
        reasons,
        reason_codes,
        metrics,
        details,
    }
}

/// Flat numeric metrics pulled from policy details under fixed keys, each
/// rounded to a fixed precision: 4 decimals for percentages and
/// milliseconds, 6 for ratios and USD, integers for counts.
fn extract_metrics(details: &BTreeMap<String, JsonValue>) -> BTreeMap<String, JsonValue> {
    let mut metrics = BTreeMap::new();

    if let Some(cost) = details.get("cost") {
        insert_rounded(&mut metrics, "cost_delta_pct", cost.get("increase_pct"), 4);
        insert_rounded(&mut metrics, "cost_delta_usd", cost.get("delta_usd"), 6);
    }

    if let Some(latency) = details.get("latency") {
        insert_rounded(
            &mut metrics,
            "latency_delta_pct",
            latency.get("increase_pct"),
            4,
        );
        insert_rounded(&mut metrics, "latency_delta_ms", latency.get("delta_ms"), 4);
    }

    if let Some(drift) = details.get("drift") {
        insert_rounded(
            &mut metrics,
            "length_delta_pct",
            drift.get("length_delta_pct"),
            4,
        );
        insert_rounded(&mut metrics, "short_ratio", drift.get("short_ratio"), 6);
        insert_rounded(&mut metrics, "similarity", drift.get("similarity"), 6);
    }

    if let Some(pii) = details.get("pii") {
        insert_count(&mut metrics, "pii_blocked_total", pii.get("blocked_total"));
        if let Some(type_counts) = pii.get("blocked_type_counts").and_then(JsonValue::as_object) {
            metrics.insert(
                "pii_blocked_type_count".to_string(),
                json!(type_counts.len()),
            );
        }
    }

    if let Some(contract) = details.get("output_contract") {
        insert_count(
            &mut metrics,
            "output_contract_invalid_json_count",
            contract.get("invalid_json_count"),
        );
        insert_count(
            &mut metrics,
            "output_contract_missing_keys_count",
            contract.get("missing_keys_count"),
        );
        insert_count(
            &mut metrics,
            "output_contract_type_mismatch_count",
            contract.get("type_mismatches_count"),
        );
    }

    metrics
}

fn insert_rounded(
    metrics: &mut BTreeMap<String, JsonValue>,
    key: &str,
    value: Option<&JsonValue>,
    digits: i32,
) {
    if let Some(number) = value.and_then(JsonValue::as_f64) {
        metrics.insert(key.to_string(), json!(round_to(number, digits)));
    }
}

fn insert_count(metrics: &mut BTreeMap<String, JsonValue>, key: &str, value: Option<&JsonValue>) {
    if let Some(number) = value.and_then(JsonValue::as_f64) {
        metrics.insert(key.to_string(), json!(number as i64));
    }
}

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
