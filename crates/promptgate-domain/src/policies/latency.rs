use crate::policy::LatencyPolicyConfig;
use crate::record::InvocationRecord;
use promptgate_types::{codes, PolicyName, PolicyResult, Status};
use serde_json::{json, Map, Value as JsonValue};

pub fn evaluate(
    baseline: &InvocationRecord,
    candidate: &InvocationRecord,
    thresholds: &LatencyPolicyConfig,
) -> PolicyResult {
    let (Some(baseline_latency), Some(candidate_latency)) =
        (baseline.latency_ms, candidate.latency_ms)
    else {
        let mut details = Map::new();
        if let Some(value) = baseline.latency_ms {
            details.insert("baseline_latency_ms".to_string(), json!(value));
        }
        if let Some(value) = candidate.latency_ms {
            details.insert("candidate_latency_ms".to_string(), json!(value));
        }
        return PolicyResult {
            policy: PolicyName::Latency,
            status: Status::Warn,
            reasons: vec![
                "Insufficient latency data; unable to compute full latency delta.".to_string(),
            ],
            codes: vec![codes::LATENCY_WARN_MISSING_DATA.to_string()],
            details: JsonValue::Object(details),
        };
    };

    if baseline_latency < thresholds.min_baseline_latency_ms {
        return PolicyResult {
            policy: PolicyName::Latency,
            status: Status::Warn,
            reasons: vec![format!(
                "Baseline latency {baseline_latency:.1}ms is below minimum {:.1}ms; percent delta is unreliable.",
                thresholds.min_baseline_latency_ms
            )],
            codes: vec![codes::LATENCY_WARN_LOW_BASELINE.to_string()],
            details: json!({
                "baseline_latency_ms": baseline_latency,
                "min_baseline_latency_ms": thresholds.min_baseline_latency_ms,
            }),
        };
    }

    let delta_ms = candidate_latency - baseline_latency;
    let increase_pct = (delta_ms / baseline_latency) * 100.0;
    let details = json!({
        "baseline_latency_ms": baseline_latency,
        "candidate_latency_ms": candidate_latency,
        "increase_pct": increase_pct,
        "delta_ms": delta_ms,
    });

    let block_abs = thresholds.block_delta_ms > 0.0 && delta_ms > thresholds.block_delta_ms;
    if block_abs || increase_pct > thresholds.block_increase_pct {
        return PolicyResult {
            policy: PolicyName::Latency,
            status: Status::Block,
            reasons: vec![increase_reason(
                increase_pct,
                thresholds.block_increase_pct,
                delta_ms,
                thresholds.block_delta_ms,
            )],
            codes: vec![codes::LATENCY_BLOCK_INCREASE.to_string()],
            details,
        };
    }

    let warn_abs = thresholds.warn_delta_ms > 0.0 && delta_ms > thresholds.warn_delta_ms;
    if warn_abs || increase_pct > thresholds.warn_increase_pct {
        return PolicyResult {
            policy: PolicyName::Latency,
            status: Status::Warn,
            reasons: vec![increase_reason(
                increase_pct,
                thresholds.warn_increase_pct,
                delta_ms,
                thresholds.warn_delta_ms,
            )],
            codes: vec![codes::LATENCY_WARN_INCREASE.to_string()],
            details,
        };
    }

    PolicyResult {
        policy: PolicyName::Latency,
        status: Status::Allow,
        reasons: Vec::new(),
        codes: Vec::new(),
        details,
    }
}

fn increase_reason(increase_pct: f64, pct_threshold: f64, delta_ms: f64, abs_threshold: f64) -> String {
    let mut reason = format!("Latency increased by {increase_pct:.1}% (>{pct_threshold:.0}%).");
    if abs_threshold > 0.0 {
        reason.push_str(&format!(
            " Absolute delta {delta_ms:.1}ms (>{abs_threshold:.1}ms)."
        ));
    }
    reason
}
