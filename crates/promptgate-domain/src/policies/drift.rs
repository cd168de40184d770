use crate::policy::DriftPolicyConfig;
use crate::record::InvocationRecord;
use crate::similarity::similarity;
use promptgate_types::{codes, PolicyName, PolicyResult, Status};
use serde_json::{json, Map, Value as JsonValue};

pub fn evaluate(
    baseline: &InvocationRecord,
    candidate: &InvocationRecord,
    thresholds: &DriftPolicyConfig,
) -> PolicyResult {
    let baseline_text = baseline.output.as_str();
    let candidate_text = candidate.output.as_str();

    // Empty output is never acceptable, regardless of baseline.
    if candidate_text.trim().is_empty() {
        return PolicyResult {
            policy: PolicyName::Drift,
            status: Status::Block,
            reasons: vec!["Candidate output is empty.".to_string()],
            codes: vec![codes::DRIFT_BLOCK_EMPTY.to_string()],
            details: JsonValue::Null,
        };
    }

    let mut reasons: Vec<String> = Vec::new();
    let mut result_codes: Vec<String> = Vec::new();
    let mut details = Map::new();

    let baseline_len = baseline_text.chars().count().max(1);
    let candidate_len = candidate_text.chars().count();
    let delta_pct = (candidate_len.abs_diff(baseline_len)) as f64 / baseline_len as f64 * 100.0;
    let short_ratio = candidate_len as f64 / baseline_len as f64;

    if delta_pct > thresholds.warn_length_delta_pct {
        let direction = if candidate_len > baseline_len {
            "expanded"
        } else {
            "compressed"
        };
        reasons.push(format!(
            "Response length {direction} by {delta_pct:.1}% (threshold {:.0}%).",
            thresholds.warn_length_delta_pct
        ));
        result_codes.push(codes::DRIFT_WARN_LENGTH_DELTA.to_string());
        details.insert("length_delta_pct".to_string(), json!(delta_pct));
    }

    if short_ratio < thresholds.warn_short_ratio {
        let shrink_pct = (1.0 - short_ratio) * 100.0;
        reasons.push(format!(
            "Response appears over-compressed: {shrink_pct:.1}% shorter than baseline (ratio {short_ratio:.2}, threshold {:.2}).",
            thresholds.warn_short_ratio
        ));
        result_codes.push(codes::DRIFT_WARN_SHORT_OUTPUT.to_string());
        details.insert("short_ratio".to_string(), json!(short_ratio));
    }

    if thresholds.semantic_check_enabled {
        let score = similarity(baseline_text, candidate_text, &thresholds.similarity_method);
        details.insert("similarity".to_string(), json!(score));
        details.insert(
            "similarity_method".to_string(),
            json!(thresholds.similarity_method),
        );
        if score < thresholds.warn_min_similarity {
            reasons.push(format!(
                "Response content overlap is low: similarity {score:.2} (threshold {:.2}).",
                thresholds.warn_min_similarity
            ));
            result_codes.push(codes::DRIFT_WARN_LOW_SIMILARITY.to_string());
        }
    }

    let status = if reasons.is_empty() {
        Status::Allow
    } else {
        Status::Warn
    };

    PolicyResult {
        policy: PolicyName::Drift,
        status,
        reasons,
        codes: result_codes,
        details: JsonValue::Object(details),
    }
}
