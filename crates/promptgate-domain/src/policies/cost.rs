use crate::policy::{CostPolicyConfig, ModelPricing};
use crate::record::InvocationRecord;
use promptgate_types::{codes, PolicyName, PolicyResult, Status};
use serde_json::json;
use std::collections::BTreeMap;

pub fn evaluate(
    baseline: &InvocationRecord,
    candidate: &InvocationRecord,
    thresholds: &CostPolicyConfig,
    pricing: &BTreeMap<String, ModelPricing>,
) -> PolicyResult {
    let baseline_cost = resolve_cost(baseline, pricing);
    let candidate_cost = resolve_cost(candidate, pricing);

    let (Some(baseline_cost), Some(candidate_cost)) = (baseline_cost, candidate_cost) else {
        return PolicyResult {
            policy: PolicyName::Cost,
            status: Status::Warn,
            reasons: vec!["Insufficient cost data; unable to compute full cost delta.".to_string()],
            codes: vec![codes::COST_WARN_MISSING_DATA.to_string()],
            details: serde_json::Value::Null,
        };
    };

    if baseline_cost < thresholds.min_baseline_cost_usd {
        return PolicyResult {
            policy: PolicyName::Cost,
            status: Status::Warn,
            reasons: vec![format!(
                "Baseline cost ${baseline_cost:.4} is below minimum ${:.4}; percent delta is unreliable.",
                thresholds.min_baseline_cost_usd
            )],
            codes: vec![codes::COST_WARN_LOW_BASELINE.to_string()],
            details: json!({
                "baseline_cost_usd": baseline_cost,
                "min_baseline_cost_usd": thresholds.min_baseline_cost_usd,
            }),
        };
    }

    let delta_usd = candidate_cost - baseline_cost;
    let increase_pct = ((candidate_cost - baseline_cost) / baseline_cost) * 100.0;

    let block_abs = thresholds.block_delta_usd > 0.0 && delta_usd > thresholds.block_delta_usd;
    if block_abs || increase_pct > thresholds.block_increase_pct {
        return PolicyResult {
            policy: PolicyName::Cost,
            status: Status::Block,
            reasons: vec![increase_reason(
                increase_pct,
                thresholds.block_increase_pct,
                delta_usd,
                thresholds.block_delta_usd,
            )],
            codes: vec![codes::COST_BLOCK_INCREASE.to_string()],
            details: json!({"increase_pct": increase_pct, "delta_usd": delta_usd}),
        };
    }

    let warn_abs = thresholds.warn_delta_usd > 0.0 && delta_usd > thresholds.warn_delta_usd;
    if warn_abs || increase_pct > thresholds.warn_increase_pct {
        return PolicyResult {
            policy: PolicyName::Cost,
            status: Status::Warn,
            reasons: vec![increase_reason(
                increase_pct,
                thresholds.warn_increase_pct,
                delta_usd,
                thresholds.warn_delta_usd,
            )],
            codes: vec![codes::COST_WARN_INCREASE.to_string()],
            details: json!({"increase_pct": increase_pct, "delta_usd": delta_usd}),
        };
    }

    PolicyResult::allow(PolicyName::Cost)
}

fn increase_reason(increase_pct: f64, pct_threshold: f64, delta_usd: f64, abs_threshold: f64) -> String {
    let mut reason = format!("Cost increased by {increase_pct:.1}% (>{pct_threshold:.0}%).");
    if abs_threshold > 0.0 {
        reason.push_str(&format!(
            " Absolute delta ${delta_usd:.4} (>{abs_threshold:.4})."
        ));
    }
    reason
}

/// Cost resolution order: direct `cost_usd`; else split-token pricing for
/// the record's model; else flat `tokens_total` pricing; else unresolved.
fn resolve_cost(record: &InvocationRecord, pricing: &BTreeMap<String, ModelPricing>) -> Option<f64> {
    if let Some(direct) = record.cost_usd {
        return Some(direct);
    }

    let model_pricing = record
        .model
        .as_deref()
        .and_then(|model| pricing.get(model))
        .copied()
        .unwrap_or_default();

    if let (Some(tokens_in), Some(tokens_out)) = (record.tokens_in, record.tokens_out) {
        if let (Some(input_per_1k), Some(output_per_1k)) =
            (model_pricing.input_per_1k, model_pricing.output_per_1k)
        {
            return Some((tokens_in / 1000.0 * input_per_1k) + (tokens_out / 1000.0 * output_per_1k));
        }
    }

    if let (Some(tokens_total), Some(per_1k)) = (record.tokens_total, model_pricing.per_1k) {
        return Some(tokens_total / 1000.0 * per_1k);
    }

    None
}
