//! Property-based tests for the domain crate.
//!
//! These verify invariants around:
//! - percent-delta math for the cost and latency policies
//! - the reasons/codes pairing invariant
//! - waiver application never raising severity
//! - similarity scores staying inside [0, 1]

use crate::policies::{cost, latency};
use crate::policy::{CostPolicyConfig, LatencyPolicyConfig};
use crate::record::InvocationRecord;
use crate::similarity::similarity;
use promptgate_waivers::{apply_waivers, parse_waivers};
use proptest::prelude::*;
use std::collections::BTreeMap;
use time::macros::datetime;

fn record_with_cost(cost_usd: f64) -> InvocationRecord {
    InvocationRecord {
        output: "same".to_string(),
        cost_usd: Some(cost_usd),
        tokens_in: None,
        tokens_out: None,
        tokens_total: None,
        latency_ms: None,
        model: None,
    }
}

fn record_with_latency(latency_ms: f64) -> InvocationRecord {
    InvocationRecord {
        latency_ms: Some(latency_ms),
        cost_usd: None,
        ..record_with_cost(0.0)
    }
}

/// Baselines above each policy's minimum floor, so the percent path runs.
fn arb_cost_baseline() -> impl Strategy<Value = f64> {
    0.02f64..50.0
}

fn arb_latency_baseline() -> impl Strategy<Value = f64> {
    60.0f64..5000.0
}

fn arb_growth_factor() -> impl Strategy<Value = f64> {
    1.0f64..4.0
}

proptest! {
    /// increase_pct is exactly (candidate - baseline) / baseline * 100 for
    /// every pair above the baseline floor.
    #[test]
    fn cost_increase_pct_is_exact(baseline in arb_cost_baseline(), factor in arb_growth_factor()) {
        let candidate = baseline * factor;
        let result = cost::evaluate(
            &record_with_cost(baseline),
            &record_with_cost(candidate),
            &CostPolicyConfig::default(),
            &BTreeMap::new(),
        );

        let expected = ((candidate - baseline) / baseline) * 100.0;
        if let Some(actual) = result.details.get("increase_pct").and_then(|v| v.as_f64()) {
            prop_assert_eq!(actual, expected);
        } else {
            // ALLOW results carry no delta details; that only happens below
            // the warn threshold.
            prop_assert!(expected <= CostPolicyConfig::default().warn_increase_pct);
        }
    }

    #[test]
    fn latency_increase_pct_is_exact(
        baseline in arb_latency_baseline(),
        factor in arb_growth_factor(),
    ) {
        let candidate = baseline * factor;
        let result = latency::evaluate(
            &record_with_latency(baseline),
            &record_with_latency(candidate),
            &LatencyPolicyConfig::default(),
        );

        let expected = ((candidate - baseline) / baseline) * 100.0;
        let actual = result.details["increase_pct"].as_f64().unwrap();
        prop_assert_eq!(actual, expected);
    }

    /// Every policy result keeps reasons and codes in lock-step.
    #[test]
    fn cost_reasons_and_codes_stay_paired(
        baseline in 0.0f64..50.0,
        candidate in 0.0f64..200.0,
    ) {
        let result = cost::evaluate(
            &record_with_cost(baseline),
            &record_with_cost(candidate),
            &CostPolicyConfig::default(),
            &BTreeMap::new(),
        );
        prop_assert_eq!(result.reasons.len(), result.codes.len());
    }

    /// Waiver application never raises a policy's severity and preserves
    /// the pairing invariant.
    #[test]
    fn waiver_application_never_raises_severity(
        baseline in arb_cost_baseline(),
        factor in arb_growth_factor(),
    ) {
        let before = cost::evaluate(
            &record_with_cost(baseline),
            &record_with_cost(baseline * factor),
            &CostPolicyConfig::default(),
            &BTreeMap::new(),
        );

        let waivers = parse_waivers(Some(&serde_json::json!([{
            "reason_code": "COST_INCREASE_WARN",
            "expires_at": "2027-01-01T00:00:00Z",
            "reason": "accepted variance",
        }]))).unwrap();

        let status_before = before.status;
        let (after, _) = apply_waivers(
            vec![before],
            &waivers,
            datetime!(2026-06-01 00:00:00 UTC),
        );

        prop_assert!(after[0].status <= status_before);
        prop_assert_eq!(after[0].reasons.len(), after[0].codes.len());
    }

    /// Similarity is a ratio: always within [0, 1] for any method.
    #[test]
    fn similarity_stays_in_unit_interval(
        left in ".{0,60}",
        right in ".{0,60}",
        method in prop_oneof![
            Just("token_jaccard"),
            Just("char_3gram_jaccard"),
            Just("max(token_jaccard,char_3gram_jaccard)"),
        ],
    ) {
        let score = similarity(&left, &right, method);
        prop_assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
    }

    /// A text is always maximally similar to itself.
    #[test]
    fn similarity_is_reflexive(text in ".{0,60}") {
        let score = similarity(&text, &text, "max(token_jaccard,char_3gram_jaccard)");
        prop_assert_eq!(score, 1.0);
    }
}
