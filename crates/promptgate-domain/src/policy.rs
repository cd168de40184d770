//! Typed effective configuration consumed by the policy evaluators.
//!
//! The settings crate merges the JSON documents and converts the result
//! into these structs after validation; evaluators never see the raw tree.

use promptgate_waivers::Waiver;
use regex::Regex;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct CostPolicyConfig {
    pub warn_increase_pct: f64,
    pub block_increase_pct: f64,
    pub min_baseline_cost_usd: f64,
    /// Absolute-delta thresholds apply only when configured > 0.
    pub warn_delta_usd: f64,
    pub block_delta_usd: f64,
}

impl Default for CostPolicyConfig {
    fn default() -> Self {
        Self {
            warn_increase_pct: 20.0,
            block_increase_pct: 35.0,
            min_baseline_cost_usd: 0.01,
            warn_delta_usd: 0.0,
            block_delta_usd: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LatencyPolicyConfig {
    pub warn_increase_pct: f64,
    pub block_increase_pct: f64,
    pub min_baseline_latency_ms: f64,
    pub warn_delta_ms: f64,
    pub block_delta_ms: f64,
}

impl Default for LatencyPolicyConfig {
    fn default() -> Self {
        Self {
            warn_increase_pct: 30.0,
            block_increase_pct: 60.0,
            min_baseline_latency_ms: 50.0,
            warn_delta_ms: 0.0,
            block_delta_ms: 0.0,
        }
    }
}

/// PII patterns are compiled once during config resolution; label order is
/// the map order, so findings are deterministic.
#[derive(Clone, Debug, Default)]
pub struct PiiPolicyConfig {
    pub patterns: BTreeMap<String, Regex>,
    pub allowlist: Vec<Regex>,
}

#[derive(Clone, Debug)]
pub struct OutputContractConfig {
    pub enabled: bool,
    pub block_on_invalid_json: bool,
    pub warn_on_missing_keys: bool,
    pub warn_on_type_mismatch: bool,
}

impl Default for OutputContractConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            block_on_invalid_json: true,
            warn_on_missing_keys: true,
            warn_on_type_mismatch: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DriftPolicyConfig {
    pub warn_length_delta_pct: f64,
    pub warn_short_ratio: f64,
    pub warn_min_similarity: f64,
    pub semantic_check_enabled: bool,
    pub similarity_method: String,
}

impl Default for DriftPolicyConfig {
    fn default() -> Self {
        Self {
            warn_length_delta_pct: 60.0,
            warn_short_ratio: 0.35,
            warn_min_similarity: 0.15,
            semantic_check_enabled: true,
            similarity_method: "max(token_jaccard,char_3gram_jaccard)".to_string(),
        }
    }
}

/// Per-model pricing used to derive a cost when `cost_usd` is absent.
/// Either the split `input_per_1k`/`output_per_1k` pair or the flat
/// `per_1k` rate may be present.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModelPricing {
    pub input_per_1k: Option<f64>,
    pub output_per_1k: Option<f64>,
    pub per_1k: Option<f64>,
}

/// The merged, validated configuration one evaluation runs against.
#[derive(Clone, Debug, Default)]
pub struct EffectiveConfig {
    pub cost: CostPolicyConfig,
    pub latency: LatencyPolicyConfig,
    pub pii: PiiPolicyConfig,
    pub output_contract: OutputContractConfig,
    pub drift: DriftPolicyConfig,
    pub model_pricing: BTreeMap<String, ModelPricing>,
    pub waivers: Vec<Waiver>,
}
