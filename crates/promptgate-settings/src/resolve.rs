use crate::{defaults, merge::deep_merge, presets};
use promptgate_domain::policy::{
    CostPolicyConfig, DriftPolicyConfig, EffectiveConfig, LatencyPolicyConfig, ModelPricing,
    OutputContractConfig, PiiPolicyConfig,
};
use promptgate_types::ConfigValidationError;
use promptgate_waivers::parse_waivers;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// The merged document (for `config print`) plus the typed config the
/// engine consumes.
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub document: JsonValue,
    pub effective: EffectiveConfig,
}

/// Merge pipeline: built-in defaults ⊕ preset ⊕ custom document ⊕
/// `environments[name]`, then strip `environments`, validate, and convert
/// to the typed config. Validation failure is fatal and names the
/// offending key path.
pub fn resolve_config(
    custom: Option<&JsonValue>,
    environment: Option<&str>,
    preset: Option<&str>,
) -> Result<ResolvedConfig, ConfigValidationError> {
    let mut document = defaults::default_config();

    if let Some(name) = preset {
        let preset_doc = presets::preset(name).ok_or_else(|| {
            ConfigValidationError::new(format!(
                "Unknown config preset '{name}'. Available presets: {}.",
                presets::available_presets().join(", ")
            ))
        })?;
        document = deep_merge(&document, &preset_doc);
    }

    if let Some(custom) = custom {
        if !custom.is_object() {
            return Err(ConfigValidationError::new(
                "Config document must be a JSON object.",
            ));
        }
        document = deep_merge(&document, custom);
    }

    document = apply_environment(document, environment)?;

    let effective = validate_and_convert(&document)?;
    Ok(ResolvedConfig {
        document,
        effective,
    })
}

/// Overlay `environments[name]` when requested; the `environments` section
/// itself never reaches the effective config.
fn apply_environment(
    document: JsonValue,
    environment: Option<&str>,
) -> Result<JsonValue, ConfigValidationError> {
    let Some(name) = environment else {
        let mut document = document;
        if let Some(map) = document.as_object_mut() {
            map.remove("environments");
        }
        return Ok(document);
    };

    let Some(env_section) = document.get("environments") else {
        return Err(ConfigValidationError::new(format!(
            "Config environment '{name}' was requested, but no 'environments' section exists."
        )));
    };
    let env_map = env_section.as_object().ok_or_else(|| {
        ConfigValidationError::new("Config key 'environments' must be a JSON object.")
    })?;

    let Some(overlay) = env_map.get(name) else {
        let mut available: Vec<&str> = env_map.keys().map(String::as_str).collect();
        available.sort_unstable();
        let listed = if available.is_empty() {
            "(none)".to_string()
        } else {
            available.join(", ")
        };
        return Err(ConfigValidationError::new(format!(
            "Unknown config environment '{name}'. Available environments: {listed}."
        )));
    };
    if !overlay.is_object() {
        return Err(ConfigValidationError::new(format!(
            "Environment override for '{name}' must be a JSON object."
        )));
    }

    let mut merged = deep_merge(&document, overlay);
    if let Some(map) = merged.as_object_mut() {
        map.remove("environments");
    }
    Ok(merged)
}

fn validate_and_convert(document: &JsonValue) -> Result<EffectiveConfig, ConfigValidationError> {
    let cost = convert_cost(document)?;
    let latency = convert_latency(document)?;
    let drift = convert_drift(document)?;
    let pii = convert_pii(document)?;
    let output_contract = convert_output_contract(document)?;
    let model_pricing = convert_model_pricing(document)?;
    let waivers = parse_waivers(document.get("waivers"))?;

    Ok(EffectiveConfig {
        cost,
        latency,
        pii,
        output_contract,
        drift,
        model_pricing,
        waivers,
    })
}

fn convert_cost(document: &JsonValue) -> Result<CostPolicyConfig, ConfigValidationError> {
    let section = policy_section(document, "cost_policy")?;
    let (warn, block) = increase_thresholds(&section, "cost_policy")?;
    let defaults = CostPolicyConfig::default();
    Ok(CostPolicyConfig {
        warn_increase_pct: warn,
        block_increase_pct: block,
        min_baseline_cost_usd: optional_number(
            &section,
            "cost_policy",
            "min_baseline_cost_usd",
            defaults.min_baseline_cost_usd,
        )?,
        warn_delta_usd: optional_number(&section, "cost_policy", "warn_delta_usd", 0.0)?,
        block_delta_usd: optional_number(&section, "cost_policy", "block_delta_usd", 0.0)?,
    })
}

fn convert_latency(document: &JsonValue) -> Result<LatencyPolicyConfig, ConfigValidationError> {
    let section = policy_section(document, "latency_policy")?;
    let (warn, block) = increase_thresholds(&section, "latency_policy")?;
    let defaults = LatencyPolicyConfig::default();
    Ok(LatencyPolicyConfig {
        warn_increase_pct: warn,
        block_increase_pct: block,
        min_baseline_latency_ms: optional_number(
            &section,
            "latency_policy",
            "min_baseline_latency_ms",
            defaults.min_baseline_latency_ms,
        )?,
        warn_delta_ms: optional_number(&section, "latency_policy", "warn_delta_ms", 0.0)?,
        block_delta_ms: optional_number(&section, "latency_policy", "block_delta_ms", 0.0)?,
    })
}

fn convert_drift(document: &JsonValue) -> Result<DriftPolicyConfig, ConfigValidationError> {
    let section = policy_section(document, "drift_policy")?;
    let defaults = DriftPolicyConfig::default();

    let length_delta = require_number(&section, "drift_policy", "warn_length_delta_pct")?;
    if length_delta < 0.0 {
        return Err(ConfigValidationError::new(
            "Config key 'drift_policy.warn_length_delta_pct' must be >= 0.",
        ));
    }

    let short_ratio = require_number(&section, "drift_policy", "warn_short_ratio")?;
    if !(0.0..=1.0).contains(&short_ratio) {
        return Err(ConfigValidationError::new(
            "Config key 'drift_policy.warn_short_ratio' must be in [0, 1].",
        ));
    }

    let min_similarity = require_number(&section, "drift_policy", "warn_min_similarity")?;
    if !(0.0..=1.0).contains(&min_similarity) {
        return Err(ConfigValidationError::new(
            "Config key 'drift_policy.warn_min_similarity' must be in [0, 1].",
        ));
    }

    Ok(DriftPolicyConfig {
        warn_length_delta_pct: length_delta,
        warn_short_ratio: short_ratio,
        warn_min_similarity: min_similarity,
        semantic_check_enabled: optional_bool(
            &section,
            "drift_policy",
            "semantic_check_enabled",
            true,
        )?,
        similarity_method: optional_string(
            &section,
            "drift_policy",
            "similarity_method",
            &defaults.similarity_method,
        )?,
    })
}

fn convert_pii(document: &JsonValue) -> Result<PiiPolicyConfig, ConfigValidationError> {
    let section = policy_section(document, "pii_policy")?;

    let patterns_value = section.get("patterns").ok_or_else(|| {
        ConfigValidationError::new("Config key 'pii_policy.patterns' must be a JSON object.")
    })?;
    let patterns_map = patterns_value.as_object().ok_or_else(|| {
        ConfigValidationError::new("Config key 'pii_policy.patterns' must be a JSON object.")
    })?;

    let mut patterns: BTreeMap<String, Regex> = BTreeMap::new();
    for (label, value) in patterns_map {
        let source = value.as_str().ok_or_else(|| {
            ConfigValidationError::new(format!(
                "Config key 'pii_policy.patterns.{label}' must be a string."
            ))
        })?;
        let compiled = Regex::new(source).map_err(|err| {
            ConfigValidationError::new(format!(
                "Config key 'pii_policy.patterns.{label}' is not a valid regular expression: {err}."
            ))
        })?;
        patterns.insert(label.clone(), compiled);
    }

    let mut allowlist = Vec::new();
    match section.get("allowlist") {
        None | Some(JsonValue::Null) => {}
        Some(JsonValue::Array(items)) => {
            for (idx, item) in items.iter().enumerate() {
                let source = item.as_str().ok_or_else(|| {
                    ConfigValidationError::new(format!(
                        "Config key 'pii_policy.allowlist[{idx}]' must be a string."
                    ))
                })?;
                let compiled = Regex::new(source).map_err(|err| {
                    ConfigValidationError::new(format!(
                        "Config key 'pii_policy.allowlist[{idx}]' is not a valid regular expression: {err}."
                    ))
                })?;
                allowlist.push(compiled);
            }
        }
        Some(_) => {
            return Err(ConfigValidationError::new(
                "Config key 'pii_policy.allowlist' must be an array.",
            ));
        }
    }

    Ok(PiiPolicyConfig {
        patterns,
        allowlist,
    })
}

fn convert_output_contract(
    document: &JsonValue,
) -> Result<OutputContractConfig, ConfigValidationError> {
    let section = match document.get("output_contract_policy") {
        None | Some(JsonValue::Null) => return Ok(OutputContractConfig::default()),
        Some(value) => value.as_object().cloned().ok_or_else(|| {
            ConfigValidationError::new(
                "Config key 'output_contract_policy' must be a JSON object.",
            )
        })?,
    };

    Ok(OutputContractConfig {
        enabled: optional_bool(&section, "output_contract_policy", "enabled", true)?,
        block_on_invalid_json: optional_bool(
            &section,
            "output_contract_policy",
            "block_on_invalid_json",
            true,
        )?,
        warn_on_missing_keys: optional_bool(
            &section,
            "output_contract_policy",
            "warn_on_missing_keys",
            true,
        )?,
        warn_on_type_mismatch: optional_bool(
            &section,
            "output_contract_policy",
            "warn_on_type_mismatch",
            true,
        )?,
    })
}

fn convert_model_pricing(
    document: &JsonValue,
) -> Result<BTreeMap<String, ModelPricing>, ConfigValidationError> {
    let section = match document.get("model_pricing") {
        None | Some(JsonValue::Null) => return Ok(BTreeMap::new()),
        Some(value) => value.as_object().ok_or_else(|| {
            ConfigValidationError::new("Config key 'model_pricing' must be a JSON object.")
        })?,
    };

    let mut pricing = BTreeMap::new();
    for (model, value) in section {
        let entry = value.as_object().ok_or_else(|| {
            ConfigValidationError::new(format!(
                "Config key 'model_pricing.{model}' must be a JSON object."
            ))
        })?;
        pricing.insert(
            model.clone(),
            ModelPricing {
                input_per_1k: entry.get("input_per_1k").and_then(JsonValue::as_f64),
                output_per_1k: entry.get("output_per_1k").and_then(JsonValue::as_f64),
                per_1k: entry.get("per_1k").and_then(JsonValue::as_f64),
            },
        );
    }
    Ok(pricing)
}

/// A policy section must be an object; a missing section reads as empty so
/// the per-key errors below name the first missing threshold.
fn policy_section(
    document: &JsonValue,
    policy: &str,
) -> Result<Map<String, JsonValue>, ConfigValidationError> {
    match document.get(policy) {
        None => Ok(Map::new()),
        Some(value) => value.as_object().cloned().ok_or_else(|| {
            ConfigValidationError::new(format!("Config key '{policy}' must be a JSON object."))
        }),
    }
}

fn increase_thresholds(
    section: &Map<String, JsonValue>,
    policy: &str,
) -> Result<(f64, f64), ConfigValidationError> {
    let warn = require_number(section, policy, "warn_increase_pct")?;
    let block = require_number(section, policy, "block_increase_pct")?;
    if warn < 0.0 || block < 0.0 {
        return Err(ConfigValidationError::new(format!(
            "Config key '{policy}' thresholds must be >= 0."
        )));
    }
    if block < warn {
        return Err(ConfigValidationError::new(format!(
            "Config key '{policy}.block_increase_pct' must be >= '{policy}.warn_increase_pct'."
        )));
    }
    Ok((warn, block))
}

fn require_number(
    section: &Map<String, JsonValue>,
    policy: &str,
    key: &str,
) -> Result<f64, ConfigValidationError> {
    section
        .get(key)
        .and_then(JsonValue::as_f64)
        .ok_or_else(|| {
            ConfigValidationError::new(format!("Config key '{policy}.{key}' must be numeric."))
        })
}

fn optional_number(
    section: &Map<String, JsonValue>,
    policy: &str,
    key: &str,
    default: f64,
) -> Result<f64, ConfigValidationError> {
    match section.get(key) {
        None | Some(JsonValue::Null) => Ok(default),
        Some(value) => value.as_f64().ok_or_else(|| {
            ConfigValidationError::new(format!("Config key '{policy}.{key}' must be numeric."))
        }),
    }
}

fn optional_bool(
    section: &Map<String, JsonValue>,
    policy: &str,
    key: &str,
    default: bool,
) -> Result<bool, ConfigValidationError> {
    match section.get(key) {
        None | Some(JsonValue::Null) => Ok(default),
        Some(JsonValue::Bool(flag)) => Ok(*flag),
        Some(_) => Err(ConfigValidationError::new(format!(
            "Config key '{policy}.{key}' must be a boolean."
        ))),
    }
}

fn optional_string(
    section: &Map<String, JsonValue>,
    policy: &str,
    key: &str,
    default: &str,
) -> Result<String, ConfigValidationError> {
    match section.get(key) {
        None | Some(JsonValue::Null) => Ok(default.to_string()),
        Some(JsonValue::String(value)) => Ok(value.clone()),
        Some(_) => Err(ConfigValidationError::new(format!(
            "Config key '{policy}.{key}' must be a string."
        ))),
    }
}
