use serde_json::{json, Value as JsonValue};

/// Preset profiles are opinionated partial documents merged between the
/// defaults and any custom config. Keep these small and readable; anything
/// complex belongs in repo config.
pub fn available_presets() -> &'static [&'static str] {
    &["relaxed", "strict"]
}

pub fn preset(name: &str) -> Option<JsonValue> {
    match name {
        "strict" => Some(strict_preset()),
        "relaxed" => Some(relaxed_preset()),
        _ => None,
    }
}

fn strict_preset() -> JsonValue {
    json!({
        "cost_policy": {"warn_increase_pct": 10, "block_increase_pct": 20},
        "latency_policy": {"warn_increase_pct": 15, "block_increase_pct": 30},
        "drift_policy": {
            "warn_length_delta_pct": 40,
            "warn_short_ratio": 0.5,
            "warn_min_similarity": 0.3,
        },
        "output_contract_policy": {"block_on_invalid_json": true},
    })
}

fn relaxed_preset() -> JsonValue {
    json!({
        "cost_policy": {"warn_increase_pct": 40, "block_increase_pct": 75},
        "latency_policy": {"warn_increase_pct": 60, "block_increase_pct": 120},
        "drift_policy": {
            "warn_length_delta_pct": 100,
            "warn_short_ratio": 0.2,
            "warn_min_similarity": 0.05,
        },
        "output_contract_policy": {"block_on_invalid_json": false},
    })
}
