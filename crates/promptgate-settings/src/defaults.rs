use serde_json::{json, Value as JsonValue};

/// The built-in policy document every merge pipeline starts from.
///
/// Thresholds here are the documented defaults; presets and custom config
/// documents override them key-wise.
pub fn default_config() -> JsonValue {
    json!({
        "cost_policy": {
            "warn_increase_pct": 20,
            "block_increase_pct": 35,
            "min_baseline_cost_usd": 0.01,
            "warn_delta_usd": 0,
            "block_delta_usd": 0,
        },
        "latency_policy": {
            "warn_increase_pct": 30,
            "block_increase_pct": 60,
            "min_baseline_latency_ms": 50,
            "warn_delta_ms": 0,
            "block_delta_ms": 0,
        },
        "pii_policy": {
            "patterns": {
                "email": r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}",
                "phone": r"(?:\+\d{1,2}[ .-]?)?\(?\d{3}\)?[ .-]?\d{3}[ .-]?\d{4}",
                "ssn": r"\b\d{3}-\d{2}-\d{4}\b",
                "credit_card": r"\b\d(?:[ -]?\d){12,18}\b",
            },
            "allowlist": [],
        },
        "output_contract_policy": {
            "enabled": true,
            "block_on_invalid_json": true,
            "warn_on_missing_keys": true,
            "warn_on_type_mismatch": true,
        },
        "drift_policy": {
            "warn_length_delta_pct": 60,
            "warn_short_ratio": 0.35,
            "warn_min_similarity": 0.15,
            "semantic_check_enabled": true,
            "similarity_method": "max(token_jaccard,char_3gram_jaccard)",
        },
        "model_pricing": {},
    })
}
