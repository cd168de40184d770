//! Stable reason-code identifiers and the internal ↔ public translation
//! tables.
//!
//! Internal codes are what policy evaluators emit; public codes are what a
//! decision carries (and what waivers name). The enumeration is closed, so
//! both directions are compile-time constant tables. Codes without a table
//! entry translate as identity.

use crate::decision::Status;

// Internal codes: cost
pub const COST_WARN_INCREASE: &str = "COST_WARN_INCREASE";
pub const COST_BLOCK_INCREASE: &str = "COST_BLOCK_INCREASE";
pub const COST_WARN_MISSING_DATA: &str = "COST_WARN_MISSING_DATA";
pub const COST_WARN_LOW_BASELINE: &str = "COST_WARN_LOW_BASELINE";

// Internal codes: latency
pub const LATENCY_WARN_INCREASE: &str = "LATENCY_WARN_INCREASE";
pub const LATENCY_BLOCK_INCREASE: &str = "LATENCY_BLOCK_INCREASE";
pub const LATENCY_WARN_MISSING_DATA: &str = "LATENCY_WARN_MISSING_DATA";
pub const LATENCY_WARN_LOW_BASELINE: &str = "LATENCY_WARN_LOW_BASELINE";

// Internal codes: pii. Labels beyond the built-in four produce
// `PII_BLOCK_<LABEL>` dynamically via [`pii_internal_code`].
pub const PII_BLOCK_PREFIX: &str = "PII_BLOCK_";

// Internal codes: output contract
pub const CONTRACT_BLOCK_INVALID_JSON: &str = "CONTRACT_BLOCK_INVALID_JSON";
pub const CONTRACT_WARN_INVALID_JSON: &str = "CONTRACT_WARN_INVALID_JSON";
pub const CONTRACT_BLOCK_TYPE_CHANGE: &str = "CONTRACT_BLOCK_TYPE_CHANGE";
pub const CONTRACT_WARN_MISSING_KEYS: &str = "CONTRACT_WARN_MISSING_KEYS";
pub const CONTRACT_WARN_TYPE_MISMATCH: &str = "CONTRACT_WARN_TYPE_MISMATCH";

// Internal codes: drift
pub const DRIFT_BLOCK_EMPTY: &str = "DRIFT_BLOCK_EMPTY";
pub const DRIFT_WARN_LENGTH_DELTA: &str = "DRIFT_WARN_LENGTH_DELTA";
pub const DRIFT_WARN_SHORT_OUTPUT: &str = "DRIFT_WARN_SHORT_OUTPUT";
pub const DRIFT_WARN_LOW_SIMILARITY: &str = "DRIFT_WARN_LOW_SIMILARITY";

// Internal codes: aggregator
pub const STRICT_PROMOTED_WARN: &str = "STRICT_PROMOTED_WARN";

// Error-envelope codes (never emitted by policies; used by collaborators
// mapping a failed evaluation to a BLOCK-shaped payload).
pub const CONFIG_VALIDATION_ERROR: &str = "CONFIG_VALIDATION_ERROR";
pub const INPUT_VALIDATION_ERROR: &str = "INPUT_VALIDATION_ERROR";

/// Internal → public code pairs. Public codes carry the `_WARN`/`_BLOCK`
/// severity suffix so severity is recoverable from the code alone.
pub const INTERNAL_TO_PUBLIC: &[(&str, &str)] = &[
    (COST_WARN_INCREASE, "COST_INCREASE_WARN"),
    (COST_BLOCK_INCREASE, "COST_INCREASE_BLOCK"),
    (COST_WARN_MISSING_DATA, "COST_MISSING_DATA_WARN"),
    (COST_WARN_LOW_BASELINE, "COST_LOW_BASELINE_WARN"),
    (LATENCY_WARN_INCREASE, "LATENCY_INCREASE_WARN"),
    (LATENCY_BLOCK_INCREASE, "LATENCY_INCREASE_BLOCK"),
    (LATENCY_WARN_MISSING_DATA, "LATENCY_MISSING_DATA_WARN"),
    (LATENCY_WARN_LOW_BASELINE, "LATENCY_LOW_BASELINE_WARN"),
    ("PII_BLOCK_EMAIL", "PII_EMAIL_BLOCK"),
    ("PII_BLOCK_PHONE", "PII_PHONE_BLOCK"),
    ("PII_BLOCK_SSN", "PII_SSN_BLOCK"),
    ("PII_BLOCK_CREDIT_CARD", "PII_CREDIT_CARD_BLOCK"),
    (CONTRACT_BLOCK_INVALID_JSON, "OUTPUT_CONTRACT_INVALID_JSON_BLOCK"),
    (CONTRACT_WARN_INVALID_JSON, "OUTPUT_CONTRACT_INVALID_JSON_WARN"),
    (CONTRACT_BLOCK_TYPE_CHANGE, "OUTPUT_CONTRACT_TYPE_CHANGE_BLOCK"),
    (CONTRACT_WARN_MISSING_KEYS, "OUTPUT_CONTRACT_MISSING_KEYS_WARN"),
    (CONTRACT_WARN_TYPE_MISMATCH, "OUTPUT_CONTRACT_TYPE_MISMATCH_WARN"),
    (DRIFT_BLOCK_EMPTY, "DRIFT_EMPTY_OUTPUT_BLOCK"),
    (DRIFT_WARN_LENGTH_DELTA, "DRIFT_LENGTH_DELTA_WARN"),
    (DRIFT_WARN_SHORT_OUTPUT, "DRIFT_SHORT_OUTPUT_WARN"),
    (DRIFT_WARN_LOW_SIMILARITY, "DRIFT_LOW_SIMILARITY_WARN"),
    (STRICT_PROMOTED_WARN, "STRICT_MODE_PROMOTION_BLOCK"),
];

/// Translate an internal code to its public reason code (identity if unmapped).
pub fn to_public_code(internal: &str) -> &str {
    INTERNAL_TO_PUBLIC
        .iter()
        .find(|(i, _)| *i == internal)
        .map_or(internal, |(_, p)| *p)
}

/// Translate a public reason code back to its internal code (identity if unmapped).
pub fn to_internal_code(public: &str) -> &str {
    INTERNAL_TO_PUBLIC
        .iter()
        .find(|(_, p)| *p == public)
        .map_or(public, |(i, _)| *i)
}

/// Internal code for a PII label (label is uppercased).
pub fn pii_internal_code(label: &str) -> String {
    format!("{PII_BLOCK_PREFIX}{}", label.to_uppercase())
}

/// Severity of an internal code, judged on its public translation.
///
/// Unrecognized codes classify as WARN: conservative, but never promotes a
/// decision to BLOCK on an unknown string.
pub fn severity_of_internal(internal: &str) -> Status {
    if to_public_code(internal).ends_with("_BLOCK") {
        Status::Block
    } else {
        Status::Warn
    }
}
