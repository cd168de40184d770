use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Stable schema identifier for emitted decisions.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Gate status. Severity is intentionally small: it maps cleanly to CI signals.
///
/// Variants are ordered so that `max` picks the worst status.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Allow,
    Warn,
    Block,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Allow => "ALLOW",
            Status::Warn => "WARN",
            Status::Block => "BLOCK",
        }
    }
}

/// The closed set of policies. There is no plugin registry: the set is
/// stable and evaluators are invoked in [`POLICY_ORDER`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PolicyName {
    Cost,
    Latency,
    Pii,
    OutputContract,
    Drift,
}

/// Fixed evaluation and aggregation order. Reasons and codes in a decision
/// are concatenated in this order; reordering it is a wire-format change.
pub const POLICY_ORDER: [PolicyName; 5] = [
    PolicyName::Cost,
    PolicyName::Latency,
    PolicyName::Pii,
    PolicyName::OutputContract,
    PolicyName::Drift,
];

impl PolicyName {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyName::Cost => "cost",
            PolicyName::Latency => "latency",
            PolicyName::Pii => "pii",
            PolicyName::OutputContract => "output_contract",
            PolicyName::Drift => "drift",
        }
    }
}

/// One policy's verdict for a single evaluation.
///
/// Invariant: `reasons` and `codes` are parallel arrays — same length, same
/// order. Waiver application removes pairs in lock-step; everything else
/// treats a result as immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PolicyResult {
    pub policy: PolicyName,
    pub status: Status,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub codes: Vec<String>,

    /// Policy-specific structured payload (kept open-ended for forward compatibility).
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: JsonValue,
}

impl PolicyResult {
    pub fn allow(policy: PolicyName) -> Self {
        Self {
            policy,
            status: Status::Allow,
            reasons: Vec::new(),
            codes: Vec::new(),
            details: JsonValue::Null,
        }
    }

    pub fn allow_with_details(policy: PolicyName, details: JsonValue) -> Self {
        Self {
            details,
            ..Self::allow(policy)
        }
    }
}

/// A waiver that matched at least one removed reason code, surfaced in
/// decision metadata. Field order is part of the wire shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AppliedWaiver {
    pub reason_code: String,
    pub expires_at: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_by: Option<String>,
}

/// Execution mode for an evaluation.
///
/// `lite` runs only the cost and PII policies and refuses custom config
/// inputs; `full` runs all five policies and honors config, presets,
/// environments, and waivers.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum EvalMode {
    #[default]
    Lite,
    Full,
}

impl EvalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EvalMode::Lite => "lite",
            EvalMode::Full => "full",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DecisionMetadata {
    pub strict: bool,
    pub mode: EvalMode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_model: Option<String>,

    /// One-shot risk overrides accepted for this call (lite mode only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accepted_risks: Vec<String>,

    /// Waivers that suppressed at least one reason code, deduplicated and
    /// deterministically ordered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waivers_applied: Vec<AppliedWaiver>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    /// Set when the evaluation ran under a recognized CI environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci: Option<bool>,
}

impl DecisionMetadata {
    pub fn new(strict: bool, mode: EvalMode) -> Self {
        Self {
            strict,
            mode,
            baseline_model: None,
            candidate_model: None,
            accepted_risks: Vec::new(),
            waivers_applied: Vec::new(),
            project_key: None,
            run_id: None,
            ci: None,
        }
    }
}

/// The terminal aggregate: one ALLOW/WARN/BLOCK verdict plus supporting
/// reasons, public reason codes, rounded metrics, and per-policy details.
///
/// A decision is a pure function of (baseline, candidate, config, strict,
/// metadata, active waivers); identical inputs serialize byte-identically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Decision {
    pub schema_version: String,
    pub status: Status,
    pub reasons: Vec<String>,
    pub reason_codes: Vec<String>,

    /// Flat numeric metrics extracted from policy details, rounded to a
    /// fixed precision per metric key.
    pub metrics: BTreeMap<String, JsonValue>,

    pub metadata: DecisionMetadata,

    /// Raw per-policy details, keyed by policy name.
    pub details: BTreeMap<String, JsonValue>,
}
