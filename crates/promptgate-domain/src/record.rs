//! Invocation records and input normalization.
//!
//! Each evaluation builds its baseline/candidate records fresh from raw
//! input plus metadata overrides; records are immutable afterwards.

use promptgate_types::InputValidationError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Raw record shape as supplied by callers. Every field is optional here;
/// unknown keys in the source document are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecordInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_in: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_out: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl RecordInput {
    /// Record carrying only an output text (the flat-string input shape).
    pub fn from_output(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..Self::default()
        }
    }
}

/// A normalized record: `output` is guaranteed present.
#[derive(Clone, Debug, PartialEq)]
pub struct InvocationRecord {
    pub output: String,
    pub cost_usd: Option<f64>,
    pub tokens_in: Option<f64>,
    pub tokens_out: Option<f64>,
    pub tokens_total: Option<f64>,
    pub latency_ms: Option<f64>,
    pub model: Option<String>,
}

/// Recognized metadata keys. Record-field overrides only fill fields that
/// are absent from the explicit record; `evaluation_time`/`now` feed the
/// waiver expiry check; the rest passes through into decision metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvalMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_tokens: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_tokens: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_tokens_in: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_tokens_out: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_tokens_in: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_tokens_out: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_cost_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_cost_usd: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci: Option<bool>,
}

impl EvalMetadata {
    /// The evaluation timestamp, with `evaluation_time` winning over `now`.
    pub fn evaluation_time_raw(&self) -> Option<&str> {
        self.evaluation_time
            .as_deref()
            .or(self.now.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Build the canonical baseline/candidate pair from raw inputs plus
/// metadata overrides. Fails if either side still lacks an output.
pub fn normalize_inputs(
    baseline: RecordInput,
    candidate: RecordInput,
    metadata: &EvalMetadata,
) -> Result<(InvocationRecord, InvocationRecord), InputValidationError> {
    let baseline = normalize_side(baseline, metadata, Side::Baseline)?;
    let candidate = normalize_side(candidate, metadata, Side::Candidate)?;
    Ok((baseline, candidate))
}

#[derive(Clone, Copy)]
enum Side {
    Baseline,
    Candidate,
}

fn normalize_side(
    input: RecordInput,
    metadata: &EvalMetadata,
    side: Side,
) -> Result<InvocationRecord, InputValidationError> {
    let (tokens_total, tokens_in, tokens_out, model, latency_ms, cost_usd, label) = match side {
        Side::Baseline => (
            metadata.baseline_tokens,
            metadata.baseline_tokens_in,
            metadata.baseline_tokens_out,
            metadata.baseline_model.as_ref(),
            metadata.baseline_latency_ms,
            metadata.baseline_cost_usd,
            "Baseline",
        ),
        Side::Candidate => (
            metadata.candidate_tokens,
            metadata.candidate_tokens_in,
            metadata.candidate_tokens_out,
            metadata.candidate_model.as_ref(),
            metadata.candidate_latency_ms,
            metadata.candidate_cost_usd,
            "Candidate",
        ),
    };

    let output = input
        .output
        .ok_or_else(|| InputValidationError::new(format!("{label} output is required.")))?;

    Ok(InvocationRecord {
        output,
        cost_usd: input.cost_usd.or(cost_usd),
        tokens_in: input.tokens_in.or(tokens_in),
        tokens_out: input.tokens_out.or(tokens_out),
        tokens_total: input.tokens_total.or(tokens_total),
        latency_ms: input.latency_ms.or(latency_ms),
        model: input.model.or_else(|| model.cloned()),
    })
}
