use crate::aggregate::aggregate;
use crate::policies;
use crate::policy::EffectiveConfig;
use crate::record::{normalize_inputs, EvalMetadata, RecordInput};
use promptgate_types::{
    Decision, DecisionMetadata, EvalError, EvalMode, InputValidationError, PolicyName,
    PolicyResult, Status, SCHEMA_VERSION,
};
use promptgate_waivers::{apply_waivers, parse_evaluation_time};
use std::str::FromStr;

/// A one-shot risk override: suppresses one policy's findings for a single
/// call without touching configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AcceptedRisk {
    Cost,
    Pii,
    Drift,
}

impl AcceptedRisk {
    pub fn as_str(self) -> &'static str {
        match self {
            AcceptedRisk::Cost => "cost",
            AcceptedRisk::Pii => "pii",
            AcceptedRisk::Drift => "drift",
        }
    }

    fn policy(self) -> PolicyName {
        match self {
            AcceptedRisk::Cost => PolicyName::Cost,
            AcceptedRisk::Pii => PolicyName::Pii,
            AcceptedRisk::Drift => PolicyName::Drift,
        }
    }
}

impl FromStr for AcceptedRisk {
    type Err = InputValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "cost" => Ok(AcceptedRisk::Cost),
            "pii" => Ok(AcceptedRisk::Pii),
            "drift" => Ok(AcceptedRisk::Drift),
            other => Err(InputValidationError::new(format!(
                "Unknown accepted risk '{other}' (expected cost|pii|drift)."
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct EvalOptions {
    pub strict: bool,
    pub mode: EvalMode,
    pub accepted_risks: Vec<AcceptedRisk>,
    pub metadata: EvalMetadata,
}

/// Evaluate a baseline/candidate pair against a resolved config.
///
/// Pure apart from its inputs: identical arguments produce a byte-identical
/// decision. Policy evaluation, risk overrides, waiver application, and
/// aggregation happen strictly in that order.
pub fn evaluate_records(
    baseline: RecordInput,
    candidate: RecordInput,
    config: &EffectiveConfig,
    options: &EvalOptions,
) -> Result<Decision, EvalError> {
    if options.mode == EvalMode::Full && !options.accepted_risks.is_empty() {
        return Err(InputValidationError::new(
            "Accepted risks are only available in lite mode.",
        )
        .into());
    }

    let (baseline_record, candidate_record) =
        normalize_inputs(baseline, candidate, &options.metadata)?;

    let mut results = policies::run_all(&baseline_record, &candidate_record, config, options.mode);

    if !options.accepted_risks.is_empty() {
        suppress_accepted_risks(&mut results, &options.accepted_risks);
    }

    let mut applied_waivers = Vec::new();
    if !config.waivers.is_empty() {
        let raw_time = options.metadata.evaluation_time_raw().ok_or_else(|| {
            InputValidationError::new(
                "Waivers are configured, but metadata.evaluation_time is required (ISO-8601). \
                 Pass --now on the CLI or metadata.evaluation_time via the API.",
            )
        })?;
        let evaluation_time = parse_evaluation_time(raw_time)?;
        let (filtered, applied) = apply_waivers(results, &config.waivers, evaluation_time);
        results = filtered;
        applied_waivers = applied;
    }

    let aggregated = aggregate(&results, options.strict);

    let mut metadata = DecisionMetadata::new(options.strict, options.mode);
    metadata.baseline_model = baseline_record.model.clone();
    metadata.candidate_model = candidate_record.model.clone();
    metadata.accepted_risks = accepted_risk_names(&options.accepted_risks);
    metadata.waivers_applied = applied_waivers;
    metadata.project_key = options.metadata.project_key.clone();
    metadata.run_id = options.metadata.run_id.clone();
    metadata.ci = options.metadata.ci.filter(|&flag| flag);

    Ok(Decision {
        schema_version: SCHEMA_VERSION.to_string(),
        status: aggregated.status,
        reasons: aggregated.reasons,
        reason_codes: aggregated.reason_codes,
        metrics: aggregated.metrics,
        metadata,
        details: aggregated.details,
    })
}

/// Clear the findings of every policy named by an accepted risk, keeping
/// its details so metric extraction still sees the underlying numbers.
fn suppress_accepted_risks(results: &mut [PolicyResult], risks: &[AcceptedRisk]) {
    for result in results.iter_mut() {
        if risks.iter().any(|risk| risk.policy() == result.policy) {
            result.status = Status::Allow;
            result.reasons.clear();
            result.codes.clear();
        }
    }
}

fn accepted_risk_names(risks: &[AcceptedRisk]) -> Vec<String> {
    let mut names: Vec<String> = risks.iter().map(|r| r.as_str().to_string()).collect();
    names.sort();
    names.dedup();
    names
}
