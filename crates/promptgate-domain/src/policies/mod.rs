use crate::policy::EffectiveConfig;
use crate::record::InvocationRecord;
use promptgate_types::{EvalMode, PolicyResult};

pub mod cost;
pub mod drift;
pub mod latency;
pub mod output_contract;
pub mod pii;


/// Run the policies for the requested mode, in the fixed evaluation order.
/// Lite mode runs only the cost and PII policies.
pub fn run_all(
    baseline: &InvocationRecord,
    candidate: &InvocationRecord,
    cfg: &EffectiveConfig,
    mode: EvalMode,
) -> Vec<PolicyResult> {
    match mode {
        EvalMode::Lite => vec![
            cost::evaluate(baseline, candidate, &cfg.cost, &cfg.model_pricing),
            pii::evaluate(candidate, &cfg.pii),
        ],
        EvalMode::Full => vec![
            cost::evaluate(baseline, candidate, &cfg.cost, &cfg.model_pricing),
            latency::evaluate(baseline, candidate, &cfg.latency),
            pii::evaluate(candidate, &cfg.pii),
            output_contract::evaluate(baseline, candidate, &cfg.output_contract),
            drift::evaluate(baseline, candidate, &cfg.drift),
        ],
    }
}
