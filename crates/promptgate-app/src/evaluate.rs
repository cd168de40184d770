//! The evaluate use case: resolve config, run the engine, map exit codes.

use camino::{Utf8Path, Utf8PathBuf};
use promptgate_domain::{evaluate_records, AcceptedRisk, EvalMetadata, EvalOptions, RecordInput};
use promptgate_settings::{parse_config_json, resolve_config, ResolvedConfig};
use promptgate_types::{
    ConfigValidationError, Decision, EvalError, EvalMode, InputValidationError, Status,
};

/// Name of the env var that supplies a config path when `--config` is absent.
pub const CONFIG_PATH_ENV: &str = "PROMPTGATE_CONFIG";
/// Name of the env var that supplies an environment name when `--env` is absent.
pub const CONFIG_ENVIRONMENT_ENV: &str = "PROMPTGATE_ENV";

#[derive(Clone, Debug, Default)]
pub struct EvaluateRequest {
    pub baseline: RecordInput,
    pub candidate: RecordInput,
    pub strict: bool,
    pub mode: EvalMode,
    pub config_path: Option<Utf8PathBuf>,
    pub environment: Option<String>,
    pub preset: Option<String>,
    pub metadata: EvalMetadata,
    pub accepted_risks: Vec<AcceptedRisk>,
}

/// The single entrypoint CLI/API collaborators consume.
pub fn evaluate(request: &EvaluateRequest) -> Result<Decision, EvalError> {
    validate_mode_flags(request)?;

    let resolved = load_config(
        request.config_path.as_deref(),
        request.environment.as_deref(),
        request.preset.as_deref(),
    )?;

    let options = EvalOptions {
        strict: request.strict,
        mode: request.mode,
        accepted_risks: request.accepted_risks.clone(),
        metadata: request.metadata.clone(),
    };

    evaluate_records(
        request.baseline.clone(),
        request.candidate.clone(),
        &resolved.effective,
        &options,
    )
}

/// Custom config, presets, environments, and waiver clocks only exist in
/// full mode; lite mode allows one-shot `--accept-risk` overrides only.
fn validate_mode_flags(request: &EvaluateRequest) -> Result<(), InputValidationError> {
    if request.mode == EvalMode::Full {
        return Ok(());
    }

    let mut full_only_flags = Vec::new();
    if request.config_path.is_some() {
        full_only_flags.push("--config");
    }
    if request.preset.is_some() {
        full_only_flags.push("--preset");
    }
    if request.environment.is_some() {
        full_only_flags.push("--env");
    }
    if request.metadata.evaluation_time_raw().is_some() {
        full_only_flags.push("--now");
    }

    if full_only_flags.is_empty() {
        return Ok(());
    }
    Err(InputValidationError::new(format!(
        "{} require --mode full. Lite mode allows one-shot overrides via --accept-risk only.",
        full_only_flags.join(", ")
    )))
}

/// Resolve the effective config: read the custom document (explicit path or
/// `PROMPTGATE_CONFIG`), pick up `PROMPTGATE_ENV`, and hand everything to
/// the IO-free settings pipeline.
pub fn load_config(
    config_path: Option<&Utf8Path>,
    environment: Option<&str>,
    preset: Option<&str>,
) -> Result<ResolvedConfig, ConfigValidationError> {
    let chosen_path: Option<Utf8PathBuf> = config_path
        .map(Utf8Path::to_path_buf)
        .or_else(|| non_empty_env(CONFIG_PATH_ENV).map(Utf8PathBuf::from));

    let custom = match &chosen_path {
        None => None,
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|err| {
                ConfigValidationError::new(format!("Failed to read config file '{path}': {err}."))
            })?;
            Some(parse_config_json(&raw)?)
        }
    };

    let chosen_environment: Option<String> = environment
        .map(str::to_string)
        .or_else(|| non_empty_env(CONFIG_ENVIRONMENT_ENV));

    resolve_config(custom.as_ref(), chosen_environment.as_deref(), preset)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Exit-code threshold for CI: `warn` fails on WARN and BLOCK, `block`
/// fails only on BLOCK.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailOn {
    Warn,
    Block,
}

/// Map a decision status to an exit code. Without a threshold the exit code
/// is always 0; `--exit-codes` is shorthand for the `warn` threshold.
pub fn decision_exit_code(
    status: Status,
    exit_codes_enabled: bool,
    fail_on: Option<FailOn>,
) -> i32 {
    let threshold = fail_on.or(if exit_codes_enabled {
        Some(FailOn::Warn)
    } else {
        None
    });
    let Some(threshold) = threshold else {
        return 0;
    };

    match (threshold, status) {
        (FailOn::Warn, Status::Warn) => 1,
        (FailOn::Warn, Status::Block) => 2,
        (FailOn::Block, Status::Block) => 2,
        _ => 0,
    }
}

/// Recognized CI environments set `metadata.ci` on emitted decisions.
pub fn is_ci_environment() -> bool {
    let truthy = |name: &str| {
        std::env::var(name)
            .map(|value| {
                matches!(
                    value.trim().to_lowercase().as_str(),
                    "1" | "true" | "yes"
                )
            })
            .unwrap_or(false)
    };
    truthy("CI") || truthy("GITHUB_ACTIONS")
}
