//! CLI entry point for promptgate.
//!
//! This module is intentionally thin: it handles argument parsing, I/O, and
//! exit codes. All evaluation logic lives in the `promptgate-app` and
//! `promptgate-domain` crates.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use promptgate_app::{
    decision_exit_code, evaluate, is_ci_environment, load_config, read_record_input,
    record_from_value, split_combined_input, EvaluateRequest, FailOn, StdinCache,
};
use promptgate_domain::{AcceptedRisk, EvalMetadata, RecordInput};
use promptgate_types::{codes, Decision, EvalError, EvalMode, InputValidationError, SCHEMA_VERSION};
use serde_json::json;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "promptgate",
    version,
    about = "CI policy gate for LLM prompt and model changes"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare a baseline and a candidate invocation record.
    Evaluate(EvaluateArgs),

    /// Inspect promptgate configuration.
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Path to baseline JSON input (`-` for stdin).
    baseline: String,

    /// Path to candidate JSON input. If omitted, BASELINE must contain
    /// `{baseline: ..., candidate: ...}`.
    candidate: Option<String>,

    /// Execution mode: lite (default) or full.
    #[arg(long, value_enum, default_value = "lite")]
    mode: ModeArg,

    /// Promote WARN to BLOCK.
    #[arg(long)]
    strict: bool,

    /// Lite mode only. Explicitly accept a named risk for this run (repeatable).
    #[arg(long = "accept-risk", value_enum)]
    accept_risk: Vec<RiskArg>,

    /// Path to a custom JSON config (full mode).
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Built-in policy preset name (merged before --config).
    #[arg(long)]
    preset: Option<String>,

    /// Config environment name (for `environments.<name>` overrides).
    #[arg(long)]
    env: Option<String>,

    /// Evaluation time for waiver expiry checks (ISO-8601, e.g. 2026-02-15T00:00:00Z).
    #[arg(long)]
    now: Option<String>,

    /// Optional project identifier to include in decision metadata.
    #[arg(long = "project-key")]
    project_key: Option<String>,

    /// Optional run identifier to include in decision metadata.
    #[arg(long = "run-id")]
    run_id: Option<String>,

    /// Emit the JSON decision instead of the text report.
    #[arg(long)]
    json: bool,

    /// Return non-zero exit codes for WARN/BLOCK (useful for CI).
    #[arg(long = "exit-codes")]
    exit_codes: bool,

    /// Exit-code threshold: warn fails on WARN/BLOCK, block fails only on BLOCK.
    #[arg(long = "fail-on", value_enum)]
    fail_on: Option<FailOnArg>,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective merged config JSON.
    Print {
        /// Path to a custom JSON config.
        #[arg(long)]
        config: Option<Utf8PathBuf>,

        /// Built-in policy preset name (merged before --config).
        #[arg(long)]
        preset: Option<String>,

        /// Config environment name (for `environments.<name>` overrides).
        #[arg(long)]
        env: Option<String>,

        /// Emit compact JSON (no indentation).
        #[arg(long)]
        compact: bool,
    },

    /// List built-in preset names.
    Presets,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Lite,
    Full,
}

impl From<ModeArg> for EvalMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Lite => EvalMode::Lite,
            ModeArg::Full => EvalMode::Full,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RiskArg {
    Cost,
    Pii,
    Drift,
}

impl From<RiskArg> for AcceptedRisk {
    fn from(value: RiskArg) -> Self {
        match value {
            RiskArg::Cost => AcceptedRisk::Cost,
            RiskArg::Pii => AcceptedRisk::Pii,
            RiskArg::Drift => AcceptedRisk::Drift,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FailOnArg {
    Warn,
    Block,
}

impl From<FailOnArg> for FailOn {
    fn from(value: FailOnArg) -> Self {
        match value {
            FailOnArg::Warn => FailOn::Warn,
            FailOnArg::Block => FailOn::Block,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let code = match cli.cmd {
        Commands::Evaluate(args) => cmd_evaluate(&args),
        Commands::Config { cmd } => cmd_config(&cmd),
    };
    ExitCode::from(code.clamp(0, u8::MAX as i32) as u8)
}

fn cmd_evaluate(args: &EvaluateArgs) -> i32 {
    match run_evaluate(args) {
        Ok(code) => code,
        Err(err) => {
            emit_error(&err, args.json);
            1
        }
    }
}

fn run_evaluate(args: &EvaluateArgs) -> Result<i32, EvalError> {
    let (baseline, candidate) = read_inputs(args)?;

    let metadata = EvalMetadata {
        evaluation_time: args.now.clone(),
        project_key: args.project_key.clone(),
        run_id: args.run_id.clone(),
        ci: is_ci_environment().then_some(true),
        ..EvalMetadata::default()
    };

    let request = EvaluateRequest {
        baseline,
        candidate,
        strict: args.strict,
        mode: args.mode.into(),
        config_path: args.config.clone(),
        environment: args.env.clone(),
        preset: args.preset.clone(),
        metadata,
        accepted_risks: args.accept_risk.iter().map(|r| (*r).into()).collect(),
    };

    let decision = evaluate(&request)?;
    let exit_code = decision_exit_code(
        decision.status,
        args.exit_codes,
        args.fail_on.map(Into::into),
    );

    if args.json {
        println!("{}", serialize_decision(&decision)?);
    } else {
        print!("{}", promptgate_render::render_text(&decision, exit_code));
    }
    Ok(exit_code)
}

fn read_inputs(args: &EvaluateArgs) -> Result<(RecordInput, RecordInput), InputValidationError> {
    let mut stdin = StdinCache::default();
    match &args.candidate {
        None => {
            let payload = read_record_input(&args.baseline, &mut stdin)?;
            split_combined_input(&payload)
        }
        Some(candidate_path) => {
            let baseline = record_from_value(&read_record_input(&args.baseline, &mut stdin)?)?;
            let candidate = record_from_value(&read_record_input(candidate_path, &mut stdin)?)?;
            Ok((baseline, candidate))
        }
    }
}

fn serialize_decision(decision: &Decision) -> Result<String, InputValidationError> {
    serde_json::to_string_pretty(decision).map_err(|err| {
        InputValidationError::new(format!("Failed to serialize decision: {err}."))
    })
}

/// Failed evaluations still yield a BLOCK-shaped machine envelope under
/// `--json`, so CI consumers never have to parse stderr.
fn emit_error(err: &EvalError, json_output: bool) {
    if json_output {
        let code = match err {
            EvalError::Config(_) => codes::CONFIG_VALIDATION_ERROR,
            EvalError::Input(_) => codes::INPUT_VALIDATION_ERROR,
        };
        let envelope = json!({
            "schema_version": SCHEMA_VERSION,
            "status": "BLOCK",
            "reasons": [err.to_string()],
            "reason_codes": [code],
        });
        match serde_json::to_string_pretty(&envelope) {
            Ok(payload) => println!("{payload}"),
            Err(_) => eprintln!("ERROR: {err}"),
        }
    } else {
        eprintln!("ERROR: {err}");
    }
}

fn cmd_config(cmd: &ConfigCommands) -> i32 {
    match cmd {
        ConfigCommands::Print {
            config,
            preset,
            env,
            compact,
        } => {
            let resolved = match load_config(config.as_deref(), env.as_deref(), preset.as_deref())
            {
                Ok(resolved) => resolved,
                Err(err) => {
                    eprintln!("ERROR: {err}");
                    return 1;
                }
            };
            let rendered = if *compact {
                serde_json::to_string(&resolved.document)
            } else {
                serde_json::to_string_pretty(&resolved.document)
            };
            match rendered {
                Ok(payload) => {
                    println!("{payload}");
                    0
                }
                Err(err) => {
                    eprintln!("ERROR: {err}");
                    1
                }
            }
        }
        ConfigCommands::Presets => {
            for name in promptgate_settings::available_presets() {
                println!("{name}");
            }
            0
        }
    }
}
