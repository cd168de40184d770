//! End-to-end tests for `promptgate evaluate`.

use assert_cmd::Command;
use serde_json::{json, Value as JsonValue};
use std::path::{Path, PathBuf};

fn write_json(dir: &Path, name: &str, value: &JsonValue) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
    path
}

fn promptgate() -> Command {
    let mut cmd = Command::cargo_bin("promptgate").unwrap();
    // Keep host CI configuration out of the decisions under test.
    cmd.env_remove("PROMPTGATE_CONFIG")
        .env_remove("PROMPTGATE_ENV")
        .env_remove("CI")
        .env_remove("GITHUB_ACTIONS");
    cmd
}

fn warn_pair(dir: &Path) -> (PathBuf, PathBuf) {
    let baseline = write_json(dir, "baseline.json", &json!({"output": "hello", "cost_usd": 1.0}));
    let candidate = write_json(
        dir,
        "candidate.json",
        &json!({"output": "hello world", "cost_usd": 1.25}),
    );
    (baseline, candidate)
}

#[test]
fn evaluate_emits_a_json_decision() {
    let dir = tempfile::tempdir().unwrap();
    let (baseline, candidate) = warn_pair(dir.path());

    let output = promptgate()
        .args(["evaluate", baseline.to_str().unwrap(), candidate.to_str().unwrap(), "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let payload: JsonValue = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["schema_version"], json!("1.0.0"));
    assert_eq!(payload["status"], json!("WARN"));
    assert!(payload["reason_codes"]
        .as_array()
        .unwrap()
        .contains(&json!("COST_INCREASE_WARN")));
    assert_eq!(payload["metadata"]["mode"], json!("lite"));
}

#[test]
fn strict_mode_blocks_in_the_text_report() {
    let dir = tempfile::tempdir().unwrap();
    let (baseline, candidate) = warn_pair(dir.path());

    promptgate()
        .args(["evaluate", baseline.to_str().unwrap(), candidate.to_str().unwrap(), "--strict"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Final Decision: BLOCK"))
        .stdout(predicates::str::contains("STRICT_MODE_PROMOTION_BLOCK"));
}

#[test]
fn exit_codes_flag_fails_warn_decisions() {
    let dir = tempfile::tempdir().unwrap();
    let (baseline, candidate) = warn_pair(dir.path());

    promptgate()
        .args([
            "evaluate",
            baseline.to_str().unwrap(),
            candidate.to_str().unwrap(),
            "--exit-codes",
        ])
        .assert()
        .code(1);
}

#[test]
fn combined_single_file_input_is_split() {
    let dir = tempfile::tempdir().unwrap();
    let payload = write_json(
        dir.path(),
        "payload.json",
        &json!({
            "baseline": {"output": "hello", "cost_usd": 1.0},
            "candidate": {"output": "hello world", "cost_usd": 1.25},
        }),
    );

    promptgate()
        .args(["evaluate", payload.to_str().unwrap(), "--exit-codes"])
        .assert()
        .code(1);
}

#[test]
fn stdin_supplies_the_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let candidate = write_json(
        dir.path(),
        "candidate.json",
        &json!({"output": "hello world", "cost_usd": 1.25}),
    );

    promptgate()
        .args(["evaluate", "-", candidate.to_str().unwrap(), "--exit-codes", "--json"])
        .write_stdin(serde_json::to_string(&json!({"output": "hello", "cost_usd": 1.0})).unwrap())
        .assert()
        .code(1);
}

#[test]
fn lite_mode_rejects_full_only_flags() {
    let dir = tempfile::tempdir().unwrap();
    let (baseline, candidate) = warn_pair(dir.path());
    let config = write_json(dir.path(), "policy.json", &json!({}));

    promptgate()
        .args([
            "evaluate",
            baseline.to_str().unwrap(),
            candidate.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .code(1)
        .stderr(predicates::str::contains("require --mode full"));
}

#[test]
fn full_mode_rejects_accepted_risks() {
    let dir = tempfile::tempdir().unwrap();
    let (baseline, candidate) = warn_pair(dir.path());

    promptgate()
        .args([
            "evaluate",
            baseline.to_str().unwrap(),
            candidate.to_str().unwrap(),
            "--mode",
            "full",
            "--accept-risk",
            "cost",
        ])
        .assert()
        .code(1)
        .stderr(predicates::str::contains("lite mode"));
}

#[test]
fn accepted_cost_risk_downgrades_to_allow() {
    let dir = tempfile::tempdir().unwrap();
    let (baseline, candidate) = warn_pair(dir.path());

    let output = promptgate()
        .args([
            "evaluate",
            baseline.to_str().unwrap(),
            candidate.to_str().unwrap(),
            "--accept-risk",
            "cost",
            "--json",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let payload: JsonValue = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["status"], json!("ALLOW"));
    assert_eq!(payload["metadata"]["accepted_risks"], json!(["cost"]));
}

#[test]
fn pii_violations_block_with_counted_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let baseline = write_json(dir.path(), "baseline.json", &json!({"output": "hello"}));
    let candidate = write_json(
        dir.path(),
        "candidate.json",
        &json!({"output": "contact me at hi@example.com and alt@example.com", "cost_usd": 1.0}),
    );

    let output = promptgate()
        .args([
            "evaluate",
            baseline.to_str().unwrap(),
            candidate.to_str().unwrap(),
            "--json",
            "--fail-on",
            "block",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let payload: JsonValue = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["status"], json!("BLOCK"));
    assert!(payload["reason_codes"]
        .as_array()
        .unwrap()
        .contains(&json!("PII_EMAIL_BLOCK")));
    assert_eq!(payload["metrics"]["pii_blocked_total"], json!(2));
    assert_eq!(payload["metrics"]["pii_blocked_type_count"], json!(1));
}

fn waiver_config(dir: &Path, expires_at: &str) -> PathBuf {
    write_json(
        dir,
        "policy.json",
        &json!({
            "waivers": [{
                "reason_code": "COST_INCREASE_WARN",
                "expires_at": expires_at,
                "reason": "Known cost variance for dev.",
                "issued_by": "team-ai",
                "ticket": "PG-123",
            }],
        }),
    )
}

#[test]
fn active_waiver_suppresses_the_warning() {
    let dir = tempfile::tempdir().unwrap();
    let baseline = write_json(
        dir.path(),
        "baseline.json",
        &json!({"output": "hello", "cost_usd": 1.0, "latency_ms": 100}),
    );
    let candidate = write_json(
        dir.path(),
        "candidate.json",
        &json!({"output": "hello", "cost_usd": 1.25, "latency_ms": 100}),
    );
    let config = waiver_config(dir.path(), "2026-12-31T00:00:00Z");

    let output = promptgate()
        .args([
            "evaluate",
            baseline.to_str().unwrap(),
            candidate.to_str().unwrap(),
            "--mode",
            "full",
            "--config",
            config.to_str().unwrap(),
            "--now",
            "2026-02-15T00:00:00Z",
            "--json",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let payload: JsonValue = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["status"], json!("ALLOW"));
    assert_eq!(payload["reason_codes"], json!([]));
    assert_eq!(
        payload["metadata"]["waivers_applied"][0]["reason_code"],
        json!("COST_INCREASE_WARN")
    );
    assert_eq!(
        payload["metadata"]["waivers_applied"][0]["expires_at"],
        json!("2026-12-31T00:00:00Z")
    );
}

#[test]
fn expired_waiver_leaves_the_warning_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let baseline = write_json(
        dir.path(),
        "baseline.json",
        &json!({"output": "hello", "cost_usd": 1.0, "latency_ms": 100}),
    );
    let candidate = write_json(
        dir.path(),
        "candidate.json",
        &json!({"output": "hello", "cost_usd": 1.25, "latency_ms": 100}),
    );
    let config = waiver_config(dir.path(), "2026-01-01T00:00:00Z");

    let output = promptgate()
        .args([
            "evaluate",
            baseline.to_str().unwrap(),
            candidate.to_str().unwrap(),
            "--mode",
            "full",
            "--config",
            config.to_str().unwrap(),
            "--now",
            "2026-02-15T00:00:00Z",
            "--json",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let payload: JsonValue = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["status"], json!("WARN"));
    assert!(payload["reason_codes"]
        .as_array()
        .unwrap()
        .contains(&json!("COST_INCREASE_WARN")));
    assert!(payload["metadata"].get("waivers_applied").is_none());
}

#[test]
fn waivers_without_a_clock_fail_fast() {
    let dir = tempfile::tempdir().unwrap();
    let (baseline, candidate) = warn_pair(dir.path());
    let config = waiver_config(dir.path(), "2026-12-31T00:00:00Z");

    let output = promptgate()
        .args([
            "evaluate",
            baseline.to_str().unwrap(),
            candidate.to_str().unwrap(),
            "--mode",
            "full",
            "--config",
            config.to_str().unwrap(),
            "--json",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let payload: JsonValue = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["status"], json!("BLOCK"));
    assert_eq!(payload["reason_codes"], json!(["INPUT_VALIDATION_ERROR"]));
}

#[test]
fn malformed_waiver_config_produces_an_error_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let (baseline, candidate) = warn_pair(dir.path());
    let config = write_json(dir.path(), "policy.json", &json!({"waivers": {}}));

    let output = promptgate()
        .args([
            "evaluate",
            baseline.to_str().unwrap(),
            candidate.to_str().unwrap(),
            "--mode",
            "full",
            "--config",
            config.to_str().unwrap(),
            "--json",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let payload: JsonValue = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["schema_version"], json!("1.0.0"));
    assert_eq!(payload["status"], json!("BLOCK"));
    assert_eq!(payload["reason_codes"], json!(["CONFIG_VALIDATION_ERROR"]));
}

#[test]
fn identical_runs_emit_identical_json() {
    let dir = tempfile::tempdir().unwrap();
    let (baseline, candidate) = warn_pair(dir.path());

    let run = || {
        promptgate()
            .args([
                "evaluate",
                baseline.to_str().unwrap(),
                candidate.to_str().unwrap(),
                "--mode",
                "full",
                "--json",
            ])
            .output()
            .unwrap()
            .stdout
    };
    assert_eq!(run(), run());
}
