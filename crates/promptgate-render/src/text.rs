use promptgate_types::{Decision, Status};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt::Write as _;

const SECTION_DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

const METRIC_DISPLAY_ORDER: &[&str] = &[
    "cost_delta_pct",
    "cost_delta_usd",
    "latency_delta_pct",
    "latency_delta_ms",
    "length_delta_pct",
    "short_ratio",
    "pii_blocked_total",
    "pii_blocked_type_count",
    "output_contract_invalid_json_count",
    "output_contract_missing_keys_count",
    "output_contract_type_mismatch_count",
    "similarity",
];

const POLICY_DISPLAY_ORDER: &[&str] = &["pii", "output_contract", "cost", "latency", "drift"];

pub fn render_text(decision: &Decision, exit_code: i32) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{SECTION_DIVIDER}");
    let _ = writeln!(out, "Promptgate Evaluation");
    let _ = writeln!(out, "{SECTION_DIVIDER}");
    out.push('\n');

    let _ = writeln!(out, "Mode: {}", decision.metadata.mode.as_str());
    out.push('\n');

    if !decision.metadata.accepted_risks.is_empty() {
        let _ = writeln!(
            out,
            "Accepted Risk Override (one-shot): {}",
            decision.metadata.accepted_risks.join(", ")
        );
        out.push('\n');
    }

    let _ = writeln!(out, "Final Decision: {}", decision.status.as_str());
    out.push('\n');

    let _ = writeln!(out, "Policy Results:");
    let statuses = policy_status_by_reason_code(&decision.reason_codes);
    for policy in POLICY_DISPLAY_ORDER {
        let status = statuses.get(*policy).copied().unwrap_or(Status::Allow);
        let _ = writeln!(
            out,
            "{} {}: {}",
            status_symbol(status),
            policy_label(policy),
            policy_detail(policy, status, &decision.metrics)
        );
    }
    out.push('\n');

    let metric_lines = metric_lines(&decision.metrics);
    if !metric_lines.is_empty() {
        let _ = writeln!(out, "Detailed Metrics:");
        for line in metric_lines {
            let _ = writeln!(out, "  {line}");
        }
        out.push('\n');
    }

    let _ = writeln!(out, "Summary:");
    render_summary(&mut out, decision);
    out.push('\n');

    if !decision.reason_codes.is_empty() {
        let _ = writeln!(out, "Reason Codes:");
        for code in &decision.reason_codes {
            let _ = writeln!(out, "  - {code}");
        }
        out.push('\n');
    }

    let _ = writeln!(out, "Exit Code: {exit_code}");
    let _ = writeln!(out, "{SECTION_DIVIDER}");

    out
}

fn render_summary(out: &mut String, decision: &Decision) {
    if decision.reasons.is_empty() {
        let _ = writeln!(out, "No risky deltas detected against configured policies.");
        return;
    }

    if decision.status == Status::Block {
        let block_reasons = reasons_with_severity(decision, Status::Block);
        if !block_reasons.is_empty() {
            for reason in &block_reasons {
                let _ = writeln!(out, "- {reason}");
            }
            let remaining = decision.reasons.len() - block_reasons.len();
            if remaining > 0 {
                let _ = writeln!(out, "{remaining} additional non-blocking signal(s) detected.");
            }
            return;
        }
    }

    let _ = writeln!(out, "{}", decision.reasons[0]);
    if decision.reasons.len() > 1 {
        let _ = writeln!(
            out,
            "{} additional signal(s) detected.",
            decision.reasons.len() - 1
        );
    }
}

fn reasons_with_severity(decision: &Decision, severity: Status) -> Vec<String> {
    decision
        .reasons
        .iter()
        .zip(decision.reason_codes.iter())
        .filter(|(_, code)| severity_from_code(code) == severity)
        .map(|(reason, _)| reason.clone())
        .collect()
}

fn policy_status_by_reason_code(reason_codes: &[String]) -> BTreeMap<&'static str, Status> {
    let mut statuses: BTreeMap<&'static str, Status> = POLICY_DISPLAY_ORDER
        .iter()
        .map(|policy| (*policy, Status::Allow))
        .collect();

    for code in reason_codes {
        let Some(policy) = policy_from_code(code) else {
            continue;
        };
        let severity = severity_from_code(code);
        let entry = statuses.entry(policy).or_insert(Status::Allow);
        *entry = (*entry).max(severity);
    }
    statuses
}

fn policy_from_code(code: &str) -> Option<&'static str> {
    if code.starts_with("PII_") {
        Some("pii")
    } else if code.starts_with("OUTPUT_CONTRACT_") {
        Some("output_contract")
    } else if code.starts_with("COST_") {
        Some("cost")
    } else if code.starts_with("LATENCY_") {
        Some("latency")
    } else if code.starts_with("DRIFT_") {
        Some("drift")
    } else {
        None
    }
}

fn severity_from_code(code: &str) -> Status {
    if code.ends_with("_BLOCK") {
        Status::Block
    } else if code.ends_with("_WARN") {
        Status::Warn
    } else {
        Status::Allow
    }
}

fn status_symbol(status: Status) -> &'static str {
    match status {
        Status::Block => "✗",
        Status::Warn => "⚠",
        Status::Allow => "✓",
    }
}

fn policy_label(policy: &str) -> &str {
    match policy {
        "pii" => "No PII detected",
        "output_contract" => "Response format",
        "cost" => "Cost",
        "latency" => "Latency",
        "drift" => "Output drift",
        other => other,
    }
}

fn policy_detail(policy: &str, status: Status, metrics: &BTreeMap<String, JsonValue>) -> String {
    let metric = |key: &str| metrics.get(key).and_then(JsonValue::as_f64);

    match policy {
        "pii" => match metric("pii_blocked_total") {
            Some(total) if total > 0.0 => format!("Detected {} match(es).", total as i64),
            _ => "No matches.".to_string(),
        },
        "output_contract" => {
            if metric("output_contract_invalid_json_count").unwrap_or(0.0) > 0.0 {
                return "Invalid JSON detected.".to_string();
            }
            let missing = metric("output_contract_missing_keys_count").unwrap_or(0.0) as i64;
            let mismatches = metric("output_contract_type_mismatch_count").unwrap_or(0.0) as i64;
            if missing > 0 || mismatches > 0 {
                return format!(
                    "Format drift detected (missing keys: {missing}, type mismatches: {mismatches})."
                );
            }
            "No schema drift detected.".to_string()
        }
        "cost" => match metric("cost_delta_pct") {
            Some(value) => format!("Delta {}.", format_metric_value("cost_delta_pct", value)),
            None => fallback_detail(status),
        },
        "latency" => match metric("latency_delta_pct") {
            Some(value) => format!("Delta {}.", format_metric_value("latency_delta_pct", value)),
            None => fallback_detail(status),
        },
        "drift" => {
            if let Some(length_delta) = metric("length_delta_pct") {
                if let Some(similarity) = metric("similarity") {
                    return format!(
                        "Length delta {}, similarity {}.",
                        format_metric_value("length_delta_pct", length_delta),
                        format_metric_value("similarity", similarity)
                    );
                }
                return format!(
                    "Length delta {}.",
                    format_metric_value("length_delta_pct", length_delta)
                );
            }
            if status == Status::Allow {
                return fallback_detail(status);
            }
            if let Some(short_ratio) = metric("short_ratio") {
                return format!(
                    "Compression ratio {}.",
                    format_metric_value("short_ratio", short_ratio)
                );
            }
            if let Some(similarity) = metric("similarity") {
                return format!(
                    "Similarity {}.",
                    format_metric_value("similarity", similarity)
                );
            }
            fallback_detail(status)
        }
        _ => fallback_detail(status),
    }
}

fn fallback_detail(status: Status) -> String {
    match status {
        Status::Block => "Policy violation detected.".to_string(),
        Status::Warn => "Risky delta detected.".to_string(),
        Status::Allow => "No issues.".to_string(),
    }
}

fn metric_lines(metrics: &BTreeMap<String, JsonValue>) -> Vec<String> {
    METRIC_DISPLAY_ORDER
        .iter()
        .filter_map(|key| {
            metrics
                .get(*key)
                .and_then(JsonValue::as_f64)
                .map(|value| format!("{}: {}", metric_label(key), format_metric_value(key, value)))
        })
        .collect()
}

fn metric_label(key: &str) -> &str {
    match key {
        "cost_delta_pct" => "Cost delta %",
        "cost_delta_usd" => "Cost delta USD",
        "latency_delta_pct" => "Latency delta %",
        "latency_delta_ms" => "Latency delta ms",
        "length_delta_pct" => "Length delta %",
        "short_ratio" => "Short ratio",
        "pii_blocked_total" => "PII blocked total",
        "pii_blocked_type_count" => "PII blocked type count",
        "output_contract_invalid_json_count" => "Output contract invalid JSON count",
        "output_contract_missing_keys_count" => "Output contract missing keys count",
        "output_contract_type_mismatch_count" => "Output contract type mismatch count",
        "similarity" => "Similarity",
        other => other,
    }
}

fn format_metric_value(key: &str, value: f64) -> String {
    if key.ends_with("_count") || key.ends_with("_total") {
        format!("{}", value as i64)
    } else if key.ends_with("_pct") {
        format!("{value:+.2}%")
    } else if key.ends_with("_usd") {
        format!("{value:+.6}")
    } else if key.ends_with("_ms") {
        format!("{value:+.2}")
    } else {
        format!("{value:.6}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptgate_types::{DecisionMetadata, EvalMode};
    use serde_json::json;

    fn decision(status: Status, reasons: &[&str], codes: &[&str]) -> Decision {
        Decision {
            schema_version: "1.0.0".to_string(),
            status,
            reasons: reasons.iter().map(|r| r.to_string()).collect(),
            reason_codes: codes.iter().map(|c| c.to_string()).collect(),
            metrics: BTreeMap::new(),
            metadata: DecisionMetadata::new(false, EvalMode::Lite),
            details: BTreeMap::new(),
        }
    }

    #[test]
    fn renders_one_line_per_policy_and_the_footer() {
        let out = render_text(&decision(Status::Allow, &[], &[]), 0);
        for label in [
            "No PII detected",
            "Response format",
            "Cost",
            "Latency",
            "Output drift",
        ] {
            assert!(out.contains(label), "missing policy line: {label}");
        }
        assert!(out.contains("Final Decision: ALLOW"));
        assert!(out.contains("No risky deltas detected against configured policies."));
        assert!(out.contains("Exit Code: 0"));
    }

    #[test]
    fn warn_decision_shows_the_first_reason_and_signal_count() {
        let out = render_text(
            &decision(
                Status::Warn,
                &["Cost increased by 25.0% (>20%).", "Latency data missing."],
                &["COST_INCREASE_WARN", "LATENCY_MISSING_DATA_WARN"],
            ),
            1,
        );
        assert!(out.contains("⚠ Cost"));
        assert!(out.contains("Cost increased by 25.0% (>20%)."));
        assert!(out.contains("1 additional signal(s) detected."));
        assert!(out.contains("  - COST_INCREASE_WARN"));
    }

    #[test]
    fn block_decision_lists_blocking_reasons_first() {
        let out = render_text(
            &decision(
                Status::Block,
                &["Cost increased by 25.0% (>20%).", "PII detected: EMAIL (2 match(es))."],
                &["COST_INCREASE_WARN", "PII_EMAIL_BLOCK"],
            ),
            2,
        );
        assert!(out.contains("- PII detected: EMAIL (2 match(es))."));
        assert!(out.contains("1 additional non-blocking signal(s) detected."));
        assert!(out.contains("✗ No PII detected"));
    }

    #[test]
    fn metrics_render_in_fixed_order_with_labels() {
        let mut d = decision(Status::Warn, &["x"], &["COST_INCREASE_WARN"]);
        d.metrics.insert("similarity".to_string(), json!(0.5));
        d.metrics.insert("cost_delta_pct".to_string(), json!(25.0));
        let out = render_text(&d, 0);

        let cost_idx = out.find("Cost delta %: +25.00%").unwrap();
        let sim_idx = out.find("Similarity: 0.500000").unwrap();
        assert!(cost_idx < sim_idx);
    }

    #[test]
    fn accepted_risks_are_surfaced() {
        let mut d = decision(Status::Allow, &[], &[]);
        d.metadata.accepted_risks = vec!["cost".to_string()];
        let out = render_text(&d, 0);
        assert!(out.contains("Accepted Risk Override (one-shot): cost"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let d = decision(Status::Warn, &["reason"], &["COST_INCREASE_WARN"]);
        assert_eq!(render_text(&d, 1), render_text(&d, 1));
    }
}
