use crate::timestamp::parse_utc_timestamp;
use promptgate_types::codes::{severity_of_internal, to_internal_code};
use promptgate_types::{AppliedWaiver, ConfigValidationError, PolicyResult, Status};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use time::OffsetDateTime;

/// A validated waiver: one public reason code suppressed until an expiry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Waiver {
    pub reason_code: String,
    /// Original expiry string, surfaced verbatim in decision metadata.
    pub expires_at: String,
    /// Expiry normalized to UTC, used for the active-at check.
    pub expires_at_utc: OffsetDateTime,
    pub reason: String,
    pub issued_by: Option<String>,
    pub ticket: Option<String>,
}

impl Waiver {
    /// A waiver is active at `now` iff `now <= expires_at`.
    pub fn active_at(&self, now: OffsetDateTime) -> bool {
        now <= self.expires_at_utc
    }

    fn sort_key(&self) -> (&str, &str, &str) {
        (&self.reason_code, &self.expires_at, &self.reason)
    }

    fn to_applied(&self) -> AppliedWaiver {
        AppliedWaiver {
            reason_code: self.reason_code.clone(),
            expires_at: self.expires_at.clone(),
            reason: self.reason.clone(),
            ticket: self.ticket.clone(),
            issued_by: self.issued_by.clone(),
        }
    }
}

/// Parse the `waivers` config section. `None` (absent) parses as empty.
///
/// Fails fast on a non-array section, non-object entries, missing or empty
/// required fields, and unparseable expiry timestamps. The returned list is
/// deterministically ordered.
pub fn parse_waivers(raw: Option<&JsonValue>) -> Result<Vec<Waiver>, ConfigValidationError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    if raw.is_null() {
        return Ok(Vec::new());
    }
    let entries = raw.as_array().ok_or_else(|| {
        ConfigValidationError::new("Config key 'waivers' must be an array.")
    })?;

    let mut waivers = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        let object = entry.as_object().ok_or_else(|| {
            ConfigValidationError::new(format!("Config key 'waivers[{idx}]' must be an object."))
        })?;

        let reason_code = required_string(object, "reason_code", idx)?;
        let expires_at = required_string(object, "expires_at", idx)?;
        let reason = required_string(object, "reason", idx)?;

        let expires_at_utc = parse_utc_timestamp(&expires_at).ok_or_else(|| {
            ConfigValidationError::new(format!(
                "Config key 'waivers[{idx}].expires_at' is not a valid ISO-8601 timestamp: '{expires_at}'."
            ))
        })?;

        let issued_by = optional_string(object, "issued_by", idx)?;
        let ticket = optional_string(object, "ticket", idx)?;

        waivers.push(Waiver {
            reason_code,
            expires_at,
            expires_at_utc,
            reason,
            issued_by,
            ticket,
        });
    }

    waivers.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    Ok(waivers)
}

fn required_string(
    object: &serde_json::Map<String, JsonValue>,
    key: &str,
    idx: usize,
) -> Result<String, ConfigValidationError> {
    match object.get(key).and_then(JsonValue::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigValidationError::new(format!(
            "Config key 'waivers[{idx}].{key}' must be a non-empty string."
        ))),
    }
}

fn optional_string(
    object: &serde_json::Map<String, JsonValue>,
    key: &str,
    idx: usize,
) -> Result<Option<String>, ConfigValidationError> {
    match object.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(value)) => Ok(Some(value.trim().to_string())),
        Some(_) => Err(ConfigValidationError::new(format!(
            "Config key 'waivers[{idx}].{key}' must be a string."
        ))),
    }
}

/// Remove reason/code pairs matched by an active waiver from every policy
/// result and recompute each result's status from its remaining codes.
///
/// Returns the filtered results plus the waivers that matched at least one
/// removed code (deduplicated by reason code, deterministically ordered).
/// With no active waivers the results pass through untouched.
pub fn apply_waivers(
    results: Vec<PolicyResult>,
    waivers: &[Waiver],
    evaluation_time: OffsetDateTime,
) -> (Vec<PolicyResult>, Vec<AppliedWaiver>) {
    let active: Vec<&Waiver> = waivers.iter().filter(|w| w.active_at(evaluation_time)).collect();
    if active.is_empty() {
        return (results, Vec::new());
    }

    let waived_internal: BTreeSet<&str> = active
        .iter()
        .map(|w| to_internal_code(&w.reason_code))
        .collect();

    let mut filtered = Vec::with_capacity(results.len());
    let mut applied: BTreeMap<String, AppliedWaiver> = BTreeMap::new();

    for result in results {
        let mut kept_reasons = Vec::with_capacity(result.reasons.len());
        let mut kept_codes = Vec::with_capacity(result.codes.len());

        for (reason, code) in result.reasons.iter().zip(result.codes.iter()) {
            if waived_internal.contains(code.as_str()) {
                let public = promptgate_types::codes::to_public_code(code);
                if let Some(waiver) = active.iter().find(|w| w.reason_code == public) {
                    applied
                        .entry(waiver.reason_code.clone())
                        .or_insert_with(|| waiver.to_applied());
                }
                continue;
            }
            kept_reasons.push(reason.clone());
            kept_codes.push(code.clone());
        }

        filtered.push(PolicyResult {
            policy: result.policy,
            status: status_from_internal_codes(&kept_codes),
            reasons: kept_reasons,
            codes: kept_codes,
            details: result.details,
        });
    }

    (filtered, applied.into_values().collect())
}

fn status_from_internal_codes(codes: &[String]) -> Status {
    codes
        .iter()
        .map(|code| severity_of_internal(code))
        .max()
        .unwrap_or(Status::Allow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptgate_types::codes;
    use promptgate_types::PolicyName;
    use serde_json::json;
    use time::macros::datetime;

    fn waiver_json(reason_code: &str, expires_at: &str) -> JsonValue {
        json!([{
            "reason_code": reason_code,
            "expires_at": expires_at,
            "reason": "Known cost variance for dev.",
            "issued_by": "team-ai",
            "ticket": "PG-123",
        }])
    }

    fn cost_warn_result() -> PolicyResult {
        PolicyResult {
            policy: PolicyName::Cost,
            status: Status::Warn,
            reasons: vec!["Cost increased by 25.0% (>20%).".to_string()],
            codes: vec![codes::COST_WARN_INCREASE.to_string()],
            details: json!({"increase_pct": 25.0, "delta_usd": 0.25}),
        }
    }

    #[test]
    fn absent_section_parses_empty() {
        assert!(parse_waivers(None).unwrap().is_empty());
        assert!(parse_waivers(Some(&JsonValue::Null)).unwrap().is_empty());
    }

    #[test]
    fn non_array_section_is_rejected() {
        let err = parse_waivers(Some(&json!({}))).unwrap_err();
        assert!(err.to_string().contains("'waivers' must be an array"));
    }

    #[test]
    fn missing_required_fields_are_rejected_with_index() {
        let err = parse_waivers(Some(&json!([{ "reason_code": "X" }]))).unwrap_err();
        assert!(err.to_string().contains("waivers[0].expires_at"));

        let err = parse_waivers(Some(&json!([{
            "reason_code": "X",
            "expires_at": "2026-12-31",
            "reason": "   ",
        }])))
        .unwrap_err();
        assert!(err.to_string().contains("waivers[0].reason"));
    }

    #[test]
    fn malformed_expiry_is_rejected() {
        let err = parse_waivers(Some(&waiver_json("COST_INCREASE_WARN", "soonish"))).unwrap_err();
        assert!(err.to_string().contains("not a valid ISO-8601"));
    }

    #[test]
    fn waivers_are_sorted_deterministically() {
        let parsed = parse_waivers(Some(&json!([
            {"reason_code": "B", "expires_at": "2026-12-31", "reason": "two"},
            {"reason_code": "A", "expires_at": "2026-12-31", "reason": "one"},
            {"reason_code": "A", "expires_at": "2026-06-30", "reason": "zero"},
        ])))
        .unwrap();
        let keys: Vec<(&str, &str)> = parsed
            .iter()
            .map(|w| (w.reason_code.as_str(), w.expires_at.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("A", "2026-06-30"), ("A", "2026-12-31"), ("B", "2026-12-31")]
        );
    }

    #[test]
    fn active_waiver_removes_pair_and_records_metadata() {
        let waivers =
            parse_waivers(Some(&waiver_json("COST_INCREASE_WARN", "2026-12-31T00:00:00Z")))
                .unwrap();
        let (filtered, applied) = apply_waivers(
            vec![cost_warn_result()],
            &waivers,
            datetime!(2026-02-15 00:00:00 UTC),
        );

        assert_eq!(filtered[0].status, Status::Allow);
        assert!(filtered[0].reasons.is_empty());
        assert!(filtered[0].codes.is_empty());
        // Details survive for metric extraction.
        assert_eq!(filtered[0].details["increase_pct"], json!(25.0));

        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].reason_code, "COST_INCREASE_WARN");
        assert_eq!(applied[0].expires_at, "2026-12-31T00:00:00Z");
        assert_eq!(applied[0].ticket.as_deref(), Some("PG-123"));
    }

    #[test]
    fn expired_waiver_does_not_apply() {
        let waivers =
            parse_waivers(Some(&waiver_json("COST_INCREASE_WARN", "2026-01-01T00:00:00Z")))
                .unwrap();
        let (filtered, applied) = apply_waivers(
            vec![cost_warn_result()],
            &waivers,
            datetime!(2026-02-15 00:00:00 UTC),
        );

        assert_eq!(filtered[0].status, Status::Warn);
        assert_eq!(filtered[0].codes, vec![codes::COST_WARN_INCREASE.to_string()]);
        assert!(applied.is_empty());
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let waivers =
            parse_waivers(Some(&waiver_json("COST_INCREASE_WARN", "2026-02-15T00:00:00Z")))
                .unwrap();
        let (filtered, _) = apply_waivers(
            vec![cost_warn_result()],
            &waivers,
            datetime!(2026-02-15 00:00:00 UTC),
        );
        assert_eq!(filtered[0].status, Status::Allow);
    }

    #[test]
    fn unmatched_pairs_keep_reason_code_pairing() {
        let mut result = cost_warn_result();
        result.reasons.push("Baseline cost is unreliable.".to_string());
        result.codes.push(codes::COST_WARN_LOW_BASELINE.to_string());

        let waivers =
            parse_waivers(Some(&waiver_json("COST_INCREASE_WARN", "2026-12-31T00:00:00Z")))
                .unwrap();
        let (filtered, _) =
            apply_waivers(vec![result], &waivers, datetime!(2026-02-15 00:00:00 UTC));

        assert_eq!(filtered[0].reasons, vec!["Baseline cost is unreliable.".to_string()]);
        assert_eq!(filtered[0].codes, vec![codes::COST_WARN_LOW_BASELINE.to_string()]);
        assert_eq!(filtered[0].status, Status::Warn);
    }

    #[test]
    fn leftover_unknown_code_recomputes_as_warn() {
        let result = PolicyResult {
            policy: PolicyName::Pii,
            status: Status::Block,
            reasons: vec!["PII detected: IBAN (1 match).".to_string()],
            codes: vec!["PII_BLOCK_IBAN".to_string()],
            details: JsonValue::Null,
        };
        let waivers =
            parse_waivers(Some(&waiver_json("COST_INCREASE_WARN", "2026-12-31T00:00:00Z")))
                .unwrap();
        let (filtered, _) =
            apply_waivers(vec![result], &waivers, datetime!(2026-02-15 00:00:00 UTC));

        // The unrecognized leftover code classifies conservatively.
        assert_eq!(filtered[0].status, Status::Warn);
    }
}
