use crate::policy::PiiPolicyConfig;
use crate::record::InvocationRecord;
use promptgate_types::{codes, PolicyName, PolicyResult, Status};
use regex::Regex;
use serde_json::json;
use std::collections::BTreeMap;

/// Scan the candidate output against every configured pattern and count the
/// matches that survive the allowlist (and, for `credit_card`, the Luhn
/// post-filter). Any surviving match is a hard violation: this policy has
/// no WARN tier.
pub fn evaluate(candidate: &InvocationRecord, config: &PiiPolicyConfig) -> PolicyResult {
    let text = candidate.output.as_str();

    let mut type_counts: BTreeMap<String, usize> = BTreeMap::new();
    for (label, pattern) in &config.patterns {
        let luhn_filtered = label.eq_ignore_ascii_case("credit_card");
        let count = pattern
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|value| !is_allowlisted(value, &config.allowlist))
            .filter(|value| !luhn_filtered || is_luhn_valid_card(value))
            .count();
        if count > 0 {
            type_counts.insert(label.clone(), count);
        }
    }

    if type_counts.is_empty() {
        return PolicyResult::allow(PolicyName::Pii);
    }

    let mut reasons = Vec::with_capacity(type_counts.len());
    let mut result_codes = Vec::with_capacity(type_counts.len());
    for (label, count) in &type_counts {
        reasons.push(format!(
            "PII detected: {} ({count} match(es)).",
            label.to_uppercase()
        ));
        result_codes.push(codes::pii_internal_code(label));
    }

    let blocked_types: Vec<String> = type_counts.keys().map(|l| l.to_uppercase()).collect();
    let blocked_total: usize = type_counts.values().sum();

    PolicyResult {
        policy: PolicyName::Pii,
        status: Status::Block,
        reasons,
        codes: result_codes,
        details: json!({
            "blocked_types": blocked_types,
            "blocked_type_counts": type_counts,
            "blocked_total": blocked_total,
        }),
    }
}

fn is_allowlisted(value: &str, allowlist: &[Regex]) -> bool {
    allowlist.iter().any(|allowed| allowed.is_match(value))
}

/// The credit_card carve-out: a match only counts when its digit string has
/// a plausible card length and passes the Luhn checksum.
fn is_luhn_valid_card(value: &str) -> bool {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }
    luhn_check(&digits)
}

fn luhn_check(digits: &[u32]) -> bool {
    let parity = (digits.len() - 2) % 2;
    let total: u32 = digits
        .iter()
        .enumerate()
        .map(|(index, &digit)| {
            if index % 2 == parity {
                let doubled = digit * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                digit
            }
        })
        .sum();
    total % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits(value: &str) -> Vec<u32> {
        value.chars().filter_map(|c| c.to_digit(10)).collect()
    }

    #[test]
    fn luhn_accepts_known_valid_card() {
        assert!(luhn_check(&digits("4111111111111111")));
    }

    #[test]
    fn luhn_rejects_off_by_one_checksum() {
        assert!(!luhn_check(&digits("4111111111111112")));
    }

    #[test]
    fn card_length_bounds_apply_before_checksum() {
        // "0" alone passes a bare checksum but is far too short to be a card.
        assert!(!is_luhn_valid_card("0"));
        assert!(!is_luhn_valid_card("4111 1111 1111 1111 11111"));
        assert!(is_luhn_valid_card("4111 1111 1111 1111"));
    }
}
