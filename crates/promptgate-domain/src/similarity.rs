//! Cheap, deterministic text-similarity metrics for the drift policy.
//!
//! A similarity method is a composable expression: `token_jaccard`,
//! `char_3gram_jaccard`, or `max(a,b,...)` over sub-methods. Unknown
//! method names fall back to token Jaccard.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9_]+").expect("valid word pattern"));

pub fn similarity(left: &str, right: &str, method: &str) -> f64 {
    let method = method.trim();
    if method == "token_jaccard" {
        return token_jaccard(left, right);
    }
    if method == "char_3gram_jaccard" {
        return char_ngram_jaccard(left, right, 3);
    }
    if let Some(inner) = method.strip_prefix("max(").and_then(|m| m.strip_suffix(')')) {
        let items: Vec<&str> = inner
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect();
        if items.is_empty() {
            return 1.0;
        }
        return items
            .iter()
            .map(|item| similarity(left, right, item))
            .fold(f64::MIN, f64::max);
    }
    token_jaccard(left, right)
}

fn token_jaccard(left: &str, right: &str) -> f64 {
    let left_tokens: BTreeSet<String> = tokenize(left).collect();
    let right_tokens: BTreeSet<String> = tokenize(right).collect();
    jaccard(&left_tokens, &right_tokens)
}

fn char_ngram_jaccard(left: &str, right: &str, n: usize) -> f64 {
    let left_grams = char_ngrams(&normalize_for_ngrams(left), n);
    let right_grams = char_ngrams(&normalize_for_ngrams(right), n);
    jaccard(&left_grams, &right_grams)
}

fn jaccard(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
    let union = left.union(right).count();
    if union == 0 {
        return 1.0;
    }
    let intersection = left.intersection(right).count();
    intersection as f64 / union as f64
}

fn tokenize(value: &str) -> impl Iterator<Item = String> + '_ {
    let lowered = value.to_lowercase();
    WORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect::<Vec<_>>()
        .into_iter()
}

/// Lowercase and reduce to word tokens joined by single spaces, so that
/// punctuation and whitespace variants produce the same n-gram stream.
fn normalize_for_ngrams(value: &str) -> String {
    tokenize(value).collect::<Vec<_>>().join(" ")
}

fn char_ngrams(value: &str, n: usize) -> BTreeSet<String> {
    let chars: Vec<char> = value.chars().collect();
    if n == 0 || chars.len() < n {
        return BTreeSet::new();
    }
    chars
        .windows(n)
        .map(|window| window.iter().collect::<String>())
        .collect()
}
