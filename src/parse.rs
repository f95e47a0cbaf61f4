//! Free-text parsing of the stylist model's answer.
//!
//! The model is asked to justify picks as `Item N: because ...`, but its
//! output format is not contractually guaranteed, so everything here is
//! best-effort: a primary index-based scan and a secondary scan that matches
//! pins by their own description words. Both are pure functions over the
//! response text and never fail — an unparseable response just yields no
//! matches, which the curator turns into a random selection.

use regex::Regex;
use std::sync::LazyLock;

/// `Item 12` markers, anywhere in the text.
static ITEM_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bitem\s+(\d+)").unwrap());

/// Justification connectors: a reasoning word or a bare colon.
static CONNECTOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:because|reason|as)\b|:").unwrap());

/// Scan the response for `Item <N> ... (because|reason|as|:) <justification>`
/// and return `(1-based index, justification)` pairs in order of appearance.
/// The justification runs to the next `Item` marker or end of text. Indices
/// are reported as written; the caller drops out-of-range ones. Repeated
/// indices keep their first justification.
pub fn parse_item_reasons(response: &str) -> Vec<(usize, String)> {
    let markers: Vec<(usize, usize, usize)> = ITEM_MARKER_RE
        .captures_iter(response)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let index: usize = caps.get(1)?.as_str().parse().ok()?;
            Some((index, whole.start(), whole.end()))
        })
        .collect();

    let mut reasons: Vec<(usize, String)> = Vec::new();

    for (i, &(index, _, seg_start)) in markers.iter().enumerate() {
        let seg_end = markers
            .get(i + 1)
            .map(|&(_, next_start, _)| next_start)
            .unwrap_or(response.len());
        let segment = &response[seg_start..seg_end];

        if reasons.iter().any(|(seen, _)| *seen == index) {
            continue;
        }

        if let Some(reason) = justification_in(segment) {
            reasons.push((index, reason));
        }
    }

    reasons
}

/// Secondary fallback: match each description against the response by its
/// own words. Words of length > 3 are tried in order with the pattern
/// `<word> ... (because|reason|as|:) <justification>`; the first word that
/// matches wins and scanning stops for that description. Returns
/// `(0-based description position, justification)` pairs.
pub fn match_by_description(response: &str, descriptions: &[String]) -> Vec<(usize, String)> {
    let mut matches: Vec<(usize, String)> = Vec::new();

    for (position, description) in descriptions.iter().enumerate() {
        for word in description.split_whitespace() {
            let word: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
            if word.len() <= 3 {
                continue;
            }

            let word_re = match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&word))) {
                Ok(re) => re,
                Err(_) => continue,
            };

            let Some(found) = word_re.find(response) else {
                continue;
            };

            // Justification runs from after the word to the next Item
            // marker or end of text, same as the primary scan.
            let tail_end = ITEM_MARKER_RE
                .find_at(response, found.end())
                .map(|m| m.start())
                .unwrap_or(response.len());

            if let Some(reason) = justification_in(&response[found.end()..tail_end]) {
                matches.push((position, reason));
                break;
            }
        }
    }

    matches
}

/// Extract the justification from a text segment: everything after the first
/// connector, with any stacked leading connectors (`: because`) and trailing
/// sentence punctuation removed. `None` when no connector is present or the
/// remainder is empty.
fn justification_in(segment: &str) -> Option<String> {
    let connector = CONNECTOR_RE.find(segment)?;
    let reason = strip_leading_connectors(&segment[connector.end()..]);
    let reason = reason.trim_end_matches(['.', ' ', '\t', '\n', '\r']).trim();

    if reason.is_empty() {
        None
    } else {
        Some(reason.to_string())
    }
}

/// Drop leading connector words and punctuation, e.g. `: because it's blue`
/// becomes `it's blue`.
fn strip_leading_connectors(text: &str) -> &str {
    let mut rest = text;

    loop {
        let trimmed =
            rest.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | ',' | '-'));
        let stripped = strip_connector_word(trimmed);
        if stripped.len() == rest.len() {
            return rest;
        }
        rest = stripped;
    }
}

fn strip_connector_word(text: &str) -> &str {
    for word in ["because", "reason", "as"] {
        let Some(prefix) = text.get(..word.len()) else {
            continue;
        };
        if prefix.eq_ignore_ascii_case(word) {
            let after = &text[word.len()..];
            // Word boundary: don't eat "assembled" or "reasonable".
            if after.chars().next().map_or(true, |c| !c.is_alphanumeric()) {
                return after;
            }
        }
    }
    text
}
