//! Fuzzy name matching for Splitwise friends and groups.
//!
//! Pure functions only: given a free-text query and a candidate list, pick
//! the best-scoring candidate or report failure. The policy is fixed here
//! and covered by tests:
//!
//! - normalization lowercases, trims and collapses inner whitespace; no
//!   diacritic folding
//! - score per candidate = max over its alias strings of normalized
//!   Levenshtein similarity (`1 - distance / max_len`), raised to
//!   [`CONTAINMENT_SCORE`] when one normalized string contains the other
//! - accepted when the best score reaches [`MATCH_THRESHOLD`]; ties keep the
//!   earliest candidate (candidate order is the stable order Splitwise
//!   returned)
//! - candidates scoring at least [`SUGGESTION_FLOOR`] are kept (up to three)
//!   for "did you mean" messages

use crate::models::{Friend, Group};

/// Minimum similarity for an accepted match.
pub const MATCH_THRESHOLD: f64 = 0.6;

/// Score assigned when one normalized name contains or prefixes the other.
pub const CONTAINMENT_SCORE: f64 = 0.85;

/// Minimum similarity for a candidate to appear in suggestions.
pub const SUGGESTION_FLOOR: f64 = MATCH_THRESHOLD * 0.8;

const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug)]
pub struct MatchOutcome<'a, T> {
    /// Best candidate, if its score reached the threshold.
    pub best: Option<&'a T>,
    /// Score of the best-scoring candidate, matched or not.
    pub score: f64,
    /// Near misses for "did you mean" messages, best first.
    pub suggestions: Vec<&'a T>,
}

pub fn normalize(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Similarity of two already-normalized strings in `[0, 1]`.
fn similarity(query: &str, alias: &str) -> f64 {
    if query.is_empty() || alias.is_empty() {
        return 0.0;
    }
    if query == alias {
        return 1.0;
    }

    let max_len = query.chars().count().max(alias.chars().count());
    let edit = 1.0 - levenshtein(query, alias) as f64 / max_len as f64;

    if alias.contains(query) || query.contains(alias) {
        edit.max(CONTAINMENT_SCORE)
    } else {
        edit
    }
}

/// Score `query` against every candidate and pick the best.
///
/// `aliases` yields the name variants a candidate may be referred to by.
/// Deterministic for identical inputs; first candidate wins on ties.
pub fn best_match<'a, T, F>(query: &str, candidates: &'a [T], aliases: F) -> MatchOutcome<'a, T>
where
    F: Fn(&T) -> Vec<String>,
{
    let query = normalize(query);

    let mut scored: Vec<(usize, f64)> = Vec::with_capacity(candidates.len());
    for (index, candidate) in candidates.iter().enumerate() {
        let score = aliases(candidate)
            .iter()
            .map(|alias| similarity(&query, &normalize(alias)))
            .fold(0.0_f64, f64::max);
        scored.push((index, score));
    }

    let mut best_index = None;
    let mut best_score = 0.0;
    for &(index, score) in &scored {
        if score > best_score {
            best_score = score;
            best_index = Some(index);
        }
    }

    // Stable sort keeps candidate order within equal scores
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let suggestions = scored
        .iter()
        .filter(|(_, score)| *score >= SUGGESTION_FLOOR)
        .take(MAX_SUGGESTIONS)
        .map(|&(index, _)| &candidates[index])
        .collect();

    MatchOutcome {
        best: if best_score >= MATCH_THRESHOLD {
            best_index.map(|i| &candidates[i])
        } else {
            None
        },
        score: best_score,
        suggestions,
    }
}

/// Friends can be referred to by full name, first name, last name or the
/// local part of their email.
pub fn match_friend<'a>(query: &str, friends: &'a [Friend]) -> MatchOutcome<'a, Friend> {
    best_match(query, friends, |friend| {
        let mut aliases = vec![friend.display_name(), friend.first_name.clone()];
        if let Some(last) = &friend.last_name {
            aliases.push(last.clone());
        }
        if let Some(email) = &friend.email {
            if let Some(local) = email.split('@').next() {
                aliases.push(local.to_string());
            }
        }
        aliases
    })
}

pub fn match_group<'a>(query: &str, groups: &'a [Group]) -> MatchOutcome<'a, Group> {
    best_match(query, groups, |group| vec![group.name.clone()])
}
