//! Term-overlap relevance scoring.
//!
//! Text is reduced to lowercase alphanumeric tokens; a text scores one
//! point per query term that occurs among its first
//! [`MAX_SCORED_TOKENS`] tokens.
//!
//! A hit combines its title, description and URL scores:
//!
//! ```text
//! text  = score(title + " " + description)       (url score / 1.1 if 0)
//! score = title * 1.1            if title * 1.1 > text
//!       = text + title / 10      otherwise
//! score = max(0, score + prior / (position + 1) - position / 10)
//! ```

use std::collections::HashSet;

use crate::types::Hit;

/// Only the first this many tokens of a text are matched against the query.
pub const MAX_SCORED_TOKENS: usize = 1000;

/// URL matches count less than title or description matches.
const URL_DAMPING: f64 = 1.1;

/// Title boost factor and tie-breaking divisor.
const TITLE_BOOST: f64 = 1.1;
const TITLE_NUDGE: f64 = 10.0;

/// Score lost per position within a batch.
const POSITION_PENALTY: f64 = 0.1;

/// Canonical form of `text`: lowercase alphanumeric runs joined by single
/// spaces, without leading or trailing whitespace.
///
/// Idempotent: `normalize_text(&normalize_text(t)) == normalize_text(t)`.
pub fn normalize_text(text: &str) -> String {
    tokens(text).join(" ")
}

/// Lowercase alphanumeric tokens of `text`, in order, duplicates kept.
pub fn tokens(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            current.push(c);
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Number of `terms` occurring in the first [`MAX_SCORED_TOKENS`] tokens of
/// `text`. Each term counts at most once; duplicate terms count separately.
pub fn score_text(text: &str, terms: &[String]) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let window: HashSet<String> = tokens(text).into_iter().take(MAX_SCORED_TOKENS).collect();
    terms.iter().filter(|term| window.contains(term.as_str())).count() as f64
}

/// Score `hit` against `terms`.
///
/// `position` is the 0-based index of the hit in its batch and `prior` the
/// owning resource's static boost. Never negative; 0 for an empty query.
pub fn score_hit(hit: &Hit, terms: &[String], position: usize, prior: Option<f64>) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let title_score = score_text(&hit.title, terms);
    let mut score = match hit.description.as_deref() {
        Some(description) => score_text(&format!("{} {}", hit.title, description), terms),
        None => title_score,
    };
    if score == 0.0 {
        if let Some(url) = hit.url.as_deref() {
            score = score_text(url, terms) / URL_DAMPING;
        }
    }

    if title_score * TITLE_BOOST > score {
        score = title_score * TITLE_BOOST;
    } else {
        score += title_score / TITLE_NUDGE;
    }

    if let Some(prior) = prior {
        score += prior / (position + 1) as f64;
    }
    score -= position as f64 * POSITION_PENALTY;
    score.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(query: &str) -> Vec<String> {
        tokens(query)
    }

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize_text("  Hello, World!  "), "hello world");
        assert_eq!(normalize_text("a--b__c"), "a b c");
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("?!"), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for text in [
            "Rust: a language",
            "  spaced   out ",
            "Ünïcödé Straße",
            "İstanbul",
            "tabs\tand\nnewlines",
            "1,000,000",
        ] {
            let once = normalize_text(text);
            assert_eq!(normalize_text(&once), once, "not idempotent for {text:?}");
        }
    }

    #[test]
    fn tokens_keep_duplicates() {
        assert_eq!(tokens("abc abc"), vec!["abc", "abc"]);
    }

    #[test]
    fn score_counts_each_term_once() {
        let t = terms("rust language");
        assert!((score_text("Rust rust rust", &t) - 1.0).abs() < f64::EPSILON);
        assert!((score_text("the Rust language", &t) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn duplicate_terms_each_score() {
        let t = terms("abc abc");
        assert!((score_text("abc", &t) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_terms_score_zero() {
        assert!(score_text("anything at all", &[]).abs() < f64::EPSILON);
        let hit = Hit::new("anything").with_url("https://anything.org");
        assert!(score_hit(&hit, &[], 0, Some(5.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn only_first_thousand_tokens_count() {
        let mut text = "filler ".repeat(MAX_SCORED_TOKENS);
        text.push_str("needle");
        assert!(score_text(&text, &terms("needle")).abs() < f64::EPSILON);

        let mut early = "filler ".repeat(MAX_SCORED_TOKENS - 1);
        early.push_str("needle");
        assert!((score_text(&early, &terms("needle")) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn perfect_title_match_is_boosted() {
        let t = terms("rust");
        let hit = Hit::new("Rust");
        assert!((score_hit(&hit, &t, 0, None) - 1.1).abs() < 1e-9);
    }

    #[test]
    fn description_match_gets_title_nudge() {
        let t = terms("rust language");
        let hit = Hit::new("Rust").with_description("a systems language");
        // text score 2, title 1: 1.1 < 2 so 2 + 0.1
        assert!((score_hit(&hit, &t, 0, None) - 2.1).abs() < 1e-9);
    }

    #[test]
    fn url_is_a_damped_fallback() {
        let t = terms("rust");
        let hit = Hit::new("Home").with_url("https://rust-lang.org");
        assert!((score_hit(&hit, &t, 0, None) - 1.0 / 1.1).abs() < 1e-9);

        let titled = Hit::new("Rust").with_url("https://rust-lang.org");
        assert!((score_hit(&titled, &t, 0, None) - 1.1).abs() < 1e-9);
    }

    #[test]
    fn position_penalty_and_prior() {
        let t = terms("rust");
        let hit = Hit::new("Rust");
        let first = score_hit(&hit, &t, 0, None);
        let third = score_hit(&hit, &t, 2, None);
        assert!((first - third - 0.2).abs() < 1e-9);

        let boosted = score_hit(&hit, &t, 1, Some(1.0));
        // 1.1 + 1.0 / 2 - 0.1
        assert!((boosted - 1.5).abs() < 1e-9);
    }

    #[test]
    fn score_floors_at_zero() {
        let t = terms("rust");
        let hit = Hit::new("unrelated");
        assert!(score_hit(&hit, &t, 7, None).abs() < f64::EPSILON);
        assert!(score_hit(&hit, &t, 0, Some(-3.0)) >= 0.0);
    }

    #[test]
    fn matching_title_beats_non_matching() {
        let t = terms("abc abc");
        let matching = score_hit(&Hit::new("abc"), &t, 0, None);
        let other = score_hit(&Hit::new("xyz"), &t, 0, None);
        assert!(matching > other);
    }
}
