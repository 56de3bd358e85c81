//! Citation trust heuristic.
//!
//! A question scores 60 points for having any citation, 25 more for two or
//! more, and 15 more when a citation mentions a recent year.

use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{Quiz, SourceRef};

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(19|20)\d{2}").expect("valid year regex"));

/// Years back from the current one that still count as recent.
const RECENCY_WINDOW_YEARS: i32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustFactors {
    pub has_citation: bool,
    pub multi_sources: bool,
    pub recency_ok: bool,
}

/// Evaluate the trust factors of a question's citations.
pub fn compute_trust_factors(refs: &[SourceRef], current_year: i32) -> TrustFactors {
    let threshold = current_year - RECENCY_WINDOW_YEARS;
    let recency_ok = refs.iter().any(|r| {
        let haystack = format!(
            "{} {}",
            r.url.as_deref().unwrap_or(""),
            r.note.as_deref().unwrap_or("")
        );
        // Only the first year mentioned counts.
        YEAR_RE
            .find(&haystack)
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .is_some_and(|year| year >= threshold)
    });

    TrustFactors {
        has_citation: !refs.is_empty(),
        multi_sources: refs.len() >= 2,
        recency_ok,
    }
}

pub fn trust_score(factors: TrustFactors) -> u32 {
    let mut score = 0u32;
    if factors.has_citation {
        score += 60;
    }
    if factors.multi_sources {
        score += 25;
    }
    if factors.recency_ok {
        score += 15;
    }
    score.min(100)
}

/// Factors and score for one question of a quiz.
pub fn question_trust(quiz: &Quiz, question_id: &str, current_year: i32) -> (TrustFactors, u32) {
    let factors = compute_trust_factors(quiz.sources_for(question_id), current_year);
    (factors, trust_score(factors))
}

pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: Option<&str>, note: Option<&str>) -> SourceRef {
        SourceRef {
            url: url.map(String::from),
            snippet: None,
            note: note.map(String::from),
        }
    }

    #[test]
    fn no_citations_scores_zero() {
        let factors = compute_trust_factors(&[], 2026);
        assert_eq!(factors, TrustFactors::default());
        assert_eq!(trust_score(factors), 0);
    }

    #[test]
    fn single_old_citation() {
        let refs = [source(Some("https://example.com/2015/guide"), None)];
        let factors = compute_trust_factors(&refs, 2026);
        assert!(factors.has_citation);
        assert!(!factors.multi_sources);
        assert!(!factors.recency_ok);
        assert_eq!(trust_score(factors), 60);
    }

    #[test]
    fn full_marks_with_recent_year_in_note() {
        let refs = [
            source(Some("https://docs.example.com"), None),
            source(None, Some("revised 2024")),
        ];
        let factors = compute_trust_factors(&refs, 2026);
        assert!(factors.recency_ok);
        assert_eq!(trust_score(factors), 100);
    }

    #[test]
    fn only_first_year_in_source_counts() {
        let stale_url = [source(
            Some("https://example.com/1999/archive"),
            Some("checked again in 2024"),
        )];
        assert!(!compute_trust_factors(&stale_url, 2026).recency_ok);

        let fresh_url = [source(Some("https://example.com/2025/guide"), Some("first seen 1999"))];
        assert!(compute_trust_factors(&fresh_url, 2026).recency_ok);
    }

    #[test]
    fn recency_boundary_is_inclusive() {
        let refs = [source(None, Some("published 2023"))];
        assert!(compute_trust_factors(&refs, 2026).recency_ok);
        assert!(!compute_trust_factors(&refs, 2027).recency_ok);
    }

    #[test]
    fn question_trust_reads_quiz_sources() {
        let mut quiz = Quiz::new("T", "t", vec![]);
        quiz.sources
            .insert("q1".into(), vec![source(Some("a"), None), source(Some("b"), None)]);
        let (factors, score) = question_trust(&quiz, "q1", 2026);
        assert!(factors.multi_sources);
        assert_eq!(score, 85);
        assert_eq!(question_trust(&quiz, "missing", 2026).1, 0);
    }
}
