//! Performance analysis over historical attempts.
//!
//! Aggregates exam and practice answers per tag and per difficulty, ranks the
//! weakest and strongest tags, and assembles micro-drills from weak tags.

use std::collections::{BTreeMap, HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::{ExamAttempt, PracticeAttempt, Question, Quiz, Timestamp};

/// Minimum answers before a tag can be called a weakness.
const WEAKNESS_MIN_SEEN: u32 = 2;
const WEAKNESS_ERR_RATE: f64 = 0.3;
/// Minimum answers before a tag can be called a strength.
const STRENGTH_MIN_SEEN: u32 = 3;
const STRENGTH_ACC_RATE: f64 = 0.8;
const TOP_N: usize = 3;
const SAMPLE_QUESTIONS: usize = 5;

/// Answer counters for one tag or difficulty level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceData {
    pub seen: u32,
    pub correct: u32,
    pub time_ms: u64,
}

impl PerformanceData {
    fn record(&mut self, correct: bool, time_ms: u64) {
        self.seen += 1;
        if correct {
            self.correct += 1;
        }
        self.time_ms += time_ms;
    }

    pub fn accuracy(&self) -> f64 {
        if self.seen == 0 {
            0.0
        } else {
            self.correct as f64 / self.seen as f64
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.seen == 0 {
            0.0
        } else {
            (self.seen - self.correct) as f64 / self.seen as f64
        }
    }

    pub fn avg_time_ms(&self) -> f64 {
        if self.seen == 0 {
            0.0
        } else {
            self.time_ms as f64 / self.seen as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weakness {
    pub tag: String,
    pub err_rate: f64,
    pub avg_time_ms: f64,
    /// Up to five question ids carrying the tag, in quiz order.
    pub sample_question_ids: Vec<String>,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strength {
    pub tag: String,
    pub acc_rate: f64,
    pub avg_time_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub by_tag: BTreeMap<String, PerformanceData>,
    pub by_difficulty: BTreeMap<String, PerformanceData>,
    pub top_weaknesses: Vec<Weakness>,
    pub top_strengths: Vec<Strength>,
}

/// A single answer as seen by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome<'a> {
    pub question_id: &'a str,
    pub correct: bool,
    pub time_ms: u64,
}

/// Borrowed view over either kind of attempt.
#[derive(Debug, Clone, Copy)]
pub enum ScoredAttempt<'a> {
    Exam(&'a ExamAttempt),
    Practice(&'a PracticeAttempt),
}

impl<'a> ScoredAttempt<'a> {
    pub fn quiz_id(&self) -> &'a str {
        match self {
            ScoredAttempt::Exam(a) => &a.quiz_id,
            ScoredAttempt::Practice(a) => &a.quiz_id,
        }
    }

    pub fn id(&self) -> &'a str {
        match self {
            ScoredAttempt::Exam(a) => &a.id,
            ScoredAttempt::Practice(a) => &a.id,
        }
    }

    /// Finish time, or start time for attempts still open.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            ScoredAttempt::Exam(a) => a.finished_at.unwrap_or(a.started_at),
            ScoredAttempt::Practice(a) => a.finished_at.unwrap_or(a.started_at),
        }
    }

    pub fn outcomes(&self) -> Vec<Outcome<'a>> {
        match self {
            ScoredAttempt::Exam(a) => a
                .answers
                .iter()
                .map(|ans| Outcome {
                    question_id: &ans.question_id,
                    correct: ans.correct,
                    time_ms: ans.time_ms,
                })
                .collect(),
            ScoredAttempt::Practice(a) => a
                .answers
                .iter()
                .map(|ans| Outcome {
                    question_id: &ans.question_id,
                    correct: ans.correct,
                    time_ms: ans.time_ms,
                })
                .collect(),
        }
    }

    /// Percentage score: the stored exam score, or practice accuracy.
    pub fn score_pct(&self) -> Option<u32> {
        match self {
            ScoredAttempt::Exam(a) => a.score,
            ScoredAttempt::Practice(a) => {
                if a.answers.is_empty() {
                    None
                } else {
                    let correct = a.answers.iter().filter(|x| x.correct).count();
                    Some((correct as f64 * 100.0 / a.answers.len() as f64).round() as u32)
                }
            }
        }
    }
}

/// Qualitative note for a weakness, banded by error rate.
///
/// The top band includes 0.6 itself: six misses out of ten is a focus tag.
pub fn weakness_note(err_rate: f64) -> &'static str {
    if err_rate >= 0.6 {
        "High error rate - needs focused practice"
    } else if err_rate > 0.4 {
        "Moderate errors - review concepts"
    } else {
        "Some confusion - practice recommended"
    }
}

/// Aggregate attempts against the questions of `quiz`.
///
/// Answers whose question is no longer in the quiz are ignored.
pub fn analyze_performance(quiz: &Quiz, attempts: &[ScoredAttempt<'_>]) -> AnalysisResult {
    let tags = quiz.tags();
    let mut by_tag: BTreeMap<String, PerformanceData> = tags
        .iter()
        .map(|t| (t.to_string(), PerformanceData::default()))
        .collect();
    let mut by_difficulty: BTreeMap<String, PerformanceData> = quiz
        .questions
        .iter()
        .filter_map(|q| q.difficulty)
        .map(|d| (d.to_string(), PerformanceData::default()))
        .collect();

    let questions: HashMap<&str, &Question> =
        quiz.questions.iter().map(|q| (q.id.as_str(), q)).collect();

    for attempt in attempts {
        for outcome in attempt.outcomes() {
            let Some(question) = questions.get(outcome.question_id) else {
                continue;
            };
            for tag in &question.tags {
                if let Some(data) = by_tag.get_mut(tag) {
                    data.record(outcome.correct, outcome.time_ms);
                }
            }
            if let Some(difficulty) = question.difficulty {
                if let Some(data) = by_difficulty.get_mut(&difficulty.to_string()) {
                    data.record(outcome.correct, outcome.time_ms);
                }
            }
        }
    }

    let mut top_weaknesses = Vec::new();
    let mut top_strengths = Vec::new();

    for tag in &tags {
        let data = by_tag[*tag];
        if data.seen < WEAKNESS_MIN_SEEN {
            continue;
        }
        let err_rate = data.error_rate();
        let acc_rate = data.accuracy();

        if err_rate > WEAKNESS_ERR_RATE {
            let sample_question_ids = quiz
                .questions
                .iter()
                .filter(|q| q.has_tag(tag))
                .take(SAMPLE_QUESTIONS)
                .map(|q| q.id.clone())
                .collect();
            top_weaknesses.push(Weakness {
                tag: tag.to_string(),
                err_rate,
                avg_time_ms: data.avg_time_ms(),
                sample_question_ids,
                note: weakness_note(err_rate).to_string(),
            });
        }

        if data.seen >= STRENGTH_MIN_SEEN && acc_rate > STRENGTH_ACC_RATE {
            top_strengths.push(Strength {
                tag: tag.to_string(),
                acc_rate,
                avg_time_ms: data.avg_time_ms(),
            });
        }
    }

    top_weaknesses.sort_by(|a, b| b.err_rate.total_cmp(&a.err_rate));
    top_strengths.sort_by(|a, b| b.acc_rate.total_cmp(&a.acc_rate));
    top_weaknesses.truncate(TOP_N);
    top_strengths.truncate(TOP_N);

    AnalysisResult {
        by_tag,
        by_difficulty,
        top_weaknesses,
        top_strengths,
    }
}

/// Assemble up to `size` questions targeting `weaknesses`.
///
/// Each weakness contributes up to `ceil(size / weaknesses)` of its unused
/// sample questions; remaining slots are backfilled with any unused question
/// sharing a weak tag. The result is shuffled and may be shorter than `size`.
pub fn build_micro_drill<'a, R: Rng + ?Sized>(
    quiz: &'a Quiz,
    weaknesses: &[Weakness],
    size: usize,
    rng: &mut R,
) -> Vec<&'a Question> {
    if weaknesses.is_empty() || size == 0 {
        return Vec::new();
    }

    let per_weakness = size.div_ceil(weaknesses.len());
    let mut selected: Vec<&Question> = Vec::new();
    let mut used: HashSet<&str> = HashSet::new();

    for weakness in weaknesses {
        if selected.len() >= size {
            break;
        }
        let available: Vec<&Question> = weakness
            .sample_question_ids
            .iter()
            .filter_map(|id| quiz.question(id))
            .filter(|q| !used.contains(q.id.as_str()))
            .take(per_weakness)
            .collect();
        for question in available {
            if selected.len() >= size {
                break;
            }
            used.insert(&question.id);
            selected.push(question);
        }
    }

    if selected.len() < size {
        let weak_tags: HashSet<&str> = weaknesses.iter().map(|w| w.tag.as_str()).collect();
        let remaining = size - selected.len();
        let backfill: Vec<&Question> = quiz
            .questions
            .iter()
            .filter(|q| !used.contains(q.id.as_str()))
            .filter(|q| q.tags.iter().any(|t| weak_tags.contains(t.as_str())))
            .take(remaining)
            .collect();
        selected.extend(backfill);
    }

    selected.shuffle(rng);
    selected
}

/// Headline numbers across a set of attempts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub attempts: usize,
    pub average_score: Option<f64>,
    pub best_score: Option<u32>,
    pub last_score: Option<u32>,
    pub questions_answered: usize,
    pub accuracy: f64,
}

pub fn history_summary(attempts: &[ScoredAttempt<'_>]) -> HistorySummary {
    let scores: Vec<u32> = attempts.iter().filter_map(|a| a.score_pct()).collect();
    let average_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().map(|s| *s as f64).sum::<f64>() / scores.len() as f64)
    };
    let last_score = attempts
        .iter()
        .filter(|a| a.score_pct().is_some())
        .max_by_key(|a| a.timestamp())
        .and_then(|a| a.score_pct());

    let outcomes: Vec<Outcome<'_>> = attempts.iter().flat_map(|a| a.outcomes()).collect();
    let correct = outcomes.iter().filter(|o| o.correct).count();
    let accuracy = if outcomes.is_empty() {
        0.0
    } else {
        correct as f64 / outcomes.len() as f64
    };

    HistorySummary {
        attempts: attempts.len(),
        average_score,
        best_score: scores.iter().copied().max(),
        last_score,
        questions_answered: outcomes.len(),
        accuracy,
    }
}
