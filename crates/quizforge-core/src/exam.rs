//! Exam attempt lifecycle: setup, running, review, results.
//!
//! Attempts are built by shuffling a quiz and truncating it to the requested
//! size. While running, an attempt tracks selections, eliminations, flags and
//! the real time spent on each question. Finishing freezes the scored answers.

use std::collections::BTreeSet;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::QuizError;
use crate::model::{
    new_id, CustomExamConfig, ExamAnswer, ExamAttempt, ExamPreset, Question, QuestionType, Quiz,
    ReviewFilter, ReviewMode, Timestamp,
};

const DEFAULT_NUM_QUESTIONS: usize = 10;
const DEFAULT_TOTAL_MINUTES: u32 = 30;

/// Where the exam flow currently is. `Results` is terminal for an attempt,
/// but a new attempt may start from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamPhase {
    #[default]
    Setup,
    Running,
    Review,
    Results,
}

impl ExamPhase {
    /// Fail with `InvalidTransition` unless the phase is one of `allowed`.
    pub fn ensure(self, allowed: &[ExamPhase], action: &str) -> Result<(), QuizError> {
        if allowed.contains(&self) {
            Ok(())
        } else {
            Err(QuizError::InvalidTransition {
                phase: self.to_string(),
                action: action.to_string(),
            })
        }
    }
}

impl fmt::Display for ExamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamPhase::Setup => write!(f, "setup"),
            ExamPhase::Running => write!(f, "running"),
            ExamPhase::Review => write!(f, "review"),
            ExamPhase::Results => write!(f, "results"),
        }
    }
}

/// Palette status of a question in a running attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    Unanswered,
    Answered,
    Flagged,
}

/// Outcome of scoring an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub score_pct: u32,
    pub correct_count: usize,
    pub total: usize,
}

/// Pick up to `num_questions` distinct questions from the quiz.
pub fn build_exam_set<'a, R: Rng + ?Sized>(
    quiz: &'a Quiz,
    num_questions: usize,
    shuffle: bool,
    rng: &mut R,
) -> Vec<&'a Question> {
    let mut questions: Vec<&Question> = quiz.questions.iter().collect();
    if shuffle {
        questions.shuffle(rng);
    }
    questions.truncate(num_questions.min(quiz.questions.len()));
    questions
}

/// Resolve question count and time limit: preset, then custom, then defaults.
/// Zero values fall through to the next source.
pub fn resolve_exam_size(
    preset: Option<&ExamPreset>,
    custom: Option<CustomExamConfig>,
) -> (usize, u32) {
    let num_questions = preset
        .map(|p| p.num_questions)
        .filter(|n| *n > 0)
        .or_else(|| custom.map(|c| c.num_questions).filter(|n| *n > 0))
        .unwrap_or(DEFAULT_NUM_QUESTIONS);
    let total_minutes = preset
        .map(|p| p.total_minutes)
        .filter(|m| *m > 0)
        .or_else(|| custom.map(|c| c.total_minutes).filter(|m| *m > 0))
        .unwrap_or(DEFAULT_TOTAL_MINUTES);
    (num_questions, total_minutes)
}

/// Start a new attempt over a shuffled subset of `quiz`.
pub fn create_exam_attempt<R: Rng + ?Sized>(
    quiz: &Quiz,
    preset: Option<&ExamPreset>,
    custom: Option<CustomExamConfig>,
    now: Timestamp,
    rng: &mut R,
) -> Result<ExamAttempt, QuizError> {
    if quiz.questions.is_empty() {
        return Err(QuizError::EmptyQuiz(quiz.id.clone()));
    }

    let (num_questions, total_minutes) = resolve_exam_size(preset, custom);
    let question_ids = build_exam_set(quiz, num_questions, true, rng)
        .into_iter()
        .map(|q| q.id.clone())
        .collect();

    Ok(ExamAttempt {
        id: new_id(),
        quiz_id: quiz.id.clone(),
        preset_id: preset.map(|p| p.id.clone()),
        custom,
        started_at: now,
        finished_at: None,
        total_minutes,
        question_ids,
        current: 0,
        selected: Default::default(),
        eliminated: Default::default(),
        flagged: Default::default(),
        answers: Vec::new(),
        score: None,
        auto_submitted: false,
        time_spent_ms: Default::default(),
        change_counts: Default::default(),
        entered_current_at: Some(now),
    })
}

/// Check the attempt invariants against the quiz it references.
pub fn validate_attempt(quiz: &Quiz, attempt: &ExamAttempt) -> Result<(), QuizError> {
    if quiz.questions.is_empty() {
        return Err(QuizError::EmptyQuiz(quiz.id.clone()));
    }
    if attempt.quiz_id != quiz.id {
        return Err(QuizError::InvalidAttempt(format!(
            "attempt references quiz {} but was checked against {}",
            attempt.quiz_id, quiz.id
        )));
    }
    if attempt.question_ids.is_empty() {
        return Err(QuizError::InvalidAttempt("no questions selected".into()));
    }
    let mut seen = BTreeSet::new();
    for id in &attempt.question_ids {
        if !seen.insert(id.as_str()) {
            return Err(QuizError::InvalidAttempt(format!("duplicate question {id}")));
        }
        if quiz.question(id).is_none() {
            return Err(QuizError::InvalidAttempt(format!(
                "question {id} is not part of quiz {}",
                quiz.id
            )));
        }
    }
    if attempt.current >= attempt.question_ids.len() {
        return Err(QuizError::InvalidAttempt(format!(
            "current index {} out of range",
            attempt.current
        )));
    }
    if attempt.total_minutes == 0 {
        return Err(QuizError::InvalidAttempt("time limit must be positive".into()));
    }
    if attempt.is_finished() {
        return Err(QuizError::InvalidAttempt("attempt is already finished".into()));
    }
    Ok(())
}

/// Whether `selected` answers `question` correctly.
///
/// Free-text kinds are never auto-scored and always evaluate to `false`.
pub fn is_correct_answer(question: &Question, selected: &[String]) -> bool {
    let correct = question.correct_choice_ids();
    match question.kind {
        QuestionType::Single | QuestionType::TrueFalse => {
            selected.len() == 1 && correct.contains(&selected[0].as_str())
        }
        QuestionType::Multi => {
            let chosen: BTreeSet<&str> = selected.iter().map(String::as_str).collect();
            let expected: BTreeSet<&str> = correct.into_iter().collect();
            chosen.len() == selected.len() && chosen == expected
        }
        QuestionType::Text | QuestionType::Code | QuestionType::Short => false,
    }
}

/// Score a finished attempt: round(100 × correct / total).
pub fn score_attempt(attempt: &ExamAttempt) -> ScoreSummary {
    let total = attempt.question_ids.len();
    let correct_count = attempt.answers.iter().filter(|a| a.correct).count();
    let score_pct = if total > 0 {
        (correct_count as f64 * 100.0 / total as f64).round() as u32
    } else {
        0
    };
    ScoreSummary {
        score_pct,
        correct_count,
        total,
    }
}

impl ExamAttempt {
    /// Select (or toggle, for multi-choice) a choice of `question`.
    ///
    /// Returns `false` when nothing changed: unknown question or choice,
    /// free-text question, or an attempt that is already finished.
    pub fn select_choice(&mut self, question: &Question, choice_id: &str) -> bool {
        if self.is_finished() || !self.contains(&question.id) || !question.has_choice(choice_id) {
            return false;
        }
        let current = self.selected.get(&question.id).cloned().unwrap_or_default();
        let next = match question.kind {
            QuestionType::Single | QuestionType::TrueFalse => vec![choice_id.to_string()],
            QuestionType::Multi => {
                if current.iter().any(|c| c == choice_id) {
                    current.iter().filter(|c| *c != choice_id).cloned().collect()
                } else {
                    let mut next = current.clone();
                    next.push(choice_id.to_string());
                    next
                }
            }
            _ => return false,
        };
        self.replace_selection(&question.id, current, next)
    }

    /// Replace the free-text answer of `question`. An empty answer clears it.
    pub fn set_text_answer(&mut self, question: &Question, text: &str) -> bool {
        if self.is_finished() || !self.contains(&question.id) || !question.kind.is_free_text() {
            return false;
        }
        let current = self.selected.get(&question.id).cloned().unwrap_or_default();
        let next = if text.is_empty() {
            Vec::new()
        } else {
            vec![text.to_string()]
        };
        self.replace_selection(&question.id, current, next)
    }

    fn replace_selection(&mut self, question_id: &str, current: Vec<String>, next: Vec<String>) -> bool {
        if current == next {
            return false;
        }
        if next.is_empty() {
            self.selected.remove(question_id);
        } else {
            self.selected.insert(question_id.to_string(), next);
        }
        *self.change_counts.entry(question_id.to_string()).or_insert(0) += 1;
        true
    }

    /// Toggle a choice's eliminated mark. Eliminations never affect scoring.
    pub fn toggle_elimination(&mut self, question: &Question, choice_id: &str) -> bool {
        if self.is_finished() || !self.contains(&question.id) || !question.has_choice(choice_id) {
            return false;
        }
        let entry = self.eliminated.entry(question.id.clone()).or_default();
        if let Some(pos) = entry.iter().position(|c| c == choice_id) {
            entry.remove(pos);
        } else {
            entry.push(choice_id.to_string());
        }
        if entry.is_empty() {
            self.eliminated.remove(&question.id);
        }
        true
    }

    pub fn toggle_flag(&mut self, question_id: &str) -> bool {
        let flagged = !self.flagged.get(question_id).copied().unwrap_or(false);
        self.set_flag(question_id, flagged)
    }

    pub fn set_flag(&mut self, question_id: &str, flagged: bool) -> bool {
        if self.is_finished() || !self.contains(question_id) {
            return false;
        }
        if flagged {
            self.flagged.insert(question_id.to_string(), true);
        } else {
            self.flagged.remove(question_id);
        }
        true
    }

    /// Jump to `index`. Out-of-range indices are a silent no-op.
    pub fn navigate(&mut self, index: usize, now: Timestamp) -> bool {
        if self.is_finished() || index >= self.question_ids.len() || index == self.current {
            return false;
        }
        self.credit_time(now);
        self.current = index;
        true
    }

    pub fn next(&mut self, now: Timestamp) -> bool {
        self.navigate(self.current + 1, now)
    }

    pub fn prev(&mut self, now: Timestamp) -> bool {
        match self.current.checked_sub(1) {
            Some(index) => self.navigate(index, now),
            None => false,
        }
    }

    /// Credit the time since the current question was entered to it.
    fn credit_time(&mut self, now: Timestamp) {
        if let (Some(entered), Some(id)) = (
            self.entered_current_at,
            self.question_ids.get(self.current).cloned(),
        ) {
            let elapsed = (now - entered).max(0) as u64;
            *self.time_spent_ms.entry(id).or_insert(0) += elapsed;
        }
        self.entered_current_at = Some(now);
    }

    /// Remaining time in milliseconds, floored at zero.
    pub fn remaining_ms(&self, now: Timestamp) -> i64 {
        remaining_ms(self.started_at, self.total_minutes, now)
    }

    pub fn is_time_up(&self, now: Timestamp) -> bool {
        self.remaining_ms(now) == 0
    }

    pub fn question_status(&self, question_id: &str) -> QuestionStatus {
        if self.flagged.get(question_id).copied().unwrap_or(false) {
            QuestionStatus::Flagged
        } else if self.selected.get(question_id).is_some_and(|s| !s.is_empty()) {
            QuestionStatus::Answered
        } else {
            QuestionStatus::Unanswered
        }
    }

    /// Score every question and freeze the attempt.
    ///
    /// Returns `false` if the attempt was already finished; `finished_at` is
    /// stamped at most once and never precedes `started_at`.
    pub fn finish(&mut self, quiz: &Quiz, now: Timestamp, auto_submitted: bool) -> bool {
        if self.is_finished() {
            return false;
        }
        self.credit_time(now);
        self.entered_current_at = None;

        self.answers = self
            .question_ids
            .iter()
            .map(|id| {
                let selected = self.selected.get(id).cloned().unwrap_or_default();
                let correct = quiz
                    .question(id)
                    .map(|q| is_correct_answer(q, &selected))
                    .unwrap_or(false);
                ExamAnswer {
                    question_id: id.clone(),
                    selected,
                    correct,
                    time_ms: self.time_spent_ms.get(id).copied().unwrap_or(0),
                    changed_count: self.change_counts.get(id).copied().unwrap_or(0),
                    flagged: self.flagged.get(id).copied().unwrap_or(false),
                    eliminated: self.eliminated.get(id).cloned().unwrap_or_default(),
                }
            })
            .collect();

        self.score = Some(score_attempt(self).score_pct);
        self.finished_at = Some(now.max(self.started_at));
        self.auto_submitted = auto_submitted;
        true
    }
}

/// `total_minutes × 60000 − (now − started_at)`, floored at zero.
pub fn remaining_ms(started_at: Timestamp, total_minutes: u32, now: Timestamp) -> i64 {
    let total = total_minutes as i64 * 60_000;
    (total - (now - started_at)).max(0)
}

/// `MM:SS` countdown text.
pub fn format_remaining(ms: i64) -> String {
    if ms <= 0 {
        return "00:00".to_string();
    }
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    format!("{minutes:02}:{seconds:02}")
}

/// Compact duration such as `1h 5m`, `3m 20s` or `42s`.
pub fn human_time(ms: u64) -> String {
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    if hours > 0 {
        format!("{hours}h {}m", minutes % 60)
    } else if minutes > 0 {
        format!("{minutes}m {}s", seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

/// Answers of a finished attempt that pass `filter`.
pub fn filtered_answers(attempt: &ExamAttempt, filter: ReviewFilter) -> Vec<&ExamAnswer> {
    attempt
        .answers
        .iter()
        .filter(|a| match filter {
            ReviewFilter::Wrong => !a.correct,
            ReviewFilter::Flagged => a.flagged,
            ReviewFilter::All => true,
        })
        .collect()
}

impl ReviewMode {
    pub fn new(attempt_id: impl Into<String>) -> Self {
        Self {
            attempt_id: attempt_id.into(),
            filter: ReviewFilter::All,
            index: 0,
        }
    }

    /// Change the filter; the cursor restarts at the first answer.
    pub fn set_filter(&mut self, filter: ReviewFilter) {
        self.filter = filter;
        self.index = 0;
    }

    pub fn next(&mut self, len: usize) -> bool {
        if self.index + 1 < len {
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.index > 0 {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    /// Jump directly to `index`; out of range is a no-op.
    pub fn jump(&mut self, index: usize, len: usize) -> bool {
        if index < len {
            self.index = index;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Choice;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const T0: Timestamp = 1_700_000_000_000;

    fn choice(id: &str, correct: bool) -> Choice {
        Choice {
            id: id.into(),
            text: id.to_uppercase(),
            correct,
        }
    }

    fn question(id: &str, kind: QuestionType, choices: Vec<Choice>) -> Question {
        Question {
            id: id.into(),
            kind,
            prompt: format!("prompt {id}"),
            choices,
            answer_text: None,
            explanation: None,
            tags: vec![],
            time_limit_sec: None,
            difficulty: None,
        }
    }

    fn single(id: &str) -> Question {
        question(
            id,
            QuestionType::Single,
            vec![choice("c", true), choice("x", false)],
        )
    }

    fn quiz_of(n: usize) -> Quiz {
        let questions = (0..n).map(|i| single(&format!("q{i}"))).collect();
        Quiz {
            id: "quiz".into(),
            title: "Quiz".into(),
            topic: "t".into(),
            questions,
            sources: Default::default(),
        }
    }

    fn start(quiz: &Quiz, n: usize) -> ExamAttempt {
        let mut rng = StdRng::seed_from_u64(7);
        let custom = CustomExamConfig {
            num_questions: n,
            total_minutes: 10,
        };
        create_exam_attempt(quiz, None, Some(custom), T0, &mut rng).unwrap()
    }

    #[test]
    fn never_pads_or_repeats() {
        let quiz = quiz_of(5);
        let attempt = start(&quiz, 10);
        assert_eq!(attempt.question_ids.len(), 5);
        let unique: BTreeSet<_> = attempt.question_ids.iter().collect();
        assert_eq!(unique.len(), 5);
        assert_eq!(attempt.current, 0);
        assert!(attempt.answers.is_empty());
        validate_attempt(&quiz, &attempt).unwrap();
    }

    #[test]
    fn truncates_to_requested_count() {
        let quiz = quiz_of(20);
        let attempt = start(&quiz, 7);
        assert_eq!(attempt.question_ids.len(), 7);
        assert_eq!(attempt.total_minutes, 10);
    }

    #[test]
    fn rejects_empty_quiz() {
        let quiz = quiz_of(0);
        let mut rng = StdRng::seed_from_u64(1);
        let err = create_exam_attempt(&quiz, None, None, T0, &mut rng).unwrap_err();
        assert_eq!(err, QuizError::EmptyQuiz("quiz".into()));
    }

    #[test]
    fn preset_wins_over_custom_and_defaults_apply() {
        let preset = ExamPreset {
            id: "p".into(),
            name: "P".into(),
            num_questions: 65,
            total_minutes: 90,
            section_names: None,
        };
        let custom = CustomExamConfig {
            num_questions: 5,
            total_minutes: 5,
        };
        assert_eq!(resolve_exam_size(Some(&preset), Some(custom)), (65, 90));
        assert_eq!(resolve_exam_size(None, Some(custom)), (5, 5));
        assert_eq!(resolve_exam_size(None, None), (10, 30));
        let zero = CustomExamConfig {
            num_questions: 0,
            total_minutes: 0,
        };
        assert_eq!(resolve_exam_size(None, Some(zero)), (10, 30));
    }

    #[test]
    fn single_choice_replaces_selection() {
        let quiz = quiz_of(1);
        let q = &quiz.questions[0];
        let mut attempt = start(&quiz, 1);
        assert!(attempt.select_choice(q, "x"));
        assert!(attempt.select_choice(q, "c"));
        assert_eq!(attempt.selected["q0"], vec!["c".to_string()]);
        assert!(is_correct_answer(q, &attempt.selected["q0"]));
        assert!(!is_correct_answer(q, &["c".into(), "x".into()]));
        assert_eq!(attempt.change_counts["q0"], 2);
        // Re-selecting the same choice is not a change.
        assert!(!attempt.select_choice(q, "c"));
        assert_eq!(attempt.change_counts["q0"], 2);
    }

    #[test]
    fn multi_choice_set_semantics() {
        let q = question(
            "m",
            QuestionType::Multi,
            vec![choice("a", true), choice("b", true), choice("c", false)],
        );
        assert!(!is_correct_answer(&q, &["a".into()]));
        assert!(is_correct_answer(&q, &["b".into(), "a".into()]));
        assert!(!is_correct_answer(&q, &["a".into(), "b".into(), "c".into()]));
        assert!(!is_correct_answer(&q, &["a".into(), "a".into()]));
    }

    #[test]
    fn multi_choice_toggles_membership() {
        let q = question(
            "m",
            QuestionType::Multi,
            vec![choice("a", true), choice("b", true), choice("c", false)],
        );
        let quiz = Quiz {
            id: "quiz".into(),
            title: "Q".into(),
            topic: String::new(),
            questions: vec![q.clone()],
            sources: Default::default(),
        };
        let mut attempt = start(&quiz, 1);
        attempt.select_choice(&q, "a");
        attempt.select_choice(&q, "c");
        attempt.select_choice(&q, "b");
        attempt.select_choice(&q, "c");
        assert_eq!(attempt.selected["m"], vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn free_text_is_stored_but_never_scored() {
        let q = question("t", QuestionType::Text, vec![]);
        let quiz = Quiz {
            id: "quiz".into(),
            title: "Q".into(),
            topic: String::new(),
            questions: vec![q.clone()],
            sources: Default::default(),
        };
        let mut attempt = start(&quiz, 1);
        assert!(!attempt.select_choice(&q, "anything"));
        assert!(attempt.set_text_answer(&q, "first"));
        assert!(attempt.set_text_answer(&q, "second"));
        assert_eq!(attempt.selected["t"], vec!["second".to_string()]);
        attempt.finish(&quiz, T0 + 1000, false);
        assert!(!attempt.answers[0].correct);
        assert_eq!(attempt.score, Some(0));
    }

    #[test]
    fn elimination_and_flags_stay_within_attempt() {
        let quiz = quiz_of(2);
        let mut attempt = start(&quiz, 1);
        let inside = quiz.question(&attempt.question_ids[0]).unwrap().clone();
        let outside_id = if inside.id == "q0" { "q1" } else { "q0" };
        let outside = quiz.question(outside_id).unwrap();

        assert!(attempt.toggle_elimination(&inside, "x"));
        assert_eq!(attempt.eliminated[&inside.id], vec!["x".to_string()]);
        assert!(attempt.toggle_elimination(&inside, "x"));
        assert!(attempt.eliminated.get(&inside.id).is_none());
        assert!(!attempt.toggle_elimination(outside, "x"));

        assert!(attempt.toggle_flag(&inside.id));
        assert_eq!(attempt.question_status(&inside.id), QuestionStatus::Flagged);
        assert!(!attempt.toggle_flag(outside_id));
        assert!(attempt.flagged.get(outside_id).is_none());
    }

    #[test]
    fn navigation_is_bounds_checked_and_tracks_time() {
        let quiz = quiz_of(3);
        let mut attempt = start(&quiz, 3);
        let first = attempt.question_ids[0].clone();
        let second = attempt.question_ids[1].clone();

        assert!(!attempt.navigate(3, T0 + 10));
        assert_eq!(attempt.current, 0);
        assert!(!attempt.prev(T0 + 10));

        assert!(attempt.next(T0 + 4_000));
        assert!(attempt.navigate(0, T0 + 6_000));
        assert!(attempt.navigate(1, T0 + 7_000));
        attempt.finish(&quiz, T0 + 10_000, false);

        let time = |id: &str| attempt.answers.iter().find(|a| a.question_id == id).unwrap().time_ms;
        assert_eq!(time(&first), 5_000);
        assert_eq!(time(&second), 5_000);
    }

    #[test]
    fn remaining_time_floors_at_zero() {
        let quiz = quiz_of(1);
        let attempt = start(&quiz, 1);
        assert_eq!(attempt.remaining_ms(T0), 600_000);
        assert_eq!(attempt.remaining_ms(T0 + 599_000), 1_000);
        assert_eq!(attempt.remaining_ms(T0 + 700_000), 0);
        assert!(attempt.is_time_up(T0 + 600_000));
        assert!(!attempt.is_time_up(T0 + 599_999));
    }

    #[test]
    fn seven_of_ten_scores_seventy() {
        let quiz = quiz_of(10);
        let mut attempt = start(&quiz, 10);
        let ids = attempt.question_ids.clone();
        for id in ids.iter().take(7) {
            let q = quiz.question(id).unwrap();
            attempt.select_choice(q, "c");
        }
        assert!(attempt.finish(&quiz, T0 + 1_000, false));
        assert_eq!(attempt.score, Some(70));
        assert_eq!(score_attempt(&attempt).correct_count, 7);
    }

    #[test]
    fn finish_stamps_once_and_is_frozen() {
        let quiz = quiz_of(2);
        let mut attempt = start(&quiz, 2);
        assert!(attempt.finish(&quiz, T0 - 5, true));
        assert_eq!(attempt.finished_at, Some(T0));
        assert!(attempt.auto_submitted);
        assert!(!attempt.finish(&quiz, T0 + 10_000, false));
        assert_eq!(attempt.finished_at, Some(T0));
        let q = quiz.question(&attempt.question_ids[0]).unwrap();
        assert!(!attempt.select_choice(q, "c"));
        assert!(!attempt.navigate(1, T0 + 20_000));
    }

    #[test]
    fn validate_rejects_foreign_and_duplicate_questions() {
        let quiz = quiz_of(3);
        let mut attempt = start(&quiz, 3);
        attempt.question_ids[1] = attempt.question_ids[0].clone();
        assert!(validate_attempt(&quiz, &attempt).is_err());

        let mut attempt = start(&quiz, 3);
        attempt.question_ids.push("nope".into());
        assert!(validate_attempt(&quiz, &attempt).is_err());

        let mut attempt = start(&quiz, 3);
        attempt.current = 3;
        assert!(validate_attempt(&quiz, &attempt).is_err());
    }

    #[test]
    fn phase_transitions() {
        assert!(ExamPhase::Setup
            .ensure(&[ExamPhase::Setup, ExamPhase::Results], "start")
            .is_ok());
        let err = ExamPhase::Running
            .ensure(&[ExamPhase::Setup, ExamPhase::Results], "start an exam")
            .unwrap_err();
        assert!(matches!(err, QuizError::InvalidTransition { .. }));
    }

    #[test]
    fn time_formatting() {
        assert_eq!(format_remaining(0), "00:00");
        assert_eq!(format_remaining(-5), "00:00");
        assert_eq!(format_remaining(61_500), "01:01");
        assert_eq!(format_remaining(90 * 60_000), "90:00");
        assert_eq!(human_time(42_000), "42s");
        assert_eq!(human_time(200_000), "3m 20s");
        assert_eq!(human_time(3_900_000), "1h 5m");
    }

    #[test]
    fn review_filters_and_cursor() {
        let quiz = quiz_of(4);
        let mut attempt = start(&quiz, 4);
        let ids = attempt.question_ids.clone();
        attempt.select_choice(quiz.question(&ids[0]).unwrap(), "c");
        attempt.set_flag(&ids[1], true);
        attempt.finish(&quiz, T0 + 1, false);

        assert_eq!(filtered_answers(&attempt, ReviewFilter::All).len(), 4);
        assert_eq!(filtered_answers(&attempt, ReviewFilter::Wrong).len(), 3);
        let flagged = filtered_answers(&attempt, ReviewFilter::Flagged);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].question_id, ids[1]);

        let mut review = ReviewMode::new(attempt.id.clone());
        assert!(!review.prev());
        assert!(review.next(3));
        assert!(review.next(3));
        assert!(!review.next(3));
        assert!(!review.jump(3, 3));
        assert!(review.jump(0, 3));
        review.index = 2;
        review.set_filter(ReviewFilter::Wrong);
        assert_eq!(review.index, 0);
    }
}
