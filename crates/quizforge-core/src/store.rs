//! Application state and the actions that change it.
//!
//! [`apply`] is a pure reducer: it takes a state and an action and returns
//! the next state without touching the clock, the random number generator or
//! storage. Time arrives inside the actions. [`Store`] owns the current state
//! and persists it through a [`StateBackend`] after every transition.
//!
//! Actions that refer to something that no longer exists (a deleted quiz, an
//! unknown attempt) leave the state unchanged. Payloads that would break an
//! invariant, or actions not allowed in the current exam phase, are errors.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analytics::ScoredAttempt;
use crate::error::QuizError;
use crate::exam::{filtered_answers, validate_attempt, ExamPhase};
use crate::model::{
    default_presets, ExamAttempt, ExamPreset, MicroDrill, PracticeAnswer, PracticeAttempt, Question,
    Quiz, ReviewCard, ReviewFilter, ReviewMode, SourceRef, Timestamp,
};
use crate::scheduler::{self, Grade};
use crate::traits::StateBackend;
use crate::transfer::ExportBundle;

/// Everything the application remembers between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_quiz_id: Option<String>,
    /// Keyed by question id.
    #[serde(default)]
    pub review_cards: BTreeMap<String, ReviewCard>,
    /// Newest first.
    #[serde(default)]
    pub practice_attempts: Vec<PracticeAttempt>,
    #[serde(default = "default_presets")]
    pub exam_presets: Vec<ExamPreset>,
    /// Finished exam attempts, oldest first.
    #[serde(default)]
    pub exam_attempts: Vec<ExamAttempt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_exam: Option<ExamAttempt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_mode: Option<ReviewMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub micro_drill: Option<MicroDrill>,
    #[serde(default)]
    pub exam_phase: ExamPhase,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            quizzes: Vec::new(),
            active_quiz_id: None,
            review_cards: BTreeMap::new(),
            practice_attempts: Vec::new(),
            exam_presets: default_presets(),
            exam_attempts: Vec::new(),
            current_exam: None,
            review_mode: None,
            micro_drill: None,
            exam_phase: ExamPhase::Setup,
        }
    }
}

impl AppState {
    /// Parse a persisted document, repairing the exam phase if it disagrees
    /// with whether an exam is in progress.
    pub fn from_json(document: &str) -> Result<Self, serde_json::Error> {
        let mut state: AppState = serde_json::from_str(document)?;
        match (&state.current_exam, state.exam_phase) {
            (Some(_), phase) if phase != ExamPhase::Running => {
                state.exam_phase = ExamPhase::Running;
            }
            (None, ExamPhase::Running) => state.exam_phase = ExamPhase::Setup,
            _ => {}
        }
        if state.review_mode.is_some() && state.exam_phase != ExamPhase::Review {
            state.review_mode = None;
        }
        Ok(state)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn quiz(&self, id: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.id == id)
    }

    pub fn active_quiz(&self) -> Option<&Quiz> {
        self.active_quiz_id.as_deref().and_then(|id| self.quiz(id))
    }

    pub fn preset(&self, id: &str) -> Option<&ExamPreset> {
        self.exam_presets.iter().find(|p| p.id == id)
    }

    pub fn exam_attempt(&self, id: &str) -> Option<&ExamAttempt> {
        self.exam_attempts.iter().find(|a| a.id == id)
    }

    pub fn practice_attempt(&self, id: &str) -> Option<&PracticeAttempt> {
        self.practice_attempts.iter().find(|a| a.id == id)
    }

    /// Most recently finished exam attempt.
    pub fn last_exam_attempt(&self) -> Option<&ExamAttempt> {
        self.exam_attempts
            .iter()
            .max_by_key(|a| a.finished_at.unwrap_or(a.started_at))
    }

    /// Every exam and practice attempt against `quiz_id`.
    pub fn attempts_for_quiz(&self, quiz_id: &str) -> Vec<ScoredAttempt<'_>> {
        self.exam_attempts
            .iter()
            .filter(|a| a.quiz_id == quiz_id)
            .map(ScoredAttempt::Exam)
            .chain(
                self.practice_attempts
                    .iter()
                    .filter(|a| a.quiz_id == quiz_id)
                    .map(ScoredAttempt::Practice),
            )
            .collect()
    }

    /// The portable subset of the state.
    pub fn export_bundle(&self) -> ExportBundle {
        ExportBundle {
            quizzes: self.quizzes.clone(),
            exam_presets: self.exam_presets.clone(),
            exam_attempts: self.exam_attempts.clone(),
            practice_attempts: self.practice_attempts.clone(),
            ..ExportBundle::default()
        }
    }
}

/// Every way the state can change.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddQuiz(Quiz),
    UpdateQuiz(Quiz),
    RemoveQuiz {
        quiz_id: String,
    },
    SetActiveQuiz {
        quiz_id: Option<String>,
    },
    AddSourceRef {
        quiz_id: String,
        question_id: String,
        source: SourceRef,
    },
    RemoveSourceRef {
        quiz_id: String,
        question_id: String,
        index: usize,
    },
    /// Create a review card for every question of the quiz that lacks one.
    SeedReviewCards {
        quiz_id: String,
        now: Timestamp,
    },
    GradeReview {
        question_id: String,
        grade: Grade,
        now: Timestamp,
    },
    StartPractice(PracticeAttempt),
    RecordPracticeAnswer {
        attempt_id: String,
        answer: PracticeAnswer,
    },
    FinishPractice {
        attempt_id: String,
        now: Timestamp,
    },
    /// Begin an exam with an attempt built by `exam::create_exam_attempt`.
    StartExam(ExamAttempt),
    SelectChoice {
        question_id: String,
        choice_id: String,
    },
    SetTextAnswer {
        question_id: String,
        text: String,
    },
    ToggleElimination {
        question_id: String,
        choice_id: String,
    },
    ToggleFlag {
        question_id: String,
    },
    Navigate {
        index: usize,
        now: Timestamp,
    },
    FinishExam {
        now: Timestamp,
        auto_submitted: bool,
    },
    StartReview {
        attempt_id: String,
    },
    SetReviewFilter {
        filter: ReviewFilter,
    },
    NavigateReview {
        index: usize,
    },
    CloseReview,
    CreateMicroDrill {
        quiz_id: String,
        question_ids: Vec<String>,
    },
    ClearMicroDrill,
    Import(ExportBundle),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddQuiz(_) => "add_quiz",
            Action::UpdateQuiz(_) => "update_quiz",
            Action::RemoveQuiz { .. } => "remove_quiz",
            Action::SetActiveQuiz { .. } => "set_active_quiz",
            Action::AddSourceRef { .. } => "add_source_ref",
            Action::RemoveSourceRef { .. } => "remove_source_ref",
            Action::SeedReviewCards { .. } => "seed_review_cards",
            Action::GradeReview { .. } => "grade_review",
            Action::StartPractice(_) => "start_practice",
            Action::RecordPracticeAnswer { .. } => "record_practice_answer",
            Action::FinishPractice { .. } => "finish_practice",
            Action::StartExam(_) => "start_exam",
            Action::SelectChoice { .. } => "select_choice",
            Action::SetTextAnswer { .. } => "set_text_answer",
            Action::ToggleElimination { .. } => "toggle_elimination",
            Action::ToggleFlag { .. } => "toggle_flag",
            Action::Navigate { .. } => "navigate",
            Action::FinishExam { .. } => "finish_exam",
            Action::StartReview { .. } => "start_review",
            Action::SetReviewFilter { .. } => "set_review_filter",
            Action::NavigateReview { .. } => "navigate_review",
            Action::CloseReview => "close_review",
            Action::CreateMicroDrill { .. } => "create_micro_drill",
            Action::ClearMicroDrill => "clear_micro_drill",
            Action::Import(_) => "import",
        }
    }
}

fn validate_quiz(quiz: &Quiz) -> Result<(), QuizError> {
    if quiz.id.trim().is_empty() {
        return Err(QuizError::InvalidQuiz("quiz id is empty".into()));
    }
    let mut ids = BTreeSet::new();
    for question in &quiz.questions {
        if !ids.insert(question.id.as_str()) {
            return Err(QuizError::InvalidQuiz(format!(
                "duplicate question id {}",
                question.id
            )));
        }
    }
    Ok(())
}

/// Apply one action to `state`, returning the next state.
pub fn apply(state: &AppState, action: Action) -> Result<AppState, QuizError> {
    let mut next = state.clone();
    debug!(action = action.name(), phase = %state.exam_phase, "applying action");

    match action {
        Action::AddQuiz(quiz) => {
            validate_quiz(&quiz)?;
            if next.quiz(&quiz.id).is_some() {
                return Err(QuizError::InvalidQuiz(format!(
                    "a quiz with id {} already exists",
                    quiz.id
                )));
            }
            next.active_quiz_id = Some(quiz.id.clone());
            next.quizzes.push(quiz);
        }

        Action::UpdateQuiz(quiz) => {
            validate_quiz(&quiz)?;
            if let Some(slot) = next.quizzes.iter_mut().find(|q| q.id == quiz.id) {
                *slot = quiz;
            }
        }

        Action::RemoveQuiz { quiz_id } => {
            if next
                .current_exam
                .as_ref()
                .is_some_and(|exam| exam.quiz_id == quiz_id)
            {
                return Err(QuizError::InvalidTransition {
                    phase: next.exam_phase.to_string(),
                    action: "remove the quiz of a running exam".into(),
                });
            }
            next.quizzes.retain(|q| q.id != quiz_id);
            if next.active_quiz_id.as_deref() == Some(quiz_id.as_str()) {
                next.active_quiz_id = None;
            }
            if next
                .micro_drill
                .as_ref()
                .is_some_and(|d| d.quiz_id == quiz_id)
            {
                next.micro_drill = None;
            }
        }

        Action::SetActiveQuiz { quiz_id } => match quiz_id {
            Some(id) if next.quiz(&id).is_some() => next.active_quiz_id = Some(id),
            Some(_) => {}
            None => next.active_quiz_id = None,
        },

        Action::AddSourceRef {
            quiz_id,
            question_id,
            source,
        } => {
            if let Some(quiz) = next.quizzes.iter_mut().find(|q| q.id == quiz_id) {
                if quiz.question(&question_id).is_some() {
                    quiz.sources.entry(question_id).or_default().push(source);
                }
            }
        }

        Action::RemoveSourceRef {
            quiz_id,
            question_id,
            index,
        } => {
            if let Some(quiz) = next.quizzes.iter_mut().find(|q| q.id == quiz_id) {
                if let Some(refs) = quiz.sources.get_mut(&question_id) {
                    if index < refs.len() {
                        refs.remove(index);
                    }
                    if refs.is_empty() {
                        quiz.sources.remove(&question_id);
                    }
                }
            }
        }

        Action::SeedReviewCards { quiz_id, now } => {
            if let Some(quiz) = state.quiz(&quiz_id) {
                for question in &quiz.questions {
                    next.review_cards
                        .entry(question.id.clone())
                        .or_insert_with(|| scheduler::initialize(&question.id, now));
                }
            }
        }

        Action::GradeReview {
            question_id,
            grade,
            now,
        } => {
            let card = next
                .review_cards
                .get(&question_id)
                .cloned()
                .unwrap_or_else(|| scheduler::initialize(&question_id, now));
            next.review_cards
                .insert(question_id, scheduler::grade(&card, grade, now));
        }

        Action::StartPractice(attempt) => {
            if state.quiz(&attempt.quiz_id).is_none() {
                return Err(QuizError::QuizNotFound(attempt.quiz_id));
            }
            next.practice_attempts.insert(0, attempt);
        }

        Action::RecordPracticeAnswer { attempt_id, answer } => {
            if let Some(attempt) = next
                .practice_attempts
                .iter_mut()
                .find(|a| a.id == attempt_id && a.finished_at.is_none())
            {
                attempt.answers.push(answer);
            }
        }

        Action::FinishPractice { attempt_id, now } => {
            if let Some(attempt) = next
                .practice_attempts
                .iter_mut()
                .find(|a| a.id == attempt_id && a.finished_at.is_none())
            {
                attempt.finished_at = Some(now.max(attempt.started_at));
            }
        }

        Action::StartExam(attempt) => {
            state
                .exam_phase
                .ensure(&[ExamPhase::Setup, ExamPhase::Results], "start an exam")?;
            let quiz = state
                .quiz(&attempt.quiz_id)
                .ok_or_else(|| QuizError::QuizNotFound(attempt.quiz_id.clone()))?;
            validate_attempt(quiz, &attempt)?;
            info!(
                attempt = %attempt.id,
                quiz = %quiz.id,
                questions = attempt.question_ids.len(),
                minutes = attempt.total_minutes,
                "exam started"
            );
            next.current_exam = Some(attempt);
            next.review_mode = None;
            next.exam_phase = ExamPhase::Running;
        }

        Action::SelectChoice {
            question_id,
            choice_id,
        } => {
            state.exam_phase.ensure(&[ExamPhase::Running], "select a choice")?;
            with_exam_question(state, &mut next, &question_id, |exam, question| {
                exam.select_choice(question, &choice_id);
            });
        }

        Action::SetTextAnswer { question_id, text } => {
            state.exam_phase.ensure(&[ExamPhase::Running], "answer a question")?;
            with_exam_question(state, &mut next, &question_id, |exam, question| {
                exam.set_text_answer(question, &text);
            });
        }

        Action::ToggleElimination {
            question_id,
            choice_id,
        } => {
            state
                .exam_phase
                .ensure(&[ExamPhase::Running], "eliminate a choice")?;
            with_exam_question(state, &mut next, &question_id, |exam, question| {
                exam.toggle_elimination(question, &choice_id);
            });
        }

        Action::ToggleFlag { question_id } => {
            state.exam_phase.ensure(&[ExamPhase::Running], "flag a question")?;
            if let Some(exam) = next.current_exam.as_mut() {
                exam.toggle_flag(&question_id);
            }
        }

        Action::Navigate { index, now } => {
            state.exam_phase.ensure(&[ExamPhase::Running], "navigate")?;
            if let Some(exam) = next.current_exam.as_mut() {
                exam.navigate(index, now);
            }
        }

        Action::FinishExam {
            now,
            auto_submitted,
        } => {
            state.exam_phase.ensure(&[ExamPhase::Running], "finish an exam")?;
            let Some(mut exam) = next.current_exam.take() else {
                next.exam_phase = ExamPhase::Setup;
                return Ok(next);
            };
            let quiz = state
                .quiz(&exam.quiz_id)
                .ok_or_else(|| QuizError::QuizNotFound(exam.quiz_id.clone()))?;
            exam.finish(quiz, now, auto_submitted);
            info!(
                attempt = %exam.id,
                score = exam.score.unwrap_or(0),
                auto_submitted,
                "exam finished"
            );
            next.review_mode = Some(ReviewMode::new(exam.id.clone()));
            next.exam_attempts.push(exam);
            next.exam_phase = ExamPhase::Review;
        }

        Action::StartReview { attempt_id } => {
            state.exam_phase.ensure(
                &[ExamPhase::Setup, ExamPhase::Review, ExamPhase::Results],
                "review an attempt",
            )?;
            if state.exam_attempt(&attempt_id).is_some() {
                next.review_mode = Some(ReviewMode::new(attempt_id));
                next.exam_phase = ExamPhase::Review;
            }
        }

        Action::SetReviewFilter { filter } => {
            if let Some(review) = next.review_mode.as_mut() {
                review.set_filter(filter);
            }
        }

        Action::NavigateReview { index } => {
            if let Some(review) = next.review_mode.as_mut() {
                if let Some(attempt) = state.exam_attempt(&review.attempt_id) {
                    let len = filtered_answers(attempt, review.filter).len();
                    review.jump(index, len);
                }
            }
        }

        Action::CloseReview => {
            state.exam_phase.ensure(&[ExamPhase::Review], "close the review")?;
            next.review_mode = None;
            next.exam_phase = ExamPhase::Results;
        }

        Action::CreateMicroDrill {
            quiz_id,
            question_ids,
        } => {
            if let Some(quiz) = state.quiz(&quiz_id) {
                let mut seen = BTreeSet::new();
                let question_ids: Vec<String> = question_ids
                    .into_iter()
                    .filter(|id| quiz.question(id).is_some() && seen.insert(id.clone()))
                    .collect();
                debug!(quiz = %quiz_id, questions = question_ids.len(), "micro-drill created");
                next.micro_drill = Some(MicroDrill {
                    quiz_id,
                    question_ids,
                });
            }
        }

        Action::ClearMicroDrill => next.micro_drill = None,

        Action::Import(bundle) => {
            info!(
                quizzes = bundle.quizzes.len(),
                presets = bundle.exam_presets.len(),
                exam_attempts = bundle.exam_attempts.len(),
                practice_attempts = bundle.practice_attempts.len(),
                "importing bundle"
            );
            next.quizzes.extend(bundle.quizzes);
            next.exam_presets.extend(bundle.exam_presets);
            next.exam_attempts.extend(bundle.exam_attempts);
            next.practice_attempts.extend(bundle.practice_attempts);
        }
    }

    Ok(next)
}

/// Run `f` on the running exam and one of its questions, if both resolve.
fn with_exam_question<F>(state: &AppState, next: &mut AppState, question_id: &str, f: F)
where
    F: FnOnce(&mut ExamAttempt, &Question),
{
    let Some(exam) = next.current_exam.as_mut() else {
        return;
    };
    let Some(question) = state
        .quiz(&exam.quiz_id)
        .and_then(|quiz| quiz.question(question_id))
    else {
        return;
    };
    f(exam, question);
}

/// Owns the current state and keeps the backend in sync with it.
pub struct Store<B: StateBackend> {
    state: AppState,
    backend: B,
}

impl<B: StateBackend> Store<B> {
    /// Load the persisted state, falling back to defaults if it is missing
    /// or unreadable.
    pub fn open(backend: B) -> Self {
        let state = match backend.load() {
            Ok(Some(document)) => match AppState::from_json(&document) {
                Ok(state) => state,
                Err(e) => {
                    warn!(error = %e, "discarding unreadable persisted state");
                    AppState::default()
                }
            },
            Ok(None) => AppState::default(),
            Err(e) => {
                warn!(error = %e, "failed to load persisted state");
                AppState::default()
            }
        };
        Self { state, backend }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Apply an action and persist the result. Persistence failures are
    /// logged; the in-memory state still advances.
    pub fn dispatch(&mut self, action: Action) -> Result<&AppState, QuizError> {
        self.state = apply(&self.state, action)?;
        self.persist();
        Ok(&self.state)
    }

    fn persist(&mut self) {
        match self.state.to_json() {
            Ok(document) => {
                if let Err(e) = self.backend.save(&document) {
                    warn!(error = %e, "failed to persist state");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize state"),
        }
    }
}
