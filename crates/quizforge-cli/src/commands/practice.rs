//! The `quizforge practice` commands.

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use quizforge_core::exam::is_correct_answer;
use quizforge_core::model::{PracticeAnswer, PracticeAttempt, PracticeMode};
use quizforge_core::store::Action;

use super::{resolve_choice, App};

#[derive(Subcommand)]
pub enum PracticeCommand {
    /// Start a practice session
    Start {
        #[arg(long)]
        quiz: Option<String>,

        /// learn, timed or cram
        #[arg(long, default_value = "learn")]
        mode: PracticeMode,
    },

    /// Record an answer: choices by number, letter or id, or free text
    Answer {
        /// Question id
        question: String,

        #[arg(required = true)]
        answer: Vec<String>,

        /// Session id (default: the newest open session)
        #[arg(long)]
        attempt: Option<String>,

        /// Time spent on the question
        #[arg(long, default_value = "0")]
        time_ms: u64,
    },

    /// Close a practice session
    Finish {
        #[arg(long)]
        attempt: Option<String>,
    },
}

pub fn execute(app: &mut App, command: PracticeCommand) -> Result<()> {
    match command {
        PracticeCommand::Start { quiz, mode } => {
            let quiz = app.quiz(quiz.as_deref())?;
            let attempt = PracticeAttempt::new(quiz.id.clone(), mode, app.now());
            println!(
                "Started {mode} practice on '{}' ({} questions), session {}",
                quiz.title,
                quiz.questions.len(),
                attempt.id
            );
            app.dispatch(Action::StartPractice(attempt))?;
            Ok(())
        }
        PracticeCommand::Answer {
            question,
            answer,
            attempt,
            time_ms,
        } => {
            let session = open_session(app, attempt.as_deref())?;
            let (attempt_id, quiz_id) = (session.id.clone(), session.quiz_id.clone());
            let quiz = app.quiz(Some(&quiz_id))?;
            let q = quiz
                .question(&question)
                .with_context(|| format!("question {question} is not in '{}'", quiz.title))?;

            let correct = if q.kind.is_choice_based() {
                let selected = answer
                    .iter()
                    .map(|token| resolve_choice(q, token))
                    .collect::<Result<Vec<_>>>()?;
                is_correct_answer(q, &selected)
            } else {
                false
            };

            if q.kind.is_free_text() {
                println!("Recorded. Free-text answers are not auto-scored.");
                println!("Reference answer: {}", q.answer_summary());
            } else if correct {
                println!("Correct.");
            } else {
                println!("Incorrect. Answer: {}", q.answer_summary());
            }
            if let Some(explanation) = q.explanation.as_deref().filter(|e| !e.is_empty()) {
                println!("Why: {explanation}");
            }

            app.dispatch(Action::RecordPracticeAnswer {
                attempt_id,
                answer: PracticeAnswer {
                    question_id: question,
                    correct,
                    time_ms,
                },
            })?;
            Ok(())
        }
        PracticeCommand::Finish { attempt } => {
            let attempt_id = open_session(app, attempt.as_deref())?.id.clone();
            let now = app.now();
            let state = app.dispatch(Action::FinishPractice {
                attempt_id: attempt_id.clone(),
                now,
            })?;
            let session = state
                .practice_attempt(&attempt_id)
                .context("practice session missing")?;
            let correct = session.answers.iter().filter(|a| a.correct).count();
            println!(
                "Practice finished: {} answered, {} correct",
                session.answers.len(),
                correct
            );
            Ok(())
        }
    }
}

/// The named session, or the newest one still open.
fn open_session<'a>(app: &'a App, id: Option<&str>) -> Result<&'a PracticeAttempt> {
    let state = app.state();
    let session = match id {
        Some(id) => state
            .practice_attempt(id)
            .with_context(|| format!("practice session not found: {id}"))?,
        None => state
            .practice_attempts
            .iter()
            .find(|a| a.finished_at.is_none())
            .context("no open practice session; start one with `quizforge practice start`")?,
    };
    if session.finished_at.is_some() {
        bail!("practice session {} is already finished", session.id);
    }
    Ok(session)
}
