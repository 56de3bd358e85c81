//! The `quizforge exam` commands, including the interactive `exam run` session.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tokio::io::{AsyncBufReadExt, BufReader};

use quizforge_core::countdown::{CountdownEvent, ExamCountdown, DEFAULT_PERIOD};
use quizforge_core::exam::{
    create_exam_attempt, filtered_answers, format_remaining, human_time, score_attempt,
    ExamPhase, QuestionStatus,
};
use quizforge_core::model::{CustomExamConfig, ExamAttempt, Quiz, ReviewFilter};
use quizforge_core::store::Action;

use super::{choice_label, resolve_choice, rng, App};

#[derive(Subcommand)]
pub enum ExamCommand {
    /// Start a new exam
    Start {
        #[arg(long)]
        quiz: Option<String>,

        /// Preset id (see `quizforge presets`)
        #[arg(long)]
        preset: Option<String>,

        /// Number of questions when no preset is given
        #[arg(long)]
        questions: Option<usize>,

        /// Time limit in minutes when no preset is given
        #[arg(long)]
        minutes: Option<u32>,

        /// Seed for the question shuffle
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the current question, timer and palette
    Status,

    /// Select a choice (number, letter or id); toggles on multi-choice questions
    Select { choice: String },

    /// Answer a free-text question
    Answer {
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Toggle a choice's eliminated mark
    Eliminate { choice: String },

    /// Toggle the flag on the current question
    Flag,

    /// Jump to a question by its 1-based number
    Goto { number: usize },

    /// Move to the next question
    Next,

    /// Move to the previous question
    Prev,

    /// Submit the exam
    Submit,

    /// Take the exam interactively with a live countdown
    Run,

    /// Review a finished attempt
    Review {
        /// Attempt id (default: the attempt under review, else the latest)
        #[arg(long)]
        attempt: Option<String>,

        /// Show only wrong, flagged or all answers
        #[arg(long)]
        filter: Option<ReviewFilter>,

        /// Jump to this 1-based position
        #[arg(long)]
        index: Option<usize>,

        /// Move to the next reviewed answer
        #[arg(long)]
        next: bool,

        /// Move to the previous reviewed answer
        #[arg(long)]
        prev: bool,
    },

    /// Leave the review and go to results
    Close,
}

/// One change to the running exam.
enum Step {
    Select(String),
    Answer(String),
    Eliminate(String),
    Flag,
    Goto(usize),
    Next,
    Prev,
}

pub async fn execute(app: &mut App, command: ExamCommand) -> Result<()> {
    match command {
        ExamCommand::Start {
            quiz,
            preset,
            questions,
            minutes,
            seed,
        } => start(app, quiz.as_deref(), preset.as_deref(), questions, minutes, seed),
        ExamCommand::Status => status(app),
        ExamCommand::Select { choice } => step(app, Step::Select(choice)),
        ExamCommand::Answer { text } => step(app, Step::Answer(text.join(" "))),
        ExamCommand::Eliminate { choice } => step(app, Step::Eliminate(choice)),
        ExamCommand::Flag => step(app, Step::Flag),
        ExamCommand::Goto { number } => step(app, Step::Goto(number)),
        ExamCommand::Next => step(app, Step::Next),
        ExamCommand::Prev => step(app, Step::Prev),
        ExamCommand::Submit => {
            if expire_if_due(app)? {
                return Ok(());
            }
            submit(app, false)
        }
        ExamCommand::Run => run(app).await,
        ExamCommand::Review {
            attempt,
            filter,
            index,
            next,
            prev,
        } => review(app, attempt, filter, index, next, prev),
        ExamCommand::Close => {
            app.dispatch(Action::CloseReview)?;
            println!("Review closed. Start another exam with `quizforge exam start`.");
            Ok(())
        }
    }
}

fn start(
    app: &mut App,
    quiz: Option<&str>,
    preset: Option<&str>,
    questions: Option<usize>,
    minutes: Option<u32>,
    seed: Option<u64>,
) -> Result<()> {
    expire_if_due(app)?;
    if app.state().exam_phase == ExamPhase::Review {
        app.dispatch(Action::CloseReview)?;
    }
    let quiz = app.quiz(quiz)?;
    let preset = match preset {
        Some(id) => Some(
            app.state()
                .preset(id)
                .with_context(|| format!("preset not found: {id}"))?,
        ),
        None => None,
    };
    let custom = (questions.is_some() || minutes.is_some()).then(|| CustomExamConfig {
        num_questions: questions.unwrap_or(0),
        total_minutes: minutes.unwrap_or(0),
    });
    let attempt = create_exam_attempt(quiz, preset, custom, app.now(), &mut rng(seed))?;
    let started = format!(
        "Started '{}': {} questions, {} minutes (attempt {})",
        quiz.title,
        attempt.question_ids.len(),
        attempt.total_minutes,
        attempt.id
    );
    app.dispatch(Action::StartExam(attempt))?;
    println!("{started}");
    print_current(app)
}

/// Submit the running exam automatically once its time is up. Returns `true`
/// when that happened.
fn expire_if_due(app: &mut App) -> Result<bool> {
    let now = app.now();
    let expired = app.state().exam_phase == ExamPhase::Running
        && app
            .state()
            .current_exam
            .as_ref()
            .is_some_and(|exam| exam.is_time_up(now));
    if expired {
        println!("Time is up. The exam was submitted automatically.");
        submit(app, true)?;
    }
    Ok(expired)
}

fn running(app: &App) -> Result<(&ExamAttempt, &Quiz)> {
    let state = app.state();
    let exam = match (state.exam_phase, state.current_exam.as_ref()) {
        (ExamPhase::Running, Some(exam)) => exam,
        _ => bail!("no exam is running; start one with `quizforge exam start`"),
    };
    let quiz = state
        .quiz(&exam.quiz_id)
        .with_context(|| format!("quiz not found: {}", exam.quiz_id))?;
    Ok((exam, quiz))
}

fn step(app: &mut App, step: Step) -> Result<()> {
    if expire_if_due(app)? {
        return Ok(());
    }
    let action = {
        let (exam, quiz) = running(app)?;
        let question_id = exam
            .current_question_id()
            .context("exam has no current question")?
            .to_string();
        let question = quiz
            .question(&question_id)
            .with_context(|| format!("question not found: {question_id}"))?;
        let now = app.now();
        match step {
            Step::Select(token) => {
                if !question.kind.is_choice_based() {
                    bail!("this is a free-text question; use `answer`");
                }
                Action::SelectChoice {
                    question_id,
                    choice_id: resolve_choice(question, &token)?,
                }
            }
            Step::Answer(text) => {
                if !question.kind.is_free_text() {
                    bail!("this question has choices; use `select`");
                }
                Action::SetTextAnswer {
                    question_id,
                    text: text.trim().to_string(),
                }
            }
            Step::Eliminate(token) => Action::ToggleElimination {
                question_id,
                choice_id: resolve_choice(question, &token)?,
            },
            Step::Flag => Action::ToggleFlag { question_id },
            Step::Goto(number) => {
                let len = exam.question_ids.len();
                if number == 0 || number > len {
                    bail!("question number must be between 1 and {len}");
                }
                Action::Navigate {
                    index: number - 1,
                    now,
                }
            }
            Step::Next => Action::Navigate {
                index: (exam.current + 1).min(exam.question_ids.len() - 1),
                now,
            },
            Step::Prev => Action::Navigate {
                index: exam.current.saturating_sub(1),
                now,
            },
        }
    };
    app.dispatch(action)?;
    print_current(app)
}

fn submit(app: &mut App, auto_submitted: bool) -> Result<()> {
    let now = app.now();
    let state = app.dispatch(Action::FinishExam {
        now,
        auto_submitted,
    })?;
    let attempt = state
        .last_exam_attempt()
        .context("finished attempt missing")?;
    let score = score_attempt(attempt);
    let unanswered = attempt
        .answers
        .iter()
        .filter(|a| a.selected.is_empty())
        .count();
    println!(
        "Score: {}% ({}/{} correct), time {}",
        score.score_pct,
        score.correct_count,
        score.total,
        human_time(attempt.finished_at.unwrap_or(now).saturating_sub(attempt.started_at) as u64)
    );
    if unanswered > 0 {
        println!("{unanswered} question(s) left unanswered");
    }
    println!("Review with `quizforge exam review --filter wrong`, or see `quizforge report`.");
    Ok(())
}

fn status(app: &mut App) -> Result<()> {
    if expire_if_due(app)? {
        return Ok(());
    }
    let state = app.state();
    match state.exam_phase {
        ExamPhase::Running => print_current(app),
        ExamPhase::Review => print_review(app),
        ExamPhase::Setup | ExamPhase::Results => {
            println!("No exam is running.");
            if let Some(last) = state.last_exam_attempt() {
                println!(
                    "Last attempt: {}% on {} ({})",
                    last.score.unwrap_or(0),
                    state
                        .quiz(&last.quiz_id)
                        .map(|q| q.title.as_str())
                        .unwrap_or("a removed quiz"),
                    last.id
                );
            }
            Ok(())
        }
    }
}

/// Print the current question of the running exam with its palette.
fn print_current(app: &App) -> Result<()> {
    let (exam, quiz) = running(app)?;
    let now = app.now();
    let Some(question_id) = exam.current_question_id() else {
        return Ok(());
    };
    let question = quiz
        .question(question_id)
        .with_context(|| format!("question not found: {question_id}"))?;

    let flagged = exam.question_status(question_id) == QuestionStatus::Flagged;
    println!();
    println!(
        "Question {}/{}{}  [{} left]",
        exam.current + 1,
        exam.question_ids.len(),
        if flagged { " (flagged)" } else { "" },
        format_remaining(exam.remaining_ms(now))
    );
    println!("{}", question.prompt);

    let selected = exam.selected.get(question_id);
    let eliminated = exam.eliminated.get(question_id);
    for (i, choice) in question.choices.iter().enumerate() {
        let is_selected = selected.is_some_and(|s| s.contains(&choice.id));
        let is_eliminated = eliminated.is_some_and(|e| e.contains(&choice.id));
        println!(
            "  [{}] {}) {}{}",
            if is_selected { "x" } else { " " },
            choice_label(i),
            choice.text,
            if is_eliminated { "  (eliminated)" } else { "" }
        );
    }
    if question.kind.is_free_text() {
        match selected.and_then(|s| s.first()) {
            Some(text) => println!("  Your answer: {text}"),
            None => println!("  (free text, answer with `answer <text>`)"),
        }
    }

    let palette: Vec<String> = exam
        .question_ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let mark = match exam.question_status(id) {
                QuestionStatus::Answered => '*',
                QuestionStatus::Flagged => '!',
                QuestionStatus::Unanswered => ' ',
            };
            if i == exam.current {
                format!("<{}{mark}>", i + 1)
            } else {
                format!("[{}{mark}]", i + 1)
            }
        })
        .collect();
    println!("{}", palette.join(" "));
    Ok(())
}

fn review(
    app: &mut App,
    attempt: Option<String>,
    filter: Option<ReviewFilter>,
    index: Option<usize>,
    next: bool,
    prev: bool,
) -> Result<()> {
    expire_if_due(app)?;
    let state = app.state();
    let reviewing = state.review_mode.as_ref().map(|r| r.attempt_id.clone());
    let target = match attempt {
        Some(id) => Some(id),
        None if reviewing.is_some() => None,
        None => Some(
            state
                .last_exam_attempt()
                .map(|a| a.id.clone())
                .context("no finished exams to review")?,
        ),
    };
    if let Some(attempt_id) = target {
        if reviewing.as_deref() != Some(attempt_id.as_str()) {
            if state.exam_attempt(&attempt_id).is_none() {
                bail!("attempt not found: {attempt_id}");
            }
            app.dispatch(Action::StartReview { attempt_id })?;
        }
    }
    if let Some(filter) = filter {
        app.dispatch(Action::SetReviewFilter { filter })?;
    }

    let cursor = app
        .state()
        .review_mode
        .as_ref()
        .map(|r| r.index)
        .unwrap_or(0);
    let target_index = match (index, next, prev) {
        (Some(n), _, _) => Some(n.saturating_sub(1)),
        (None, true, _) => Some(cursor + 1),
        (None, false, true) => cursor.checked_sub(1),
        _ => None,
    };
    if let Some(index) = target_index {
        app.dispatch(Action::NavigateReview { index })?;
    }
    print_review(app)
}

fn print_review(app: &App) -> Result<()> {
    let state = app.state();
    let review = state.review_mode.as_ref().context("not reviewing an attempt")?;
    let attempt = state
        .exam_attempt(&review.attempt_id)
        .with_context(|| format!("attempt not found: {}", review.attempt_id))?;
    let answers = filtered_answers(attempt, review.filter);
    let score = score_attempt(attempt);

    println!(
        "Reviewing attempt {} ({}%, {}/{} correct), filter: {}",
        attempt.id, score.score_pct, score.correct_count, score.total, review.filter
    );
    let Some(answer) = answers.get(review.index) else {
        println!("No answers match this filter.");
        return Ok(());
    };
    let question = state
        .quiz(&attempt.quiz_id)
        .and_then(|q| q.question(&answer.question_id));

    println!();
    println!(
        "{}/{}  {}{}",
        review.index + 1,
        answers.len(),
        if answer.correct { "correct" } else { "wrong" },
        if answer.flagged { " (flagged)" } else { "" }
    );
    match question {
        Some(question) => {
            println!("{}", question.prompt);
            let picked: Vec<String> = answer
                .selected
                .iter()
                .map(|id| {
                    question
                        .choices
                        .iter()
                        .find(|c| &c.id == id)
                        .map(|c| c.text.clone())
                        .unwrap_or_else(|| id.clone())
                })
                .collect();
            println!(
                "  Your answer: {}",
                if picked.is_empty() {
                    "(none)".to_string()
                } else {
                    picked.join(", ")
                }
            );
            println!("  Correct answer: {}", question.answer_summary());
            if let Some(explanation) = question.explanation.as_deref().filter(|e| !e.is_empty()) {
                println!("  Why: {explanation}");
            }
        }
        None => println!("(question {} no longer exists)", answer.question_id),
    }
    println!(
        "  Time: {}, changes: {}",
        human_time(answer.time_ms),
        answer.changed_count
    );
    Ok(())
}

/// Parse one line typed during `exam run`.
fn parse_line(line: &str) -> Option<Result<Command>> {
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let command = match (word.to_lowercase().as_str(), rest) {
        ("" | "status", _) => Command::Show,
        ("n" | "next", _) => Command::Step(Step::Next),
        ("p" | "prev", _) => Command::Step(Step::Prev),
        ("f" | "flag", _) => Command::Step(Step::Flag),
        ("g" | "goto", n) => match n.parse() {
            Ok(n) => Command::Step(Step::Goto(n)),
            Err(_) => return Some(Err(anyhow::anyhow!("usage: goto <number>"))),
        },
        ("s" | "select", choice) => Command::Step(Step::Select(choice.to_string())),
        ("e" | "eliminate", choice) if !choice.is_empty() => {
            Command::Step(Step::Eliminate(choice.to_string()))
        }
        ("a" | "answer", text) => Command::Step(Step::Answer(text.to_string())),
        ("submit", _) => Command::Submit,
        ("q" | "quit", _) => Command::Quit,
        ("h" | "help" | "?", _) => Command::Help,
        _ => return None,
    };
    Some(Ok(command))
}

enum Command {
    Show,
    Step(Step),
    Submit,
    Quit,
    Help,
}

const RUN_HELP: &str = "Commands: s <choice> select, a <text> answer, e <choice> eliminate, f flag, \
n next, p prev, g <n> goto, submit, q quit (the exam keeps running)";

async fn run(app: &mut App) -> Result<()> {
    if expire_if_due(app)? {
        return Ok(());
    }
    let (started_at, total_minutes) = {
        let (exam, _) = running(app)?;
        (exam.started_at, exam.total_minutes)
    };

    let (countdown, mut events) =
        ExamCountdown::spawn(started_at, total_minutes, app.clock.clone(), DEFAULT_PERIOD);
    println!("{RUN_HELP}");
    print_current(app)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                if event == CountdownEvent::Expired {
                    println!("\nTime is up. The exam was submitted automatically.");
                    submit(app, true)?;
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else {
                    println!("Input closed. The exam is still running; resume with `quizforge exam run`.");
                    break;
                };
                let outcome = match parse_line(line.trim()) {
                    Some(Ok(Command::Show)) => print_current(app),
                    Some(Ok(Command::Step(s))) => step(app, s),
                    Some(Ok(Command::Submit)) => {
                        submit(app, false)?;
                        break;
                    }
                    Some(Ok(Command::Quit)) => {
                        println!("The exam is still running; resume with `quizforge exam run`.");
                        break;
                    }
                    Some(Ok(Command::Help)) => {
                        println!("{RUN_HELP}");
                        Ok(())
                    }
                    Some(Err(e)) => Err(e),
                    None => Err(anyhow::anyhow!("unknown command '{}', type `help`", line.trim())),
                };
                if let Err(e) = outcome {
                    eprintln!("{e:#}");
                }
                if app.state().exam_phase != ExamPhase::Running {
                    break;
                }
            }
        }
    }

    countdown.cancel();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(line: &str) -> Command {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn run_commands_parse() {
        assert!(matches!(parsed(""), Command::Show));
        assert!(matches!(parsed("n"), Command::Step(Step::Next)));
        assert!(matches!(parsed("prev"), Command::Step(Step::Prev)));
        assert!(matches!(parsed("g 3"), Command::Step(Step::Goto(3))));
        assert!(matches!(parsed("s b"), Command::Step(Step::Select(c)) if c == "b"));
        assert!(matches!(
            parsed("answer two words"),
            Command::Step(Step::Answer(t)) if t == "two words"
        ));
        assert!(matches!(parsed("submit"), Command::Submit));
        assert!(matches!(parsed("q"), Command::Quit));
        assert!(parse_line("g x").unwrap().is_err());
        assert!(parse_line("dance").is_none());
    }
}
