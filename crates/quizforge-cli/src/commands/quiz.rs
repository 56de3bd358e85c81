//! The `quizforge quiz` commands.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Table};
use tracing::info;

use quizforge_core::model::{new_id, SourceRef};
use quizforge_core::store::Action;
use quizforge_core::transfer::{export_csv, export_quiz_json, import_csv, import_quiz_json};
use quizforge_core::trust::{current_year, question_trust};

use super::{choice_label, truncate, write_or_print, App};

#[derive(Subcommand)]
pub enum QuizCommand {
    /// List quizzes
    List,

    /// Show the questions of a quiz
    Show {
        #[arg(long)]
        quiz: Option<String>,

        /// Also print answers and explanations
        #[arg(long)]
        answers: bool,
    },

    /// Make a quiz the active one
    Use {
        quiz: String,
    },

    /// Import `prompt;answer;tags` rows as a new quiz
    ImportCsv {
        file: PathBuf,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        topic: Option<String>,
    },

    /// Export a quiz as `prompt;answer;tags` rows
    ExportCsv {
        #[arg(long)]
        quiz: Option<String>,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Export a quiz as JSON
    ExportJson {
        #[arg(long)]
        quiz: Option<String>,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Import a quiz from JSON
    ImportJson {
        file: PathBuf,
    },

    /// Attach a citation to a question
    AddSource {
        /// Question id
        question: String,

        #[arg(long)]
        quiz: Option<String>,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        snippet: Option<String>,

        #[arg(long)]
        note: Option<String>,
    },

    /// Remove a citation from a question
    RemoveSource {
        /// Question id
        question: String,

        /// 1-based position of the citation
        index: usize,

        #[arg(long)]
        quiz: Option<String>,
    },

    /// Show trust scores derived from citations
    Trust {
        #[arg(long)]
        quiz: Option<String>,
    },

    /// Delete a quiz
    Remove {
        quiz: String,
    },
}

pub fn execute(app: &mut App, command: QuizCommand) -> Result<()> {
    match command {
        QuizCommand::List => list(app),
        QuizCommand::Show { quiz, answers } => show(app, quiz.as_deref(), answers),
        QuizCommand::Use { quiz } => {
            let quiz = app.quiz(Some(&quiz))?;
            let (id, title) = (quiz.id.clone(), quiz.title.clone());
            app.dispatch(Action::SetActiveQuiz { quiz_id: Some(id) })?;
            println!("Active quiz: {title}");
            Ok(())
        }
        QuizCommand::ImportCsv { file, title, topic } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let mut quiz = import_csv(&text, chrono::Local::now().date_naive());
            if quiz.questions.is_empty() {
                bail!("{} contains no questions", file.display());
            }
            if let Some(title) = title {
                quiz.title = title;
            }
            if let Some(topic) = topic {
                quiz.topic = topic;
            }
            info!(file = %file.display(), questions = quiz.questions.len(), "importing CSV");
            println!(
                "Imported {} questions as '{}' ({})",
                quiz.questions.len(),
                quiz.title,
                quiz.id
            );
            app.dispatch(Action::AddQuiz(quiz))?;
            Ok(())
        }
        QuizCommand::ExportCsv { quiz, output } => {
            let csv = export_csv(app.quiz(quiz.as_deref())?);
            write_or_print(output, &csv)
        }
        QuizCommand::ExportJson { quiz, output } => {
            let json = export_quiz_json(app.quiz(quiz.as_deref())?)?;
            write_or_print(output, &json)
        }
        QuizCommand::ImportJson { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let mut quiz = import_quiz_json(&text)?;
            if app.state().quiz(&quiz.id).is_some() {
                quiz.id = new_id();
            }
            println!(
                "Imported '{}' with {} questions ({})",
                quiz.title,
                quiz.questions.len(),
                quiz.id
            );
            app.dispatch(Action::AddQuiz(quiz))?;
            Ok(())
        }
        QuizCommand::AddSource {
            question,
            quiz,
            url,
            snippet,
            note,
        } => {
            if url.is_none() && snippet.is_none() && note.is_none() {
                bail!("a source needs at least one of --url, --snippet or --note");
            }
            let quiz_id = question_quiz(app, quiz.as_deref(), &question)?;
            app.dispatch(Action::AddSourceRef {
                quiz_id: quiz_id.clone(),
                question_id: question.clone(),
                source: SourceRef { url, snippet, note },
            })?;
            print_trust(app, &quiz_id, &question)
        }
        QuizCommand::RemoveSource {
            question,
            index,
            quiz,
        } => {
            let quiz_id = question_quiz(app, quiz.as_deref(), &question)?;
            let Some(index) = index.checked_sub(1) else {
                bail!("source positions start at 1");
            };
            app.dispatch(Action::RemoveSourceRef {
                quiz_id: quiz_id.clone(),
                question_id: question.clone(),
                index,
            })?;
            print_trust(app, &quiz_id, &question)
        }
        QuizCommand::Trust { quiz } => trust(app, quiz.as_deref()),
        QuizCommand::Remove { quiz } => {
            let quiz = app.quiz(Some(&quiz))?;
            let (id, title) = (quiz.id.clone(), quiz.title.clone());
            app.dispatch(Action::RemoveQuiz { quiz_id: id })?;
            println!("Removed quiz '{title}'");
            Ok(())
        }
    }
}

fn list(app: &App) -> Result<()> {
    let state = app.state();
    if state.quizzes.is_empty() {
        println!("No quizzes yet. Import one with `quizforge quiz import-csv <file>`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["", "ID", "Title", "Topic", "Questions"]);
    for quiz in &state.quizzes {
        let active = state.active_quiz_id.as_deref() == Some(quiz.id.as_str());
        table.add_row(vec![
            Cell::new(if active { "*" } else { "" }),
            Cell::new(&quiz.id),
            Cell::new(&quiz.title),
            Cell::new(&quiz.topic),
            Cell::new(quiz.questions.len()),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn show(app: &App, quiz: Option<&str>, answers: bool) -> Result<()> {
    let quiz = app.quiz(quiz)?;
    println!("{} ({})", quiz.title, quiz.id);
    if !quiz.topic.is_empty() {
        println!("Topic: {}", quiz.topic);
    }
    println!();

    for (i, question) in quiz.questions.iter().enumerate() {
        let difficulty = question
            .difficulty
            .map(|d| format!(", {d}"))
            .unwrap_or_default();
        println!(
            "{}. [{}{}] {}",
            i + 1,
            question.kind,
            difficulty,
            question.prompt
        );
        println!("   id: {}", question.id);
        for (j, choice) in question.choices.iter().enumerate() {
            let mark = if answers && choice.correct { "*" } else { " " };
            println!("   {mark} {}) {}", choice_label(j), choice.text);
        }
        if !question.tags.is_empty() {
            println!("   tags: {}", question.tags.join(", "));
        }
        if answers {
            println!("   answer: {}", question.answer_summary());
            if let Some(explanation) = question.explanation.as_deref().filter(|e| !e.is_empty()) {
                println!("   why: {explanation}");
            }
        }
    }
    Ok(())
}

fn trust(app: &App, quiz: Option<&str>) -> Result<()> {
    let quiz = app.quiz(quiz)?;
    let year = current_year();

    let mut table = Table::new();
    table.set_header(vec!["Question", "Sources", "Cited", "Multi", "Recent", "Trust"]);
    for question in &quiz.questions {
        let (factors, score) = question_trust(quiz, &question.id, year);
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        table.add_row(vec![
            Cell::new(truncate(&question.prompt, 50)),
            Cell::new(quiz.sources_for(&question.id).len()),
            Cell::new(yes_no(factors.has_citation)),
            Cell::new(yes_no(factors.multi_sources)),
            Cell::new(yes_no(factors.recency_ok)),
            Cell::new(format!("{score}%")),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Id of the quiz holding `question_id`: the named or active quiz, or failing
/// that any quiz that has the question.
fn question_quiz(app: &App, quiz: Option<&str>, question_id: &str) -> Result<String> {
    if let Ok(quiz) = app.quiz(quiz) {
        if quiz.question(question_id).is_some() {
            return Ok(quiz.id.clone());
        }
    }
    app.state()
        .quizzes
        .iter()
        .find(|q| q.question(question_id).is_some())
        .map(|q| q.id.clone())
        .with_context(|| format!("question not found: {question_id}"))
}

fn print_trust(app: &App, quiz_id: &str, question_id: &str) -> Result<()> {
    let quiz = app.quiz(Some(quiz_id))?;
    let (_, score) = question_trust(quiz, question_id, current_year());
    println!(
        "{} source(s), trust {score}%",
        quiz.sources_for(question_id).len()
    );
    Ok(())
}
