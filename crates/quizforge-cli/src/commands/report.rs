//! The `quizforge report` command.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use quizforge_core::report::ExamReport;

use super::{write_or_print, App};

pub fn execute(
    app: &App,
    attempt: Option<String>,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let state = app.state();
    let attempt = match attempt.as_deref() {
        Some(id) => state
            .exam_attempt(id)
            .with_context(|| format!("attempt not found: {id}"))?,
        None => state
            .last_exam_attempt()
            .context("no finished exams yet; run `quizforge exam start` first")?,
    };
    let quiz = app.quiz(Some(&attempt.quiz_id))?;
    let report = ExamReport::build(quiz, attempt, &state.attempts_for_quiz(&quiz.id))?;

    match format.as_str() {
        "markdown" | "md" => write_or_print(output, &report.to_markdown()),
        "json" => match output {
            Some(path) => {
                report.save_json(&path)?;
                println!("Wrote {}", path.display());
                Ok(())
            }
            None => {
                println!("{}", serde_json::to_string_pretty(&report)?);
                Ok(())
            }
        },
        "html" => {
            let path = output.unwrap_or_else(|| {
                let short: String = report.attempt_id.chars().take(8).collect();
                PathBuf::from(format!("quizforge-report-{short}.html"))
            });
            quizforge_report::write_html_report(&report, &path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        other => bail!("unknown report format '{other}' (expected md, json or html)"),
    }
}
