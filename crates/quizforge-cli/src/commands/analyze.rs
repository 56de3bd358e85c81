//! The `quizforge analyze` command.

use std::collections::BTreeMap;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizforge_core::analytics::{analyze_performance, history_summary, PerformanceData};
use quizforge_core::exam::human_time;

use super::App;

pub fn execute(app: &App, quiz: Option<String>, json: bool) -> Result<()> {
    let quiz = app.quiz(quiz.as_deref())?;
    let attempts = app.state().attempts_for_quiz(&quiz.id);
    let analysis = analyze_performance(quiz, &attempts);

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    let history = history_summary(&attempts);
    println!("{} ({} attempts)", quiz.title, history.attempts);
    if let Some(avg) = history.average_score {
        println!(
            "Average exam score {:.0}%, best {}%, last {}%",
            avg,
            history.best_score.unwrap_or(0),
            history.last_score.unwrap_or(0)
        );
    }
    if history.questions_answered == 0 {
        println!("No answers recorded yet. Take an exam or practice first.");
        return Ok(());
    }
    println!(
        "{} answers, {:.0}% accuracy",
        history.questions_answered,
        history.accuracy * 100.0
    );

    println!("\n{}", performance_table("Tag", &analysis.by_tag));
    println!("{}", performance_table("Difficulty", &analysis.by_difficulty));

    if !analysis.top_weaknesses.is_empty() {
        println!("\nWeaknesses:");
        for w in &analysis.top_weaknesses {
            println!(
                "  {} {:.0}% errors, avg {}. {}",
                w.tag,
                w.err_rate * 100.0,
                human_time(w.avg_time_ms as u64),
                w.note
            );
        }
    }
    if !analysis.top_strengths.is_empty() {
        println!("\nStrengths:");
        for s in &analysis.top_strengths {
            println!("  {} {:.0}% accuracy", s.tag, s.acc_rate * 100.0);
        }
    }
    Ok(())
}

fn performance_table(label: &str, rows: &BTreeMap<String, PerformanceData>) -> Table {
    let mut table = Table::new();
    table.set_header(vec![label, "Seen", "Correct", "Accuracy", "Avg time"]);
    for (key, perf) in rows {
        table.add_row(vec![
            Cell::new(key),
            Cell::new(perf.seen),
            Cell::new(perf.correct),
            Cell::new(format!("{:.0}%", perf.accuracy() * 100.0)),
            Cell::new(human_time(perf.avg_time_ms() as u64)),
        ]);
    }
    table
}
