//! The `quizforge drill` command.

use anyhow::Result;

use quizforge_core::analytics::{analyze_performance, build_micro_drill};
use quizforge_core::store::Action;

use super::{rng, App};

pub fn execute(
    app: &mut App,
    quiz: Option<String>,
    size: usize,
    seed: Option<u64>,
    clear: bool,
) -> Result<()> {
    if clear {
        app.dispatch(Action::ClearMicroDrill)?;
        println!("Micro-drill cleared.");
        return Ok(());
    }

    let quiz = app.quiz(quiz.as_deref())?;
    let analysis = analyze_performance(quiz, &app.state().attempts_for_quiz(&quiz.id));
    let questions = build_micro_drill(quiz, &analysis.top_weaknesses, size, &mut rng(seed));
    if questions.is_empty() {
        println!("No weak tags yet. Take an exam first, then build a drill.");
        return Ok(());
    }

    let tags: Vec<&str> = analysis
        .top_weaknesses
        .iter()
        .map(|w| w.tag.as_str())
        .collect();
    println!(
        "Micro-drill of {} questions targeting {}:",
        questions.len(),
        tags.join(", ")
    );
    for (i, question) in questions.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, question.prompt, question.id);
    }

    let action = Action::CreateMicroDrill {
        quiz_id: quiz.id.clone(),
        question_ids: questions.iter().map(|q| q.id.clone()).collect(),
    };
    app.dispatch(action)?;
    Ok(())
}
