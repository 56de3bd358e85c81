//! The `quizforge coach` command.

use anyhow::{Context, Result};

use quizforge_core::analytics::analyze_performance;
use quizforge_core::assistant::{coach_message, Assistant, AssistantMode};
use quizforge_providers::config::provider_for;

use super::App;

pub async fn execute(
    app: &App,
    quiz: Option<String>,
    message: Option<String>,
    provider: Option<String>,
) -> Result<()> {
    let message = match message {
        Some(message) => message,
        None => {
            let quiz = app.quiz(quiz.as_deref())?;
            let analysis = analyze_performance(quiz, &app.state().attempts_for_quiz(&quiz.id));
            coach_message(&analysis)
        }
    };

    let provider = provider_for(&app.config, provider.as_deref())?;
    let mut assistant = Assistant::new(AssistantMode::Study)
        .with_model(app.config.default_model.clone())
        .with_temperature(app.config.default_temperature)
        .with_max_tokens(app.config.max_tokens);

    println!("> {message}\n");
    let reply = assistant
        .send(provider.as_ref(), &message)
        .await
        .with_context(|| format!("{} request failed", provider.name()))?
        .context("nothing to send; pass --message")?;
    println!("{}", reply.content);
    Ok(())
}
