//! The `quizforge generate` command.

use anyhow::{bail, Context, Result};
use tracing::info;

use quizforge_core::assistant::{items_to_questions, Assistant, AssistantMode};
use quizforge_core::model::Quiz;
use quizforge_core::store::Action;
use quizforge_providers::config::provider_for;

use super::App;

pub async fn execute(
    app: &mut App,
    topic: String,
    count: usize,
    quiz: Option<String>,
    title: Option<String>,
    provider: Option<String>,
) -> Result<()> {
    let topic = topic.trim().to_string();
    if topic.is_empty() {
        bail!("--topic must not be empty");
    }
    let target = match quiz.as_deref() {
        Some(id) => Some(app.quiz(Some(id))?.clone()),
        None => None,
    };

    let provider = provider_for(&app.config, provider.as_deref())?;
    let mut assistant = Assistant::new(AssistantMode::Build)
        .with_model(app.config.default_model.clone())
        .with_temperature(app.config.default_temperature)
        .with_max_tokens(app.config.max_tokens);

    let prompt = format!("Write {count} exam questions about {topic}.");
    info!(provider = provider.name(), %topic, count, "generating questions");
    let reply = assistant
        .send(provider.as_ref(), &prompt)
        .await
        .with_context(|| format!("{} request failed", provider.name()))?
        .context("nothing was sent")?;

    let items = reply
        .items
        .filter(|items| !items.is_empty())
        .context("the reply did not contain any quiz items")?;
    let questions = items_to_questions(&items, &topic);

    match target {
        Some(mut quiz) => {
            let added = questions.len();
            quiz.questions.extend(questions);
            println!(
                "Added {added} questions to '{}' ({} total)",
                quiz.title,
                quiz.questions.len()
            );
            app.dispatch(Action::UpdateQuiz(quiz))?;
        }
        None => {
            let quiz = Quiz::new(title.unwrap_or_else(|| topic.clone()), topic, questions);
            println!(
                "Created '{}' with {} questions ({})",
                quiz.title,
                quiz.questions.len(),
                quiz.id
            );
            app.dispatch(Action::AddQuiz(quiz))?;
        }
    }
    Ok(())
}
