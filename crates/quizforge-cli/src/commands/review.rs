//! The `quizforge review` commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Table};

use quizforge_core::model::DAY_MS;
use quizforge_core::scheduler::{due_cards, why_now, Grade};
use quizforge_core::store::Action;

use super::{format_timestamp, truncate, App};

#[derive(Subcommand)]
pub enum ReviewCommand {
    /// Create review cards for every question of a quiz
    Seed {
        #[arg(long)]
        quiz: Option<String>,
    },

    /// List cards that are due now
    Due {
        #[arg(long)]
        quiz: Option<String>,

        /// Show at most this many cards
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Grade a card: again, hard, good, easy (or 1-4)
    Grade {
        /// Question id
        question: String,

        grade: String,
    },
}

pub fn execute(app: &mut App, command: ReviewCommand) -> Result<()> {
    match command {
        ReviewCommand::Seed { quiz } => {
            let quiz = app.quiz(quiz.as_deref())?;
            let (quiz_id, title) = (quiz.id.clone(), quiz.title.clone());
            let before = app.state().review_cards.len();
            let now = app.now();
            let after = app
                .dispatch(Action::SeedReviewCards { quiz_id, now })?
                .review_cards
                .len();
            println!("Seeded {} new review cards for '{title}'", after - before);
            Ok(())
        }
        ReviewCommand::Due { quiz, limit } => {
            let quiz = app.quiz(quiz.as_deref())?;
            let now = app.now();
            let cards = due_cards(
                app.state()
                    .review_cards
                    .values()
                    .filter(|c| quiz.question(&c.question_id).is_some()),
                now,
            );
            if cards.is_empty() {
                println!("Nothing due. Come back later.");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_header(vec!["Question ID", "Prompt", "Due", "Why now"]);
            for card in cards.iter().take(limit) {
                let prompt = quiz
                    .question(&card.question_id)
                    .map(|q| truncate(&q.prompt, 50))
                    .unwrap_or_default();
                table.add_row(vec![
                    Cell::new(&card.question_id),
                    Cell::new(prompt),
                    Cell::new(format_timestamp(card.due_at)),
                    Cell::new(why_now(card, now)),
                ]);
            }
            println!("{table}");
            println!("{} card(s) due", cards.len());
            Ok(())
        }
        ReviewCommand::Grade { question, grade } => {
            let grade: Grade = grade.parse()?;
            let now = app.now();
            let card = app
                .dispatch(Action::GradeReview {
                    question_id: question.clone(),
                    grade,
                    now,
                })?
                .review_cards
                .get(&question)
                .cloned()
                .context("review card missing after grading")?;
            let days = (card.due_at - now) as f64 / DAY_MS as f64;
            println!(
                "Graded {grade}. Next review in {days:.1} days ({}), stability {:.2}, difficulty {:.2}",
                format_timestamp(card.due_at),
                card.stability,
                card.difficulty
            );
            Ok(())
        }
    }
}
