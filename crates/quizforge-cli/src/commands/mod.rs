//! Subcommand implementations and the shared application handle.

pub mod analyze;
pub mod coach;
pub mod drill;
pub mod exam;
pub mod generate;
pub mod init;
pub mod models;
pub mod practice;
pub mod presets;
pub mod quiz;
pub mod report;
pub mod review;
pub mod transfer;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use quizforge_core::clock::{Clock, SystemClock};
use quizforge_core::model::{Question, Quiz, Timestamp};
use quizforge_core::storage::FileBackend;
use quizforge_core::store::{Action, AppState, Store};
use quizforge_providers::{load_config_from, QuizforgeConfig};

/// Loaded configuration plus the persisted store.
pub struct App {
    pub config: QuizforgeConfig,
    pub store: Store<FileBackend>,
    pub clock: Arc<dyn Clock>,
}

impl App {
    pub fn open(state_path: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self> {
        let config = load_config_from(config_path.as_deref())?;
        let path = state_path.unwrap_or_else(|| config.state_path.clone());
        debug!(path = %path.display(), "opening state");
        Ok(Self {
            config,
            store: Store::open(FileBackend::new(path)),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn state(&self) -> &AppState {
        self.store.state()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now_ms()
    }

    pub fn dispatch(&mut self, action: Action) -> Result<&AppState> {
        let name = action.name();
        self.store
            .dispatch(action)
            .with_context(|| format!("{} failed", name.replace('_', " ")))
    }

    /// The quiz named by `id` (full id or unique prefix), else the active quiz.
    pub fn quiz(&self, id: Option<&str>) -> Result<&Quiz> {
        let state = self.state();
        match id {
            Some(id) => {
                if let Some(quiz) = state.quiz(id) {
                    return Ok(quiz);
                }
                let matches: Vec<&Quiz> = state
                    .quizzes
                    .iter()
                    .filter(|q| q.id.starts_with(id))
                    .collect();
                match matches.as_slice() {
                    [quiz] => Ok(quiz),
                    [] => bail!("quiz not found: {id}"),
                    _ => bail!("quiz id prefix '{id}' is ambiguous"),
                }
            }
            None => state.active_quiz().context(
                "no active quiz; pass --quiz or import one with `quizforge quiz import-csv`",
            ),
        }
    }
}

/// Seeded RNG when a seed is given, entropy otherwise.
pub fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Resolve a choice given as a 1-based number, a letter, or a choice id.
pub fn resolve_choice(question: &Question, token: &str) -> Result<String> {
    let token = token.trim();
    if question.has_choice(token) {
        return Ok(token.to_string());
    }
    let index = if let Ok(n) = token.parse::<usize>() {
        n.checked_sub(1)
    } else {
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => {
                Some((c.to_ascii_lowercase() as u8 - b'a') as usize)
            }
            _ => None,
        }
    };
    index
        .and_then(|i| question.choices.get(i))
        .map(|c| c.id.clone())
        .with_context(|| format!("no choice '{token}' on this question"))
}

/// Display label of the choice at `index`: `a`..`z`, then its 1-based number.
/// Every label is accepted back by [`resolve_choice`].
pub fn choice_label(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => char::from(b'a' + i).to_string(),
        _ => (index + 1).to_string(),
    }
}

/// Trim `text` to at most `max` characters.
pub fn truncate(text: &str, max: usize) -> String {
    let text = text.replace('\n', " ");
    if text.chars().count() <= max {
        text
    } else {
        let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}

/// Write `content` to `output`, or print it when no path is given.
pub fn write_or_print(output: Option<PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(&path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}

/// `YYYY-MM-DD HH:MM` in UTC.
pub fn format_timestamp(ms: Timestamp) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}
