//! The `quizforge export` and `quizforge import` commands.

use std::path::PathBuf;

use anyhow::{Context, Result};

use quizforge_core::store::Action;
use quizforge_core::transfer::{backup_file_name, parse_bundle};

use super::App;

pub fn export(app: &App, output: Option<PathBuf>) -> Result<()> {
    let bundle = app.state().export_bundle();
    let json = bundle.to_json()?;
    let path = output
        .unwrap_or_else(|| PathBuf::from(backup_file_name(chrono::Local::now().date_naive())));
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    println!(
        "Exported {} quizzes, {} exam attempts and {} practice sessions to {}",
        bundle.quizzes.len(),
        bundle.exam_attempts.len(),
        bundle.practice_attempts.len(),
        path.display()
    );
    Ok(())
}

pub fn import(app: &mut App, file: PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let bundle = parse_bundle(&text)?;
    let summary = format!(
        "Imported {} quizzes, {} presets, {} exam attempts and {} practice sessions",
        bundle.quizzes.len(),
        bundle.exam_presets.len(),
        bundle.exam_attempts.len(),
        bundle.practice_attempts.len()
    );
    app.dispatch(Action::Import(bundle))?;
    println!("{summary}");
    Ok(())
}
