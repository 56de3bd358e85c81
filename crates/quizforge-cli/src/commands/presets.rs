//! The `quizforge presets` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::App;

pub fn execute(app: &App) -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Questions", "Minutes"]);

    for preset in &app.state().exam_presets {
        table.add_row(vec![
            Cell::new(&preset.id),
            Cell::new(&preset.name),
            Cell::new(preset.num_questions),
            Cell::new(preset.total_minutes),
        ]);
    }

    println!("{table}");
    Ok(())
}
