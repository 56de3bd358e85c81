//! The `quizforge models` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizforge_providers::create_provider;

use super::App;

pub fn execute(app: &App, provider: Option<String>) -> Result<()> {
    let mut names: Vec<&String> = app
        .config
        .providers
        .keys()
        .filter(|name| provider.as_deref().is_none_or(|p| p == name.as_str()))
        .collect();
    names.sort();

    if names.is_empty() {
        match provider {
            Some(name) => anyhow::bail!("provider '{name}' is not configured"),
            None => {
                println!("No providers configured. Run `quizforge init` to create a config file.");
                return Ok(());
            }
        }
    }

    let mut table = Table::new();
    table.set_header(vec!["Provider", "Model", "Name", "Context"]);
    for name in names {
        let provider = create_provider(name, &app.config.providers[name])?;
        for model in provider.available_models() {
            let marker = if *name == app.config.default_provider
                && model.id == app.config.default_model
            {
                " (default)"
            } else {
                ""
            };
            table.add_row(vec![
                Cell::new(name),
                Cell::new(format!("{}{marker}", model.id)),
                Cell::new(&model.name),
                Cell::new(format!("{}K", model.max_context / 1000)),
            ]);
        }
    }

    println!("{table}");
    Ok(())
}
