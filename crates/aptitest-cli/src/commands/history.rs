//! The `aptitest history` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::{build_service, load_config};

pub async fn execute(user: String, json: bool, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let service = build_service(&config, None, None)?;
    let results = service.history(&user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results for user '{user}'.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Topic", "Score", "Level", "Answered", "Minutes"]);
    for result in &results {
        let card = &result.scorecard;
        table.add_row(vec![
            Cell::new(result.created_at.format("%Y-%m-%d %H:%M")),
            Cell::new(&result.topic),
            Cell::new(format!("{}%", card.score_percent)),
            Cell::new(card.performance_level),
            Cell::new(format!(
                "{}/{}",
                card.completion_metrics.questions_answered, card.total_questions
            )),
            Cell::new(card.completion_metrics.time_taken_minutes),
        ]);
    }
    println!("{table}");
    println!("{} result(s)", results.len());

    Ok(())
}
