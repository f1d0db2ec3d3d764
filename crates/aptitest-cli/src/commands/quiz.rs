//! The `aptitest quiz` command.

use std::path::PathBuf;

use anyhow::Result;

use super::{build_service, load_config, write_json, QuizFile};

pub async fn execute(
    topic: String,
    count: usize,
    include_ai: bool,
    provider: Option<String>,
    model: Option<String>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let provider = include_ai.then(|| provider.unwrap_or_else(|| config.default_provider.clone()));
    let service = build_service(&config, provider.as_deref(), model.as_deref())?;

    let questions = service.build_test(&topic, count, include_ai).await?;
    anyhow::ensure!(
        !questions.is_empty(),
        "no questions available for topic '{topic}' in {}",
        config.bank_dir.display()
    );

    eprintln!("Assembled {} question(s) for '{topic}'", questions.len());
    write_json(&QuizFile { topic, questions }, output.as_ref())
}
