//! The `aptitest generate` command.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;

use aptitest_core::model::Question;

use super::{build_service, load_config, write_json};

pub async fn execute(
    topics: Vec<String>,
    provider: Option<String>,
    model: Option<String>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let topics: Vec<String> = topics
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    anyhow::ensure!(!topics.is_empty(), "at least one topic is required");

    let config = load_config(config_path.as_deref())?;
    let provider = provider.unwrap_or_else(|| config.default_provider.clone());
    let service = build_service(&config, Some(&provider), model.as_deref())?;

    eprintln!(
        "Generating {} question(s) each for {} topic(s) via {provider}",
        config.required_ai_questions,
        topics.len()
    );

    let mut generated: BTreeMap<String, Vec<Question>> = BTreeMap::new();
    let mut failures = 0;

    for (topic, outcome) in service.ai_questions_for_topics(&topics).await {
        match outcome {
            Ok(questions) => {
                eprintln!("  {topic}: {} question(s)", questions.len());
                generated.insert(topic, questions);
            }
            Err(e) => {
                eprintln!("  {topic}: FAILED ({e})");
                failures += 1;
            }
        }
    }

    if !generated.is_empty() {
        write_json(&generated, output.as_ref())?;
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} topic(s) failed", topics.len());
    }

    Ok(())
}
