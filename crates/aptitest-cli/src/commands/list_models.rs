//! The `aptitest list-models` command.

use std::path::PathBuf;

use anyhow::Result;

use aptitest_providers::create_provider;

use super::load_config;

pub fn execute(provider_filter: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref())?;

    let mut names: Vec<&String> = config.providers.keys().collect();
    names.sort();

    let mut found_any = false;

    for name in names {
        if provider_filter.as_ref().is_some_and(|filter| filter != name) {
            continue;
        }

        let provider = create_provider(&config.providers[name]);
        let models = provider.available_models();

        if !models.is_empty() {
            found_any = true;
            let marker = if *name == config.default_provider {
                " (default)"
            } else {
                ""
            };
            println!("Provider: {name}{marker}");
            for model in &models {
                println!(
                    "  {} ({}, up to {} output tokens)",
                    model.id, model.name, model.max_output_tokens
                );
            }
            println!();
        }
    }

    if !found_any {
        println!("No providers configured. Run `aptitest init` to create a config file.");
    }

    Ok(())
}
