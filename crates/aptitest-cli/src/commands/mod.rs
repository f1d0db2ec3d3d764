//! Subcommand implementations and the wiring they share.

pub mod generate;
pub mod history;
pub mod init;
pub mod list_models;
pub mod quiz;
pub mod submit;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use aptitest_core::bank::FileQuestionBank;
use aptitest_core::client::GenerationClient;
use aptitest_core::model::Question;
use aptitest_core::service::AssessmentService;
use aptitest_core::store::JsonFileStore;
use aptitest_providers::config::{load_config_from, AptitestConfig};

/// A test as written by `quiz` and read back by `submit`.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuizFile {
    pub topic: String,
    pub questions: Vec<Question>,
}

pub(crate) fn load_config(path: Option<&Path>) -> Result<AptitestConfig> {
    load_config_from(path)
}

/// Build the service from config. The generator is attached only when
/// `provider` is `Some`.
pub(crate) fn build_service(
    config: &AptitestConfig,
    provider: Option<&str>,
    model: Option<&str>,
) -> Result<AssessmentService> {
    let service = AssessmentService::new(
        Arc::new(FileQuestionBank::new(config.bank_dir.clone())),
        Arc::new(JsonFileStore::new(config.results_dir.clone())),
        config.service_config(),
    );

    let Some(name) = provider else {
        return Ok(service);
    };

    let generator = config.provider(name)?;
    tracing::debug!("using provider '{}'", generator.name());
    Ok(service.with_generator(GenerationClient::new(
        generator,
        config.generation_config(model),
    )))
}

/// Write pretty JSON to `output`, or to stdout when no path is given.
pub(crate) fn write_json<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Saved to: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}
