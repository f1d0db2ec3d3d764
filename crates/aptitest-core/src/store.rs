//! Assessment result persistence.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::model::AssessmentResult;
use crate::traits::ResultStore;

/// Stores each result as `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ResultStore for JsonFileStore {
    async fn save(&self, result: &AssessmentResult) -> Result<()> {
        let json = serde_json::to_string_pretty(result).context("failed to serialize result")?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.dir.join(format!("{}.json", result.id));
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write result to {}", path.display()))?;
        Ok(())
    }

    async fn query_by_user(&self, user_id: &str) -> Result<Vec<AssessmentResult>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("failed to read directory: {}", self.dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            match serde_json::from_str::<AssessmentResult>(&content) {
                Ok(result) if result.user_id == user_id => results.push(result),
                Ok(_) => {}
                Err(e) => tracing::warn!("skipping {}: {e}", path.display()),
            }
        }

        Ok(results)
    }
}

/// Keeps results in memory. Useful for tests and short-lived hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    results: Mutex<Vec<AssessmentResult>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn save(&self, result: &AssessmentResult) -> Result<()> {
        self.results
            .lock()
            .map_err(|_| anyhow::anyhow!("result store lock poisoned"))?
            .push(result.clone());
        Ok(())
    }

    async fn query_by_user(&self, user_id: &str) -> Result<Vec<AssessmentResult>> {
        let results = self
            .results
            .lock()
            .map_err(|_| anyhow::anyhow!("result store lock poisoned"))?;
        Ok(results
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// Order results newest first.
pub fn sort_newest_first(results: &mut [AssessmentResult]) {
    results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
