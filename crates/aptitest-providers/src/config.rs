//! Configuration loading and provider factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use aptitest_core::client::GenerationConfig;
use aptitest_core::service::ServiceConfig;
use aptitest_core::traits::TextGenerator;

use crate::gemini::GeminiProvider;
use crate::mock::MockGenerator;
use crate::openai::OpenAiProvider;

/// Configuration for a single text-generation provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gemini {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    OpenAI {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    /// Offline generator that always answers with `response`.
    Mock {
        #[serde(default = "default_mock_response")]
        response: String,
        #[serde(default)]
        delay_ms: Option<u64>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Gemini {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Mock { response, delay_ms } => f
                .debug_struct("Mock")
                .field("response_len", &response.len())
                .field("delay_ms", delay_ms)
                .finish(),
        }
    }
}

fn default_mock_response() -> String {
    "[]".to_string()
}

/// Top-level aptitest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AptitestConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Provider used when none is given on the command line.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    /// System instruction sent with every generation request.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Attempt budget per generation request.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Backoff unit in milliseconds; retry `n` waits `unit * 2^n`.
    #[serde(default = "default_backoff_unit")]
    pub backoff_unit_ms: u64,
    /// Output token limit for question generation.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Valid questions each AI batch must yield.
    #[serde(default = "default_required_ai_questions")]
    pub required_ai_questions: usize,
    /// Max concurrent generation requests.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Directory holding `<topic>_questions.json` bank files.
    #[serde(default = "default_bank_dir")]
    pub bank_dir: PathBuf,
    /// Directory where assessment results are written.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_retries() -> u32 {
    3
}
fn default_backoff_unit() -> u64 {
    1000
}
fn default_max_output_tokens() -> u32 {
    2000
}
fn default_required_ai_questions() -> usize {
    3
}
fn default_parallelism() -> usize {
    4
}
fn default_bank_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("./aptitest-results")
}

impl Default for AptitestConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            system_prompt: None,
            max_retries: default_retries(),
            backoff_unit_ms: default_backoff_unit(),
            max_output_tokens: default_max_output_tokens(),
            required_ai_questions: default_required_ai_questions(),
            parallelism: default_parallelism(),
            bank_dir: default_bank_dir(),
            results_dir: default_results_dir(),
        }
    }
}

impl AptitestConfig {
    /// Client settings derived from this configuration.
    pub fn generation_config(&self, model: Option<&str>) -> GenerationConfig {
        GenerationConfig {
            model: model.unwrap_or(&self.default_model).to_string(),
            temperature: self.default_temperature,
            backoff_unit: Duration::from_millis(self.backoff_unit_ms),
            system_prompt: self.system_prompt.clone(),
        }
    }

    /// Service settings derived from this configuration.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            required_ai_questions: self.required_ai_questions,
            ai_max_output_tokens: self.max_output_tokens,
            max_retries: self.max_retries,
            parallelism: self.parallelism.max(1),
        }
    }

    /// Look up a provider by name and build it.
    pub fn provider(&self, name: &str) -> Result<Arc<dyn TextGenerator>> {
        let config = self.providers.get(name).with_context(|| {
            let mut known: Vec<&str> = self.providers.keys().map(String::as_str).collect();
            known.sort_unstable();
            format!(
                "provider '{name}' is not configured (known: {})",
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            )
        })?;
        Ok(create_provider(config))
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Unset variables resolve to the empty string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::Gemini { api_key, base_url } => ProviderConfig::Gemini {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        ProviderConfig::Mock { .. } => config.clone(),
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `aptitest.toml` in the current directory
/// 2. `~/.config/aptitest/config.toml`
///
/// Environment variable overrides: `APTITEST_GEMINI_KEY` (or `GEMINI_API_KEY`)
/// and `APTITEST_OPENAI_KEY`.
pub fn load_config() -> Result<AptitestConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AptitestConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("aptitest.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => AptitestConfig::default(),
    };

    Ok(apply_env(config))
}

/// Parse a TOML document into a config without touching the environment.
pub fn parse_config(content: &str) -> Result<AptitestConfig> {
    Ok(toml::from_str::<AptitestConfig>(content)?)
}

fn env_key(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

fn apply_env(mut config: AptitestConfig) -> AptitestConfig {
    if let Some(key) = env_key(&["APTITEST_GEMINI_KEY", "GEMINI_API_KEY"]) {
        let entry = config
            .providers
            .entry("gemini".into())
            .or_insert(ProviderConfig::Gemini {
                api_key: String::new(),
                base_url: None,
            });
        if let ProviderConfig::Gemini { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Some(key) = env_key(&["APTITEST_OPENAI_KEY"]) {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    config
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("aptitest"))
}

/// Create a provider instance from its configuration.
///
/// An empty API key still yields a provider; it reports
/// `ProviderError::NotConfigured` on first use.
pub fn create_provider(config: &ProviderConfig) -> Arc<dyn TextGenerator> {
    match config {
        ProviderConfig::Gemini { api_key, base_url } => {
            Arc::new(GeminiProvider::new(api_key, base_url.clone()))
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Arc::new(OpenAiProvider::new(
            api_key,
            base_url.clone(),
            org_id.clone(),
        )),
        ProviderConfig::Mock { response, delay_ms } => {
            let mock = MockGenerator::with_fixed_response(response);
            match delay_ms {
                Some(ms) => Arc::new(mock.with_delay(Duration::from_millis(*ms))),
                None => Arc::new(mock),
            }
        }
    }
}
