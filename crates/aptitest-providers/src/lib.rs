//! aptitest-providers: text-generation backends.
//!
//! Implements the core `TextGenerator` trait for Gemini and OpenAI-compatible
//! APIs, plus an offline mock, and loads the `aptitest.toml` configuration
//! that wires them up.

pub mod config;
pub mod gemini;
mod http;
pub mod mock;
pub mod openai;

pub use aptitest_core::error::ProviderError;
pub use config::{create_provider, load_config, load_config_from, AptitestConfig, ProviderConfig};
