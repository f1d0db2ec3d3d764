//! aptitest-core: question generation pipeline and scoring engine.
//!
//! This crate defines the data model, the collaborator traits, the resilient
//! generation client, JSON recovery and validation for generated items, and
//! the deterministic scoring engine that the rest of aptitest builds on.

pub mod bank;
pub mod client;
pub mod error;
pub mod extract;
pub mod model;
pub mod scoring;
pub mod service;
pub mod shuffle;
pub mod store;
pub mod traits;
pub mod validate;

pub use error::{PipelineError, ProviderError};
