//! quizforge-providers: text-generation provider integrations.
//!
//! Implements the `LlmProvider` trait for OpenAI-compatible chat completion
//! endpoints and a scripted mock, plus the configuration that selects them.

pub mod config;
pub mod mock;
pub mod openai;

pub use config::{
    create_provider, load_config, load_config_from, provider_for, ProviderConfig, QuizforgeConfig,
};
pub use quizforge_core::error::ProviderError;
