//! mcqbench-providers: model backend integrations.
//!
//! Implements the `ModelClient` trait for a local OpenAI-compatible server,
//! Anthropic and Gemini, plus the configuration file that selects between them.

pub mod anthropic;
pub mod config;
pub mod gemini;
mod http;
pub mod local;
pub mod mock;

pub use config::{
    create_client, load_config, load_config_from, BackendConfig, BackendKind, BenchConfig,
    GenerationParams,
};
pub use mcqbench_core::ProviderError;
