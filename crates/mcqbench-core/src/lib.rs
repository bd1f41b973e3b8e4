//! mcqbench-core: data model, evaluation loop, and scoring.
//!
//! This crate defines the question/answer data model, the `ModelClient`
//! trait every backend implements, and the sequential evaluation loop with
//! its retry policy and accuracy accounting.

pub mod answer;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod model;
pub mod prompt;
pub mod report;
pub mod retry;
pub mod statistics;
pub mod traits;

pub use error::{DatasetError, ProviderError};
pub use traits::ModelClient;
