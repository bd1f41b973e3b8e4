//! The model backend capability.
//!
//! Implemented by the `mcqbench-providers` crate for the local server and the
//! hosted backends.

use async_trait::async_trait;

use crate::error::ProviderError;

/// A language-model backend that answers one prompt per call.
///
/// Implementations send exactly one request per `complete` call and never
/// retry internally; retrying is the job of [`crate::retry::RetryPolicy`].
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Human-readable backend name (e.g. "local", "anthropic").
    fn name(&self) -> &str;

    /// Identifier of the model answering the prompts.
    fn model(&self) -> &str;

    /// Send a single user-role prompt and return the reply text.
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}
