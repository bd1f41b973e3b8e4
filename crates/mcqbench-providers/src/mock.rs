//! Mock backend for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use mcqbench_core::{ModelClient, ProviderError};

/// A scripted model client for exercising the evaluator without a server.
///
/// Queued failures are returned first, one per call. After that the reply is
/// the first `(needle, reply)` pair whose needle occurs in the prompt, or the
/// default reply.
pub struct MockClient {
    model: String,
    /// Prompt substring → reply, checked in order.
    responses: Vec<(String, String)>,
    default_response: String,
    failures: Mutex<VecDeque<ProviderError>>,
    call_count: AtomicU32,
    last_prompt: Mutex<Option<String>>,
}

impl MockClient {
    pub fn new(responses: Vec<(String, String)>) -> Self {
        Self {
            model: "mock-model".to_string(),
            responses,
            default_response: "1".to_string(),
            failures: Mutex::new(VecDeque::new()),
            call_count: AtomicU32::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Create a mock that always replies the same way.
    pub fn with_fixed_response(response: &str) -> Self {
        let mut mock = Self::new(Vec::new());
        mock.default_response = response.to_string();
        mock
    }

    /// Queue errors to return before any reply.
    pub fn failing_first(self, errors: impl IntoIterator<Item = ProviderError>) -> Self {
        self.failures.lock().unwrap().extend(errors);
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());

        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        Ok(self
            .responses
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default_response.clone()))
    }
}
