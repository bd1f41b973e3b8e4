//! Local OpenAI-compatible server backend (LM Studio and friends).
//!
//! The active model is resolved once per run from `GET {base}/models`; every
//! completion then goes to `POST {base}/chat/completions` with that id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mcqbench_core::{ModelClient, ProviderError};

use crate::config::GenerationParams;
use crate::http::{build_client, decode_json, retry_after_ms, send_error};

pub const DEFAULT_BASE_URL: &str = "http://localhost:1234/v1";
/// Local servers do not check credentials but expect the header.
const PLACEHOLDER_API_KEY: &str = "lm-studio";
const DEFAULT_TIMEOUT_SECS: u64 = 300; // Local models are slower

/// Client for a local OpenAI-compatible chat server.
pub struct LocalServerClient {
    base_url: String,
    model: String,
    params: GenerationParams,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

impl LocalServerClient {
    /// Create a client with no model resolved yet.
    pub fn new(base_url: &str, params: GenerationParams) -> Result<Self, ProviderError> {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };

        Ok(Self {
            base_url: base.trim_end_matches('/').to_string(),
            model: String::new(),
            params,
            client: build_client(DEFAULT_TIMEOUT_SECS)?,
        })
    }

    /// Create a client and resolve the loaded model from the server.
    pub async fn connect(base_url: &str, params: GenerationParams) -> Result<Self, ProviderError> {
        Self::new(base_url, params)?.resolve_model().await
    }

    /// Use a fixed model id instead of asking the server.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Pick the first model the server lists.
    pub async fn resolve_model(mut self) -> Result<Self, ProviderError> {
        let models = self.list_models().await?;
        let first = models.into_iter().next().ok_or(ProviderError::NoModelLoaded)?;
        tracing::info!(model = %first, base_url = %self.base_url, "resolved local model");
        self.model = first;
        Ok(self)
    }

    /// Model ids reported by `GET {base}/models`, in server order.
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(PLACEHOLDER_API_KEY)
            .send()
            .await
            .map_err(|e| send_error(e, &self.base_url, DEFAULT_TIMEOUT_SECS))?;

        let response = check_status(response).await?;
        let listing: ModelsResponse = decode_json(response).await?;
        Ok(listing.data.into_iter().map(|m| m.id).collect())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();
    if status == 429 {
        return Err(ProviderError::RateLimited {
            retry_after_ms: retry_after_ms(response.headers()),
        });
    }
    if status == 401 || status == 403 {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::AuthFailure(body));
    }
    if status >= 400 {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::ProtocolError {
            status,
            message: body,
        });
    }
    Ok(response)
}

#[async_trait]
impl ModelClient for LocalServerClient {
    fn name(&self) -> &str {
        "local"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(PLACEHOLDER_API_KEY)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, &self.base_url, DEFAULT_TIMEOUT_SECS))?;

        let response = check_status(response).await?;
        let api_response: ChatResponse = decode_json(response).await?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::malformed("response contained no choices"))?;
        let text = choice.message.content.unwrap_or_default();
        tracing::debug!(chars = text.len(), "local completion received");
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params() -> GenerationParams {
        GenerationParams {
            temperature: 0.1,
            max_tokens: 512,
        }
    }

    #[tokio::test]
    async fn resolves_first_listed_model() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .and(header("Authorization", "Bearer lm-studio"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"id": "qwen3-8b"}, {"id": "llama-3.1-8b"}]
            })))
            .mount(&server)
            .await;

        let client = LocalServerClient::connect(&format!("{}/v1", server.uri()), params())
            .await
            .unwrap();
        assert_eq!(client.model(), "qwen3-8b");
    }

    #[tokio::test]
    async fn empty_listing_is_no_model_loaded() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let err = LocalServerClient::connect(&format!("{}/v1", server.uri()), params())
            .await
            .err()
            .unwrap();
        assert_eq!(err, ProviderError::NoModelLoaded);
    }

    #[tokio::test]
    async fn unreachable_server_is_connection_failure() {
        // Nothing listens on the discard port.
        let err = LocalServerClient::connect("http://127.0.0.1:9/v1", params())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::ConnectionFailure(_)));
    }

    #[tokio::test]
    async fn chat_completion_sends_contract_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer lm-studio"))
            .and(body_partial_json(serde_json::json!({
                "model": "qwen3-8b",
                "messages": [{"role": "user", "content": "Pick one"}],
                "temperature": 0.1,
                "max_tokens": 512
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "  3\n"}}]
            })))
            .mount(&server)
            .await;

        let client = LocalServerClient::new(&format!("{}/v1", server.uri()), params())
            .unwrap()
            .with_model("qwen3-8b");
        let reply = client.complete("Pick one").await.unwrap();
        assert_eq!(reply, "3");
    }

    #[tokio::test]
    async fn empty_choices_is_protocol_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let client = LocalServerClient::new(&format!("{}/v1", server.uri()), params())
            .unwrap()
            .with_model("m");
        let err = client.complete("q").await.unwrap_err();
        assert!(matches!(err, ProviderError::ProtocolError { status: 0, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn malformed_body_is_protocol_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = LocalServerClient::new(&format!("{}/v1", server.uri()), params())
            .unwrap()
            .with_model("m");
        let err = client.complete("q").await.unwrap_err();
        assert!(matches!(err, ProviderError::ProtocolError { status: 0, .. }));
    }

    #[tokio::test]
    async fn server_error_and_rate_limit() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
            .mount(&server)
            .await;

        let client = LocalServerClient::new(&format!("{}/v1", server.uri()), params())
            .unwrap()
            .with_model("m");

        let first = client.complete("q").await.unwrap_err();
        assert_eq!(
            first,
            ProviderError::ProtocolError {
                status: 500,
                message: "model crashed".into()
            }
        );

        let second = client.complete("q").await.unwrap_err();
        assert_eq!(
            second,
            ProviderError::RateLimited {
                retry_after_ms: Some(3000)
            }
        );
    }

    #[tokio::test]
    async fn oversized_retry_after_saturates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429).insert_header("retry-after", "18446744073709552"),
            )
            .mount(&server)
            .await;

        let client = LocalServerClient::new(&format!("{}/v1", server.uri()), params())
            .unwrap()
            .with_model("m");

        let err = client.complete("q").await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::RateLimited {
                retry_after_ms: Some(u64::MAX)
            }
        );
        // The retry policy still bounds the wait.
        let delay = mcqbench_core::retry::RetryPolicy::default().delay_for(&err);
        assert_eq!(delay, std::time::Duration::from_secs(120));
    }
}
