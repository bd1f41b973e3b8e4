//! Anthropic Messages API backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mcqbench_core::{ModelClient, ProviderError};

use crate::config::GenerationParams;
use crate::http::{build_client, decode_json, retry_after_ms, send_error};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-opus-4-1-20250805";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Anthropic API client.
pub struct AnthropicClient {
    api_key: String,
    base_url: String,
    model: String,
    params: GenerationParams,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        model: &str,
        params: GenerationParams,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            params,
            client: build_client(DEFAULT_TIMEOUT_SECS)?,
        })
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

fn error_message(body: String) -> String {
    serde_json::from_str::<AnthropicError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

#[async_trait]
impl ModelClient for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, &self.base_url, DEFAULT_TIMEOUT_SECS))?;

        let status = response.status().as_u16();
        // 529 is Anthropic's "overloaded"; treated like a rate limit.
        if status == 429 || status == 529 {
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry_after_ms(response.headers()),
            });
        }
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthFailure(error_message(body)));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ProtocolError {
                status,
                message: error_message(body),
            });
        }

        let api_response: AnthropicResponse = decode_json(response).await?;
        let text = api_response
            .content
            .into_iter()
            .find_map(|c| c.text)
            .ok_or_else(|| ProviderError::malformed("response contained no text block"))?;

        Ok(text.trim().to_string())
    }
}
