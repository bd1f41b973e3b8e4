//! Google Gemini `generateContent` backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mcqbench_core::{ModelClient, ProviderError};

use crate::config::GenerationParams;
use crate::http::{build_client, decode_json, retry_after_ms, send_error};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
    params: GenerationParams,
    client: reqwest::Client,
}

impl GeminiClient {
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
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Classify a non-success response. Gemini reports a bad key as a 400 and
/// quota exhaustion with a `RESOURCE_EXHAUSTED` status string.
fn classify_error(status: u16, retry_after: Option<u64>, body: String) -> ProviderError {
    let parsed = serde_json::from_str::<GeminiError>(&body).ok();
    let api_status = parsed.as_ref().map(|e| e.error.status.as_str()).unwrap_or("");

    if status == 429 || api_status == "RESOURCE_EXHAUSTED" {
        return ProviderError::RateLimited {
            retry_after_ms: retry_after,
        };
    }

    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .unwrap_or_else(|| body.clone());

    if status == 401 || status == 403 || body.contains("API_KEY_INVALID") {
        return ProviderError::AuthFailure(message);
    }
    ProviderError::ProtocolError { status, message }
}

#[async_trait]
impl ModelClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.params.temperature,
                max_output_tokens: self.params.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, &self.base_url, DEFAULT_TIMEOUT_SECS))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let retry_after = retry_after_ms(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, retry_after, body));
        }

        let api_response: GenerateContentResponse = decode_json(response).await?;
        let text = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .unwrap_or_default();

        // A blocked or empty candidate is not an answer.
        if text.trim().is_empty() {
            return Err(ProviderError::malformed("response contained no candidate text"));
        }
        Ok(text.trim().to_string())
    }
}
