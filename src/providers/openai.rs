//! OpenAI-compatible HTTP backends for title embeddings and query parsing.
//!
//! Works against any service exposing `/embeddings` and `/chat/completions`
//! with OpenAI request and response shapes (OpenRouter by default).
//!
//! # Examples
//!
//! ```rust,no_run
//! use comparekart::providers::openai::{OpenAiConfig, OpenAiEmbeddingBackend};
//! use comparekart_match::EmbeddingBackend;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OpenAiConfig::new("sk-...", "text-embedding-3-small")
//!     .with_base_url("https://openrouter.ai/api/v1");
//! let backend = OpenAiEmbeddingBackend::new(config)?;
//! let vectors = backend.embed(&["amul butter 500g".to_owned()]).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use comparekart_match::{CompareError, EmbeddingBackend, QueryParseBackend};
use serde::Deserialize;

// ── Configuration ─────────────────────────────────────────────

/// Connection settings shared by both backends.
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Bearer token sent with every request.
    pub api_key: String,
    /// Base URL without a trailing slash, e.g. `https://openrouter.ai/api/v1`.
    pub base_url: String,
    pub model: String,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Sampling temperature for chat completions.
    pub temperature: f32,
}

impl OpenAiConfig {
    /// Create a config for `model` authenticated with `api_key`.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://openrouter.ai/api/v1".into(),
            model: model.into(),
            timeout: Duration::from_secs(30),
            temperature: 0.1,
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, CompareError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CompareError::Backend(format!("failed to build HTTP client: {e}")))
}

/// POST `body` as JSON and decode a successful JSON reply.
async fn post_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    config: &OpenAiConfig,
    path: &str,
    body: &serde_json::Value,
) -> Result<T, CompareError> {
    let url = config.endpoint(path);
    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", config.api_key))
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| CompareError::Backend(format!("request to {path} failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(map_http_error(status, &body_text));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| CompareError::Backend(format!("malformed {path} response: {e}")))
}

/// Map an HTTP error status to a backend error.
fn map_http_error(status: reqwest::StatusCode, body: &str) -> CompareError {
    let message = extract_error_message(body);
    match status.as_u16() {
        401 => CompareError::Backend(format!("authentication failed: {message}")),
        429 => CompareError::Backend(format!("rate limited: {message}")),
        code => CompareError::Backend(format!("HTTP {code}: {message}")),
    }
}

/// Extract an error message from an OpenAI error response body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

// ── Embeddings ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Batched title embeddings via `POST {base}/embeddings`.
pub struct OpenAiEmbeddingBackend {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiEmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbeddingBackend")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl OpenAiEmbeddingBackend {
    /// # Errors
    ///
    /// Returns [`CompareError::Backend`] if the HTTP client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, CompareError> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAiEmbeddingBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CompareError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.config.model,
            "input": texts,
        });
        let response: EmbeddingResponse =
            post_json(&self.client, &self.config, "embeddings", &body).await?;

        // Replies may arrive out of order; `index` restores input order.
        let mut data = response.data;
        if data.iter().all(|d| d.index.is_some()) {
            data.sort_by_key(|d| d.index);
        }
        tracing::debug!(
            model = %self.config.model,
            requested = texts.len(),
            received = data.len(),
            "embeddings received"
        );
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

// ── Chat completions ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Single-turn chat completion via `POST {base}/chat/completions`.
pub struct OpenAiQueryBackend {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiQueryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiQueryBackend")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .field("temperature", &self.config.temperature)
            .finish()
    }
}

impl OpenAiQueryBackend {
    /// # Errors
    ///
    /// Returns [`CompareError::Backend`] if the HTTP client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, CompareError> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl QueryParseBackend for OpenAiQueryBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, instruction: &str, text: &str) -> Result<String, CompareError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": instruction},
                {"role": "user", "content": text},
            ],
            "temperature": self.config.temperature,
        });
        let response: ChatResponse =
            post_json(&self.client, &self.config, "chat/completions", &body).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CompareError::Backend("chat completion returned no content".into()))
    }
}
