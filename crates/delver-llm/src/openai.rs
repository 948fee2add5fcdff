//! Query backend for OpenAI-compatible chat completion APIs.
//!
//! Covers OpenAI itself, Groq, Ollama and any self-hosted server speaking the
//! same `/chat/completions` dialect. Every prompt is one single-turn request;
//! the explorer keeps its own history inside the prompt text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};

use crate::backend::{QueryBackend, with_retry};
use crate::error::{LlmError, RateLimitInfo, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const GROQ_DEFAULT_MODEL: &str = "llama-3.1-70b-versatile";

const DEFAULT_TIMEOUT_SECS: u64 = 300;
/// Local inference is slow on first load.
const OLLAMA_TIMEOUT_SECS: u64 = 600;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Connection and sampling settings for [`OpenAiBackend`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Bearer token. Empty or absent for servers without auth.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model id; [`DEFAULT_MODEL`] when unset.
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
    /// Retries after the first attempt, for transient failures only.
    pub max_retries: u32,
    /// First retry delay; doubles on each retry.
    pub retry_backoff: Duration,
    /// Label used in logs.
    pub name: String,
}

impl OpenAiConfig {
    /// Settings for an arbitrary compatible server.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: None,
            base_url: base_url.into(),
            model: None,
            system_prompt: None,
            temperature: None,
            max_tokens: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            name: name.into(),
        }
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", OPENAI_BASE_URL).with_api_key(api_key)
    }

    pub fn groq(api_key: impl Into<String>) -> Self {
        Self::new("groq", GROQ_BASE_URL)
            .with_api_key(api_key)
            .with_model(GROQ_DEFAULT_MODEL)
    }

    pub fn ollama() -> Self {
        Self::new("ollama", OLLAMA_BASE_URL).with_timeout(Duration::from_secs(OLLAMA_TIMEOUT_SECS))
    }

    /// OpenAI settings with the key from `OPENAI_API_KEY`.
    pub fn openai_from_env() -> Result<Self> {
        std::env::var("OPENAI_API_KEY")
            .map(Self::openai)
            .map_err(|_| LlmError::Config("OPENAI_API_KEY environment variable not set".into()))
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sent as a system message ahead of every prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    fn bearer(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────────────────

/// [`QueryBackend`] over an OpenAI-compatible HTTP API.
pub struct OpenAiBackend {
    client: Client,
    config: OpenAiConfig,
    endpoint: String,
}

impl OpenAiBackend {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    /// Backend for OpenAI using `OPENAI_API_KEY`.
    pub fn openai_from_env() -> Result<Self> {
        Self::new(OpenAiConfig::openai_from_env()?)
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn completion_request<'a>(&'a self, prompt: &'a str) -> CompletionRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = self.config.system_prompt {
            messages.push(Message {
                role: "system",
                content: system,
            });
        }
        messages.push(Message {
            role: "user",
            content: prompt,
        });

        CompletionRequest {
            model: self.config.model_or_default(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: false,
        }
    }

    /// One HTTP attempt, without retries.
    async fn send_once(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .json(request);
        if let Some(key) = self.config.bearer() {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &body, retry_after.as_deref()));
        }

        serde_json::from_str::<CompletionResponse>(&body)
            .map_err(|e| LlmError::Serialization(e.to_string()))?
            .into_text()
    }
}

#[async_trait]
impl QueryBackend for OpenAiBackend {
    async fn query(&self, prompt: &str) -> Result<String> {
        let request = self.completion_request(prompt);
        tracing::debug!(
            backend = %self.config.name,
            model = request.model,
            prompt_chars = prompt.len(),
            "Sending completion request"
        );

        with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            &self.config.name,
            || self.send_once(&request),
        )
        .await
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("name", &self.config.name)
            .field("endpoint", &self.endpoint)
            .field("model", &self.config.model_or_default())
            .finish_non_exhaustive()
    }
}

/// Map a non-success status and body to an error. Auth, rate-limit and
/// request errors get their own variants so retry logic can tell them apart.
fn status_error(status: StatusCode, body: &str, retry_after: Option<&str>) -> LlmError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LlmError::Auth(format!("Authentication failed: {}", message))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            LlmError::RateLimit(RateLimitInfo::from_header(message, retry_after))
        }
        StatusCode::BAD_REQUEST => LlmError::InvalidRequest(message),
        s if s.is_server_error() => LlmError::Backend(format!("Server error: {}", message)),
        _ => LlmError::Backend(message),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionResponse {
    /// Text of the first choice.
    fn into_text(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::Backend("Response contained no message content".into()))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header as header_is, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(text: &str) -> serde_json::Value {
        json!({
            "id": "cmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}]
        })
    }

    fn local(server: &MockServer) -> OpenAiConfig {
        OpenAiConfig::new("test", format!("{}/v1/", server.uri()))
            .with_retry_backoff(Duration::from_millis(1))
    }

    #[test]
    fn test_presets() {
        let openai = OpenAiConfig::openai("k");
        assert_eq!(openai.base_url, OPENAI_BASE_URL);
        assert_eq!(openai.bearer(), Some("k"));
        assert_eq!(openai.model_or_default(), DEFAULT_MODEL);

        let groq = OpenAiConfig::groq("k");
        assert_eq!(groq.name, "groq");
        assert_eq!(groq.model_or_default(), GROQ_DEFAULT_MODEL);

        let ollama = OpenAiConfig::ollama();
        assert!(ollama.bearer().is_none());
        assert_eq!(ollama.timeout, Duration::from_secs(OLLAMA_TIMEOUT_SECS));

        // an empty key is not sent
        assert!(OpenAiConfig::openai("").bearer().is_none());
    }

    #[test]
    fn test_completion_request_shape() {
        let backend = OpenAiBackend::new(
            OpenAiConfig::openai("k")
                .with_base_url("http://host/v1/")
                .with_system_prompt("be brief"),
        )
        .unwrap();
        assert_eq!(backend.endpoint, "http://host/v1/chat/completions");

        let request = serde_json::to_value(backend.completion_request("hello")).unwrap();
        assert_eq!(request["model"], DEFAULT_MODEL);
        assert_eq!(request["messages"][0]["role"], "system");
        assert_eq!(request["messages"][1], json!({"role": "user", "content": "hello"}));
        assert_eq!(request["stream"], false);
        assert!(request.get("max_tokens").is_none());
    }

    #[test]
    fn test_status_error_mapping() {
        let body = r#"{"error":{"message":"slow down"}}"#;
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, body, Some("1.5"));
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_millis(1500)));

        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, body, None),
            LlmError::Auth(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "not json", None),
            LlmError::InvalidRequest(ref m) if m.contains("not json")
        ));
        assert!(!status_error(StatusCode::BAD_GATEWAY, "", None).is_retryable());
    }

    #[tokio::test]
    async fn test_query_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header_is("authorization", "Bearer secret"))
            .and(body_partial_json(json!({"model": "qwen"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("```json\n{}\n```")))
            .expect(1)
            .mount(&server)
            .await;

        let backend =
            OpenAiBackend::new(local(&server).with_api_key("secret").with_model("qwen")).unwrap();
        assert_eq!(backend.query("plan").await.unwrap(), "```json\n{}\n```");
    }

    #[tokio::test]
    async fn test_query_retries_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(json!({"error": {"message": "busy"}}))
                    .insert_header("retry-after", "0"),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("ok")))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(local(&server)).unwrap();
        assert_eq!(backend.query("q").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_query_empty_choices_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(local(&server)).unwrap();
        assert!(matches!(
            backend.query("q").await,
            Err(LlmError::Backend(_))
        ));
    }
}
