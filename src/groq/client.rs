use std::env;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::types::{ApiError, ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

const API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "deepseek-r1-distill-qwen-32b";
/// Reasoning models think before answering; allow more than the search timeouts.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum GroqError {
    #[error("GROQ_API_KEY not set. Get one at https://console.groq.com/keys")]
    ApiKeyNotSet,

    #[error("Groq rejected the API key: {0}")]
    InvalidApiKey(String),

    #[error("API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Model returned an empty reply")]
    EmptyReply,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// One chat-completion round trip: full message list in, assistant text out.
/// Implemented by `GroqClient` for production; mock implementations used in tests.
pub trait ChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, GroqError>;
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Model identifier plus credential, resolved once and handed to [`GroqClient::new`].
#[derive(Clone, Debug)]
pub struct AgentConfig {
    model: String,
    api_key: ApiKey,
}

impl AgentConfig {
    pub fn new(api_key: &str) -> Result<Self, GroqError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(GroqError::ApiKeyNotSet);
        }
        Ok(Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: ApiKey(api_key.to_string()),
        })
    }

    /// `GROQ_API_KEY` (required) and `GROQ_MODEL` (optional).
    pub fn from_env() -> Result<Self, GroqError> {
        let api_key = env::var("GROQ_API_KEY").map_err(|_| GroqError::ApiKeyNotSet)?;
        let config = Self::new(&api_key)?;
        Ok(match env::var("GROQ_MODEL") {
            Ok(model) => config.with_model(&model),
            Err(_) => config,
        })
    }

    /// Blank names keep the current model.
    pub fn with_model(mut self, model: &str) -> Self {
        let model = model.trim();
        if !model.is_empty() {
            self.model = model.to_string();
        }
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Clone)]
pub struct GroqClient {
    http: Client,
    config: AgentConfig,
    base_url: String,
}

impl GroqClient {
    pub fn new(http: Client, config: AgentConfig) -> Self {
        Self {
            http,
            config,
            base_url: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            config: AgentConfig::new("test-key").unwrap(),
            base_url: base_url.to_string(),
        }
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, GroqError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
        };

        debug_assert!(
            url.starts_with("https://") || cfg!(test),
            "API key must only be sent over HTTPS"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let api_error = serde_json::from_str::<ChatCompletionResponse>(&text)
                .ok()
                .and_then(|body| body.error);
            let classified = classify_status(status.as_u16(), api_error.as_ref(), &text);
            let kind = api_error.as_ref().and_then(|e| e.kind.as_deref());
            warn!(status = %status, kind, error = %classified, "Groq API error");
            return Err(classified);
        }

        let body: ChatCompletionResponse = response.json().await?;
        if let Some(err) = &body.error {
            let classified = classify_status(0, Some(err), "");
            warn!(error = %classified, "Groq API error in 200 response");
            return Err(classified);
        }

        debug!(model = %self.config.model, "groq completion complete");
        extract_reply(body)
    }
}

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

impl ChatModel for GroqClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, GroqError> {
        let mut last_err = None;
        for attempt in 0..MAX_RETRIES {
            match self.chat(messages).await {
                Ok(reply) => return Ok(reply),
                Err(e) if is_retriable(&e) => {
                    last_err = Some(e);
                    if attempt + 1 < MAX_RETRIES {
                        let delay_ms = jittered_backoff(attempt);
                        debug!(
                            attempt = attempt + 1,
                            delay_ms, "retrying after transient error"
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(GroqError::RateLimited))
    }
}

fn extract_reply(body: ChatCompletionResponse) -> Result<String, GroqError> {
    body.choices
        .and_then(|choices| choices.into_iter().next())
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(GroqError::EmptyReply)
}

fn is_retriable(e: &GroqError) -> bool {
    matches!(
        e,
        GroqError::RateLimited
            | GroqError::Api {
                code: 500..=599,
                ..
            }
    )
}

/// Equal jitter backoff: base/2 + rand(0, base/2).
fn jittered_backoff(attempt: u32) -> u64 {
    let base = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
    let half = base / 2;
    half + fastrand::u64(..half.max(1))
}

/// `status` is 0 when the error arrived inside a 2xx body.
fn classify_status(status: u16, err: Option<&ApiError>, raw_body: &str) -> GroqError {
    let message = match err.and_then(|e| e.message.clone()) {
        Some(message) => message,
        None if raw_body.is_empty() => format!("HTTP {status}"),
        None => {
            let end = raw_body.floor_char_boundary(200);
            format!("HTTP {status}: {}", &raw_body[..end])
        }
    };
    let invalid_key = err.and_then(|e| e.code.as_deref()) == Some("invalid_api_key");

    match status {
        429 => GroqError::RateLimited,
        401 => GroqError::InvalidApiKey(message),
        _ if invalid_key => GroqError::InvalidApiKey(message),
        code => GroqError::Api { code, message },
    }
}
