use crate::circuit_breaker::{create_llm_circuit_breaker, LlmCircuitBreaker};
use crate::config::Config;
use crate::errors::AppError;
use failsafe::CircuitBreaker;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const TEMPERATURE: f32 = 0.6;
pub const MAX_OUTPUT_TOKENS: u32 = 750;

const SYSTEM_PROMPT: &str = "You are a credit analyst who explains loan-risk model results \
to gig-economy workers in plain, neutral language.";
const RETRY_DELAY: Duration = Duration::from_millis(250);

/// Typed failure of a text-generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// The service rejected the credentials (401/403).
    Authentication(String),
    /// The service is throttling us (429).
    RateLimited(String),
    /// Any other non-success status or an unusable response body.
    Api(String),
    /// Connection, timeout or IO failure before a response arrived.
    Transport(String),
    /// The circuit breaker is open; the call was not attempted.
    CircuitOpen,
}

impl CompletionError {
    /// Only transport failures are worth an immediate retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, CompletionError::Transport(_))
    }

    /// Text shown to the user in place of the generated explanation.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            CompletionError::Authentication(_) => {
                "Explanation unavailable: the text-generation service rejected our credentials."
            }
            CompletionError::RateLimited(_) => {
                "Explanation unavailable: the text-generation service is busy. Please try again in a minute."
            }
            CompletionError::Api(_) => {
                "Explanation unavailable: the text-generation service returned an error."
            }
            CompletionError::Transport(_) => {
                "Explanation unavailable: the text-generation service could not be reached."
            }
            CompletionError::CircuitOpen => {
                "Explanation unavailable: the text-generation service is temporarily disabled after repeated failures."
            }
        }
    }
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionError::Authentication(msg) => write!(f, "authentication failed: {}", msg),
            CompletionError::RateLimited(msg) => write!(f, "rate limited: {}", msg),
            CompletionError::Api(msg) => write!(f, "API error: {}", msg),
            CompletionError::Transport(msg) => write!(f, "transport error: {}", msg),
            CompletionError::CircuitOpen => write!(f, "circuit open"),
        }
    }
}

impl From<CompletionError> for AppError {
    fn from(err: CompletionError) -> Self {
        AppError::ExternalServiceFailure(err.to_string())
    }
}

/// Single-capability seam over the external text-generation service.
pub trait TextGenerator: Send + Sync {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, CompletionError>> + Send;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    breaker: Arc<LlmCircuitBreaker>,
    /// Completed explanations keyed by SHA-256 of model and prompt.
    cache: Cache<String, String>,
}

impl LlmClient {
    /// Creates a new `LlmClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, e.g. `https://api.openai.com/v1`.
    /// * `api_key` - Bearer token.
    /// * `model` - Model identifier sent with every request.
    /// * `timeout` - Per-attempt request timeout.
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::ExternalServiceFailure(format!("Failed to create LLM client: {}", e))
            })?;

        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(3600))
            .max_capacity(10_000)
            .build();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            breaker: Arc::new(create_llm_circuit_breaker()),
            cache,
        })
    }

    /// Builds a client when an API key is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, AppError> {
        let Some(ref api_key) = config.llm_api_key else {
            return Ok(None);
        };
        Self::new(
            config.llm_base_url.clone(),
            api_key.clone(),
            config.llm_model.clone(),
            Duration::from_secs(config.llm_timeout_secs),
        )
        .map(Some)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn cache_key(&self, prompt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.model.as_bytes());
        hasher.update(b"\n");
        hasher.update(prompt.as_bytes());
        hex::encode(hasher.finalize())
    }

    async fn send_once(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let detail = format!("{}: {}", status, error_text);
            return Err(match status.as_u16() {
                401 | 403 => CompletionError::Authentication(detail),
                429 => CompletionError::RateLimited(detail),
                _ => CompletionError::Api(detail),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Api(format!("Failed to parse completion: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| CompletionError::Api("completion contained no text".to_string()))
    }

    async fn send_with_retry(&self, prompt: &str) -> Result<String, CompletionError> {
        match self.send_once(prompt).await {
            Err(e) if e.is_transient() => {
                tracing::warn!("LLM call failed ({}), retrying once", e);
                tokio::time::sleep(RETRY_DELAY).await;
                self.send_once(prompt).await
            }
            other => other,
        }
    }
}

impl TextGenerator for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let key = self.cache_key(prompt);
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!("LLM cache hit");
            return Ok(cached);
        }

        if !self.breaker.is_call_permitted() {
            tracing::warn!("LLM circuit open, skipping call");
            return Err(CompletionError::CircuitOpen);
        }

        tracing::info!("Requesting explanation from {}", self.model);
        let outcome = self.send_with_retry(prompt).await;

        // Record the outcome on the breaker.
        let result = match self.breaker.call(move || outcome) {
            Ok(text) => Ok(text),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => Err(CompletionError::CircuitOpen),
        };

        match &result {
            Ok(text) => {
                tracing::info!("✓ Explanation received ({} chars)", text.len());
                self.cache.insert(key, text.clone()).await;
            }
            Err(e) => tracing::error!("LLM call failed: {}", e),
        }

        result
    }
}
