//! AI gateway
//!
//! Wraps the hosted chat provider behind the [`AiGateway`] trait. A call sends
//! one prompt, accumulates the streamed text fragments in arrival order and
//! hands back either the raw text or a parsed JSON shape. Every failure is a
//! [`GatewayError`] value so callers can degrade gracefully.

mod fragment;
mod http;
mod sse;

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

pub use fragment::StreamFragment;
pub use http::HttpTransport;
pub use sse::SseDecoder;

/// Environment variable holding the provider API key
pub const API_KEY_ENV: &str = "AXENT_AI_API_KEY";
/// Environment variable overriding the provider base URL
pub const BASE_URL_ENV: &str = "AXENT_AI_BASE_URL";
/// Environment variable overriding the provider user key
pub const USER_KEY_ENV: &str = "AXENT_AI_USER_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.tambo.co";
pub const DEFAULT_USER_KEY: &str = "user-1";

/// Errors produced by a generation call
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("AI API key is not configured")]
    MissingApiKey,

    #[error("Empty response from AI")]
    EmptyResponse,

    #[error("AI response was not valid JSON: {0}")]
    Parse(String),

    #[error("AI provider error: {0}")]
    Provider(String),
}

/// Provider connection settings
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub user_key: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_key: DEFAULT_USER_KEY.to_string(),
        }
    }
}

impl AiConfig {
    /// The API key, treating a blank value as absent
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// Interface for sending a prompt to the AI provider
#[async_trait::async_trait]
pub trait AiGateway: Send + Sync {
    /// Sends `prompt` and returns the full accumulated response text
    async fn generate_text(&self, prompt: &str) -> Result<String, GatewayError>;

    /// Whether credentials are present, without contacting the provider
    fn is_configured(&self) -> bool {
        true
    }
}

/// Sends `prompt` and parses the fence-stripped response as `T`
pub async fn generate_json<T: DeserializeOwned>(
    gateway: &dyn AiGateway,
    prompt: &str,
) -> Result<T, GatewayError> {
    let text = gateway.generate_text(prompt).await?;
    parse_json_response(&text)
}

/// Parses response text as `T` after removing Markdown code fences
pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T, GatewayError> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(&cleaned).map_err(|e| {
        warn!(error = %e, raw = %text, "Failed to parse AI response");
        GatewayError::Parse(e.to_string())
    })
}

/// Removes ```json / ``` fence markers and surrounding whitespace
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Raw provider events, in arrival order
pub type EventStream = BoxStream<'static, Result<Value, GatewayError>>;

/// Opens a streaming run against the provider
#[async_trait::async_trait]
pub trait EventTransport: Send + Sync {
    async fn open(&self, api_key: &str, prompt: &str) -> Result<EventStream, GatewayError>;
}

/// Gateway that accumulates text from a streamed provider run
#[derive(Clone)]
pub struct StreamingGateway {
    api_key: Option<String>,
    transport: Arc<dyn EventTransport>,
}

impl StreamingGateway {
    /// Creates a gateway over an arbitrary transport
    pub fn new(api_key: Option<String>, transport: Arc<dyn EventTransport>) -> Self {
        Self { api_key, transport }
    }

    /// Creates a gateway talking HTTP to the configured provider
    pub fn from_config(config: &AiConfig) -> Self {
        Self::new(
            config.api_key().map(str::to_string),
            Arc::new(HttpTransport::new(config)),
        )
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

#[async_trait::async_trait]
impl AiGateway for StreamingGateway {
    async fn generate_text(&self, prompt: &str) -> Result<String, GatewayError> {
        let api_key = self.api_key().ok_or(GatewayError::MissingApiKey)?;

        debug!(prompt_chars = prompt.len(), "Opening AI stream");
        let mut events = self.transport.open(api_key, prompt).await?;

        let mut text = String::new();
        let mut skipped = 0usize;
        while let Some(event) = events.next().await {
            let event = event?;
            if !StreamFragment::classify(&event).append_to(&mut text) {
                skipped += 1;
            }
        }
        debug!(chars = text.len(), skipped, "AI stream finished");

        if text.trim().is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(text)
    }

    fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }
}
