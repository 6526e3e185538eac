use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::chat::Message;

/// Default OpenAI-compatible endpoint of a locally hosted model server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:1234/v1";

/// Default model identifier sent to the local model server.
pub const DEFAULT_MODEL: &str = "local-model";

/// Indicates why the model stopped generating tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Copy)]
#[non_exhaustive]
pub enum FinishReason {
    /// Generation completed naturally at a stop sequence or end of response.
    #[serde(rename = "stop")]
    Stop,
    /// Generation was truncated because the maximum token limit was reached.
    ///
    /// A truncated reasoning reply usually fails JSON extraction and falls
    /// back to a direct answer.
    #[serde(rename = "length")]
    Length,
    /// Generation was stopped by the content filter.
    #[serde(rename = "content_filter")]
    ContentFilter,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Length => write!(f, "length"),
            Self::ContentFilter => write!(f, "content_filter"),
        }
    }
}

impl FromStr for FinishReason {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop" => Ok(Self::Stop),
            "length" => Ok(Self::Length),
            "content_filter" => Ok(Self::ContentFilter),
            _ => anyhow::bail!("Unknown finish reason: {s}"),
        }
    }
}

/// Configuration for exponential backoff retry behavior.
///
/// The default performs no retries: a local model that fails once is reported
/// to the user as unavailable rather than retried behind their back.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use smartclinic_common::client::RetryConfig;
///
/// let config = RetryConfig {
///     max_retries: 2,
///     initial_delay: Duration::from_millis(250),
///     ..RetryConfig::default()
/// };
/// assert_eq!(config.max_retries, 2);
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts before failing.
    pub max_retries: usize,
    /// Initial delay before the first retry attempt.
    pub initial_delay: Duration,
    /// Maximum delay between retry attempts (caps exponential growth).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Token usage statistics reported by the model server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// Number of tokens in the input prompt.
    pub prompt_tokens: u32,
    /// Number of tokens generated in the completion.
    pub completion_tokens: u32,
    /// Total tokens used (prompt + completion).
    pub total_tokens: u32,
}

/// A request for a chat completion.
///
/// # Examples
///
/// ```
/// use smartclinic_common::{ChatRequest, Message};
///
/// let request = ChatRequest::new(vec![Message::user("Hello!")]).with_temperature(0.7);
/// assert_eq!(request.temperature, Some(0.7));
/// assert!(request.model.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// Prompt messages in order.
    pub messages: Vec<Message>,
    /// Model identifier; falls back to the client configuration when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Sampling temperature (0.0 to 2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Creates a request with the given messages and no sampling overrides.
    #[must_use]
    pub const fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl From<(&Config, Vec<Message>)> for ChatRequest {
    fn from((config, messages): (&Config, Vec<Message>)) -> Self {
        Self {
            messages,
            model: Some(config.model.clone()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// A response from a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated assistant message.
    pub message: Message,
    /// The identifier of the model that generated this response.
    pub model: String,
    /// Token usage statistics, when the server reports them.
    pub usage: Option<Usage>,
    /// Reason why generation stopped.
    pub finish_reason: Option<FinishReason>,
    /// Timestamp when this response was received.
    pub created_at: DateTime<Utc>,
    /// Identifier assigned by the server.
    pub response_id: Option<String>,
}

impl ChatResponse {
    /// A response received now, without usage or finish information.
    #[must_use]
    pub fn new(message: Message, model: impl Into<String>) -> Self {
        Self {
            message,
            model: model.into(),
            usage: None,
            finish_reason: None,
            created_at: Utc::now(),
            response_id: None,
        }
    }

    /// Text content of the generated message.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.message.content
    }
}

/// Configuration for the language-model client.
///
/// The `api_key` is optional because local model servers usually accept
/// unauthenticated requests. It is kept in a `SecretString` and never
/// serialized.
///
/// # Examples
///
/// ```
/// use smartclinic_common::Config;
///
/// let config = Config::new("local-model")
///     .with_base_url("http://localhost:1234/v1")
///     .with_temperature(0.7)
///     .with_max_tokens(800);
/// let request = config.chat_request(Vec::new());
/// assert_eq!(request.max_tokens, Some(800));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The model identifier to use.
    pub model: String,
    /// Base URL of the OpenAI-compatible API, without the endpoint path.
    pub base_url: String,
    /// API key for authentication (stored securely).
    #[serde(skip_serializing, default)]
    pub api_key: Option<SecretString>,
    /// Request timeout in seconds.
    pub timeout_seconds: Option<u64>,
    /// Retry behavior for transient failures.
    #[serde(skip)]
    pub retry_config: RetryConfig,
    /// Default sampling temperature (0.0 to 2.0).
    pub temperature: Option<f32>,
    /// Default maximum tokens to generate.
    pub max_tokens: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_seconds: None,
            retry_config: RetryConfig::default(),
            temperature: Some(0.7),
            max_tokens: Some(800),
        }
    }
}

impl Config {
    /// Creates a configuration for the given model with default settings.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the API key for authentication.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Sets the default sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the default maximum tokens to generate.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub const fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Builds a chat request carrying this configuration's defaults.
    #[must_use]
    pub fn chat_request(&self, messages: Vec<Message>) -> ChatRequest {
        (self, messages).into()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn test_default_config_targets_local_model() {
        let config = Config::default();
        assert_eq!(config.model, "local-model");
        assert_eq!(config.base_url, "http://localhost:1234/v1");
        assert_eq!(config.temperature, Some(0.7));
        assert_eq!(config.max_tokens, Some(800));
        assert!(config.api_key.is_none());
        assert_eq!(config.retry_config.max_retries, 0);
    }

    #[test]
    fn test_chat_request_inherits_config_defaults() {
        let config = Config::new("local-model").with_max_tokens(256);
        let request = config.chat_request(vec![Message::user("hi")]);

        assert_eq!(request.model.as_deref(), Some("local-model"));
        assert_eq!(request.max_tokens, Some(256));
        assert_eq!(request.temperature, Some(0.7));
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let config = Config::default().with_api_key("sk-secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(!json.contains("api_key"));
    }

    #[test]
    fn test_finish_reason_parsing() {
        assert_eq!("stop".parse::<FinishReason>().unwrap(), FinishReason::Stop);
        assert_eq!(FinishReason::Length.to_string(), "length");
        assert!("exploded".parse::<FinishReason>().is_err());
    }
}
