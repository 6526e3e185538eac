//! # smartclinic-client
//!
//! Client for the language-model endpoint used by the SmartClinic assistant.
//!
//! The assistant talks to a locally hosted model through any server that
//! implements the OpenAI chat-completions API (LM Studio, llama.cpp, vLLM,
//! Ollama in compatibility mode). All clients implement [`LLMClient`] so the
//! reasoning step can be tested against a scripted implementation.
//!
//! ## Example
//!
//! ```no_run
//! use smartclinic_client::{LLMClient, OpenAIClient};
//! use smartclinic_common::{Config, Message};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::new("local-model").with_base_url("http://localhost:1234/v1");
//! let client = OpenAIClient::new(config)?;
//!
//! let request = client.config().chat_request(vec![Message::user("Hello!")]);
//! let response = client.chat(&request).await?;
//! println!("Response: {}", response.content());
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use async_trait::async_trait;

use smartclinic_common::{ChatRequest, ChatResponse, Config};

pub mod error;
pub mod openai;

pub use error::ClientError;
pub use openai::OpenAIClient;

/// Trait for language-model client implementations.
///
/// Implementations must be thread-safe so a single client can be shared by
/// every session.
#[must_use = "LLMClient must be used to make requests"]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// The configuration used to build this client.
    fn config(&self) -> &Config;

    /// Send a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The request fails validation
    /// - Network communication fails or times out
    /// - The endpoint answers with a non-2xx status
    /// - The response cannot be parsed or carries no choices
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Validate a chat request before sending.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] when the request has no
    /// messages, and [`ClientError::InvalidTemperature`] when the temperature
    /// is out of range.
    fn validate_request(&self, request: &ChatRequest) -> Result<()> {
        if request.messages.is_empty() {
            return Err(
                ClientError::InvalidRequest("Request must contain at least one message".into())
                    .into(),
            );
        }

        if request
            .temperature
            .is_some_and(|t| !(0.0..=2.0).contains(&t))
        {
            return Err(ClientError::InvalidTemperature.into());
        }

        Ok(())
    }
}
