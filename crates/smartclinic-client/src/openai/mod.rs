//! OpenAI chat-completions wire types.
//!
//! Only the subset the assistant needs is modelled: plain text messages in,
//! one text choice out. Fields that local servers often omit (`id`,
//! `created`, `usage`) are optional on the way in.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use smartclinic_common::chat::{Message, MessageRole};
use smartclinic_common::client::{ChatRequest, Config, Usage};

pub mod client;
pub use client::OpenAIClient;

/// A single choice from a chat completion response.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// The index of this choice in the response array.
    #[serde(default)]
    pub index: u32,
    /// The generated message for this choice.
    pub message: OpenAIMessage,
    /// Why generation stopped for this choice.
    pub finish_reason: Option<String>,
}

/// OpenAI-compatible message format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenAIMessage {
    /// The role of the message author.
    pub role: MessageRole,
    /// The text content; some servers send `null` for empty replies.
    #[serde(default)]
    pub content: Option<String>,
}

impl From<&Message> for OpenAIMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: Some(message.content.clone()),
        }
    }
}

impl From<&OpenAIMessage> for Message {
    fn from(message: &OpenAIMessage) -> Self {
        Self::new(message.role, message.content.clone().unwrap_or_default())
    }
}

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize, TypedBuilder)]
pub struct ChatCompletionRequest {
    /// Model identifier.
    pub model: String,
    /// Prompt messages in order.
    pub messages: Vec<OpenAIMessage>,
    /// Maximum tokens to generate.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Always `false`; streaming is not used.
    #[builder(default = Some(false))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl From<(&ChatRequest, &Config)> for ChatCompletionRequest {
    fn from((request, config): (&ChatRequest, &Config)) -> Self {
        Self::builder()
            .model(
                request
                    .model
                    .clone()
                    .unwrap_or_else(|| config.model.clone()),
            )
            .messages(request.messages.iter().map(OpenAIMessage::from).collect())
            .max_tokens(request.max_tokens.or(config.max_tokens))
            .temperature(request.temperature.or(config.temperature))
            .build()
    }
}

/// Response body of `POST /chat/completions`.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    /// Server-assigned identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Unix timestamp of creation.
    #[serde(default)]
    pub created: Option<u64>,
    /// Model that produced the completion.
    #[serde(default)]
    pub model: Option<String>,
    /// Generated choices; the first one is used.
    pub choices: Vec<ChatChoice>,
    /// Token accounting.
    #[serde(default)]
    pub usage: Option<Usage>,
}
