//! OpenAI-compatible client implementation.
//!
//! # Features
//!
//! - **Chat Completions**: `POST {base_url}/chat/completions`, non-streaming
//! - **Optional authentication**: a bearer key is sent only when configured,
//!   since local model servers usually run without one
//! - **Retries**: exponential backoff with `Retry-After` support, disabled by
//!   default (`max_retries = 0`)
//!
//! # Examples
//!
//! ```no_run
//! use smartclinic_client::{LLMClient, OpenAIClient};
//! use smartclinic_common::client::{Config, RetryConfig};
//! use smartclinic_common::Message;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::new("local-model")
//!     .with_base_url("http://localhost:1234/v1")
//!     .with_timeout(60)
//!     .with_retry_config(RetryConfig { max_retries: 1, ..RetryConfig::default() });
//!
//! let client = OpenAIClient::new(config)?;
//! let request = client.config().chat_request(vec![Message::user("Hi")]);
//! let response = client.chat(&request).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use reqwest_retry_after::RetryAfterMiddleware;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use smartclinic_common::chat::Message;
use smartclinic_common::client::{ChatRequest, ChatResponse, Config};

use crate::LLMClient;
use crate::error::{ClientError, ErrorResponse};
use crate::openai::{ChatCompletionRequest, ChatCompletionResponse};

/// Client for OpenAI-compatible chat-completion servers.
#[derive(Clone)]
pub struct OpenAIClient {
    client: ClientWithMiddleware,
    api_key: Option<Arc<SecretString>>,
    base_url: String,
    config: Arc<Config>,
}

// Custom Debug implementation to avoid exposing API key
impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OpenAIClient {
    /// Create a new client from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigurationError`] if the base URL does not
    /// parse, or an error if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url).map_err(|e| {
            ClientError::ConfigurationError(format!("Invalid base URL '{base_url}': {e}"))
        })?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(
                config.retry_config.initial_delay,
                config.retry_config.max_delay,
            )
            .build_with_max_retries(
                u32::try_from(config.retry_config.max_retries).unwrap_or(u32::MAX),
            );

        // None means no timeout (slow local hardware)
        let reqwest_client = match config.timeout_seconds {
            Some(timeout) => reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout))
                .build()?,
            None => reqwest::Client::builder().build()?,
        };

        // RetryAfterMiddleware must come before RetryTransientMiddleware
        let client = reqwest_middleware::ClientBuilder::new(reqwest_client)
            .with(RetryAfterMiddleware::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            api_key: config.api_key.clone().map(Arc::new),
            base_url,
            config: Arc::new(config),
        })
    }

    async fn make_request<T: for<'de> Deserialize<'de>, B: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let mut request_builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(api_key) = &self.api_key {
            request_builder = request_builder.header(
                "Authorization",
                format!("Bearer {}", api_key.expose_secret()),
            );
        }

        let response = request_builder
            .body(serde_json::to_string(body).map_err(ClientError::SerializationError)?)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let error_text = response.text().await.map_err(|e| {
                warn!("Failed to read error response body: {e}");
                ClientError::NetworkError(e)
            })?;

            let error_message = match serde_json::from_str::<ErrorResponse>(&error_text) {
                Ok(parsed) => parsed.error.message,
                Err(parse_err) => {
                    debug!("Error body is not structured JSON ({parse_err}), using raw text");
                    error_text
                }
            };

            error!(
                "Model endpoint returned status {}: {}",
                status.as_u16(),
                error_message
            );

            return Err(match status.as_u16() {
                401 => ClientError::AuthenticationError(error_message),
                429 => ClientError::RateLimitError { retry_after },
                500..=599 => ClientError::ServiceUnavailable(error_message),
                _ => ClientError::RequestError(error_message),
            });
        }

        let response_text = response.text().await?;
        debug!("Raw model response: {response_text}");
        serde_json::from_str(&response_text).map_err(ClientError::SerializationError)
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    fn config(&self) -> &Config {
        &self.config
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.validate_request(request)?;

        let body = ChatCompletionRequest::from((request, self.config.as_ref()));
        let response: ChatCompletionResponse = self.make_request("chat/completions", &body).await?;

        let Some(choice) = response.choices.first() else {
            warn!(
                "Received empty choices array. Response ID: {:?}, Model: {:?}",
                response.id, response.model
            );
            return Err(
                ClientError::InvalidResponse("API returned no choices in response".to_string())
                    .into(),
            );
        };

        let finish_reason = choice
            .finish_reason
            .as_ref()
            .and_then(|reason| reason.parse().ok());

        let created_at = response
            .created
            .and_then(|ts| i64::try_from(ts).ok())
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(Utc::now);

        Ok(ChatResponse {
            message: Message::from(&choice.message),
            model: response.model.unwrap_or_else(|| body.model.clone()),
            usage: response.usage,
            finish_reason,
            created_at,
            response_id: response.id,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use smartclinic_common::chat::MessageRole;
    use smartclinic_common::client::FinishReason;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config(base_url: &str) -> Config {
        Config::new("local-model").with_base_url(base_url)
    }

    fn create_successful_response(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1_677_652_288,
            "model": "local-model",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30}
        })
    }

    fn user_request() -> ChatRequest {
        ChatRequest::new(vec![Message::user("Hello")])
    }

    #[tokio::test]
    async fn test_successful_chat_completion() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(serde_json::json!({
                "model": "local-model",
                "max_tokens": 800,
                "stream": false
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_successful_response("How can I help?")),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = OpenAIClient::new(create_test_config(&mock_server.uri())).unwrap();
        let response = client.chat(&user_request()).await.unwrap();

        assert_eq!(response.content(), "How can I help?");
        assert_eq!(response.message.role, MessageRole::Assistant);
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.response_id.as_deref(), Some("chatcmpl-123"));
        assert_eq!(response.usage.unwrap().total_tokens, 30);
    }

    #[tokio::test]
    async fn test_api_key_sent_as_bearer() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(create_successful_response("ok")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = create_test_config(&mock_server.uri()).with_api_key("test-key");
        let client = OpenAIClient::new(config).unwrap();

        assert_eq!(client.chat(&user_request()).await.unwrap().content(), "ok");
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(create_successful_response("ok")))
            .mount(&mock_server)
            .await;

        let base = format!("{}/v1/", mock_server.uri());
        let client = OpenAIClient::new(create_test_config(&base)).unwrap();

        assert!(client.chat(&user_request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_server_error_is_service_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": {"message": "model crashed", "type": "server_error"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = OpenAIClient::new(create_test_config(&mock_server.uri())).unwrap();
        let err = client.chat(&user_request()).await.unwrap_err();

        let client_error = err.downcast_ref::<ClientError>().unwrap();
        assert!(matches!(client_error, ClientError::ServiceUnavailable(m) if m == "model crashed"));
    }

    #[tokio::test]
    async fn test_authentication_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&mock_server)
            .await;

        let client = OpenAIClient::new(create_test_config(&mock_server.uri())).unwrap();
        let err = client.chat(&user_request()).await.unwrap_err();

        assert!(err.to_string().contains("unauthorized"));
        assert!(matches!(
            err.downcast_ref::<ClientError>().unwrap(),
            ClientError::AuthenticationError(_)
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_carries_retry_after() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "3")
                    .set_body_string("slow down"),
            )
            .mount(&mock_server)
            .await;

        let client = OpenAIClient::new(create_test_config(&mock_server.uri())).unwrap();
        let err = client.chat(&user_request()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ClientError>().unwrap(),
            ClientError::RateLimitError { retry_after: Some(wait) } if *wait == Duration::from_secs(3)
        ));
    }

    #[tokio::test]
    async fn test_empty_choices_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-123",
                "model": "local-model",
                "choices": []
            })))
            .mount(&mock_server)
            .await;

        let client = OpenAIClient::new(create_test_config(&mock_server.uri())).unwrap();
        let err = client.chat(&user_request()).await.unwrap_err();

        assert!(err.to_string().contains("no choices"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_serialization_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&mock_server)
            .await;

        let client = OpenAIClient::new(create_test_config(&mock_server.uri())).unwrap();
        let err = client.chat(&user_request()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ClientError>().unwrap(),
            ClientError::SerializationError(_)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Port 9 (discard) is closed on test hosts
        let client = OpenAIClient::new(create_test_config("http://127.0.0.1:9")).unwrap();
        let err = client.chat(&user_request()).await.unwrap_err();

        assert!(err.downcast_ref::<ClientError>().is_some());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = OpenAIClient::new(create_test_config("not a url")).unwrap_err();
        assert!(err.to_string().contains("Invalid base URL"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = create_test_config("http://localhost:1234/v1").with_api_key("sk-very-secret");
        let client = OpenAIClient::new(config).unwrap();

        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}

#[cfg(test)]
mod fuzz_tests {
    use crate::openai::{ChatCompletionResponse, OpenAIMessage};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn fuzz_response_parsing(data in prop::collection::vec(any::<u8>(), 0..1000)) {
            let _ = serde_json::from_slice::<ChatCompletionResponse>(&data);
        }

        #[test]
        fn fuzz_message_parsing(data in prop::collection::vec(any::<u8>(), 0..1000)) {
            let _ = serde_json::from_slice::<OpenAIMessage>(&data);
        }

        #[test]
        fn fuzz_response_with_arbitrary_content(content in ".*", model in "[a-z0-9-]{0,20}") {
            let json = serde_json::json!({
                "model": model,
                "choices": [{"message": {"role": "assistant", "content": content}}]
            });
            let parsed: ChatCompletionResponse = serde_json::from_value(json).unwrap_or_else(|_| {
                ChatCompletionResponse { id: None, created: None, model: None, choices: vec![], usage: None }
            });
            prop_assert!(parsed.choices.len() <= 1);
        }
    }
}
