//! Hospital information system (HIS) integration.
//!
//! - [`HisClient`]: single-shot HTTP client that adds the bearer token and
//!   decodes JSON responses
//! - [`HisOperation`] / [`HisTool`]: the thirteen HIS endpoints exposed as tools
//! - [`specialty_query`]: decides whether a specialty question wants the full
//!   list or a filtered one

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use crate::{ToolError, ToolRegistry};

mod operations;
pub mod specialty_query;

pub use operations::{HisOperation, HisTool};

/// Default base URL of the HIS REST API.
pub const DEFAULT_BASE_URL: &str = "http://eserver/api";

/// Default total request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body kept in [`ToolError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Connection settings for the HIS.
#[derive(Debug, Clone)]
pub struct HisConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,
    /// Bearer token, sent as `Authorization: Bearer <token>` when set.
    pub token: Option<SecretString>,
    /// Total request timeout.
    pub timeout: Duration,
}

impl Default for HisConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// HTTP client for the HIS.
///
/// Requests are never retried. Every request carries `accept: */*` and the
/// configured bearer token.
///
/// # Examples
///
/// ```no_run
/// use smartclinic_tools::his::{HisClient, HisConfig};
///
/// # async fn example() -> Result<(), smartclinic_tools::ToolError> {
/// let client = HisClient::new(HisConfig::default())?;
/// let specialties = client.get_json("his/AppointmentsAPI/InitAll", &[]).await?;
/// println!("{}", specialties["Codes"]["SPECIALITY"]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HisClient {
    inner: Client,
    base_url: String,
    token: Option<Arc<SecretString>>,
}

impl HisClient {
    /// Creates a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidUrl`] if the base URL does not parse, or
    /// [`ToolError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: HisConfig) -> Result<Self, ToolError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ToolError::InvalidUrl(format!("'{base_url}': {e}")))?;

        if config.token.is_none() {
            warn!("No HIS token configured; requests will be sent without authorization");
        }

        let inner = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(config.timeout))
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner,
            base_url,
            token: config.token.map(Arc::new),
        })
    }

    /// Builds `{base_url}/{path}?{query}` with the query values URL-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidUrl`] if the result does not parse.
    pub fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ToolError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw).map_err(|e| ToolError::InvalidUrl(format!("'{raw}': {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Sends a GET request and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns a transport, status or JSON error; see [`ToolError`].
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ToolError> {
        let url = self.endpoint(path, query)?;
        Self::send(self.request(Method::GET, url)).await
    }

    /// Sends a POST request with a JSON body and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns a transport, status or JSON error; see [`ToolError`].
    pub async fn post_json(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &Value,
    ) -> Result<Value, ToolError> {
        let url = self.endpoint(path, query)?;
        let builder = self
            .request(Method::POST, url)
            .header("content-type", "application/json")
            .body(serde_json::to_string(body)?);
        Self::send(builder).await
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("HIS {method} {url}");
        let builder = self.inner.request(method, url).header("accept", "*/*");
        match &self.token {
            Some(token) => builder.header(
                "authorization",
                format!("Bearer {}", token.expose_secret()),
            ),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Value, ToolError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body: String = text.chars().take(MAX_ERROR_BODY).collect();
            return Err(ToolError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!("HIS response ({} bytes)", text.len());
        Ok(serde_json::from_str(&text)?)
    }
}

impl std::fmt::Debug for HisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HisClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

/// Registers every HIS tool into `registry`.
pub fn register_tools(registry: &ToolRegistry, client: &Arc<HisClient>) {
    for operation in HisOperation::ALL {
        registry.register_tool(HisTool::new(operation, Arc::clone(client)));
    }
}

/// A registry holding exactly the HIS tools.
#[must_use]
pub fn tool_registry(client: &Arc<HisClient>) -> ToolRegistry {
    let registry = ToolRegistry::new();
    register_tools(&registry, client);
    registry
}
