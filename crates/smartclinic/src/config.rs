//! Assistant configuration.
//!
//! Loaded from TOML, YAML or JSON (picked by file extension), then overlaid
//! with environment variables:
//!
//! | Variable | Overrides |
//! |---|---|
//! | `LLM_ENDPOINT` | `llm.endpoint` |
//! | `LLM_MODEL` | `llm.model` |
//! | `LLM_API_KEY` | `llm.api_key` |
//! | `HIS_API_BASE_URL` | `his.base_url` |
//! | value of `his.token_env` (default `SPECIALTY_API_TOKEN`) | `his.token` |
//!
//! ```toml
//! [llm]
//! endpoint = "http://localhost:1234/v1"
//! model = "local-model"
//! temperature = 0.7
//! max_tokens = 800
//!
//! [his]
//! base_url = "http://eserver/api"
//! token_env = "SPECIALTY_API_TOKEN"
//!
//! [agent]
//! history_window = 6
//! specialty_shortcut = true
//! ```
//!
//! Every section and field is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use smartclinic_common::client::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use smartclinic_common::{Config, RetryConfig};
use smartclinic_tools::his::{self, HisConfig};

pub const ENV_LLM_ENDPOINT: &str = "LLM_ENDPOINT";
pub const ENV_LLM_MODEL: &str = "LLM_MODEL";
pub const ENV_LLM_API_KEY: &str = "LLM_API_KEY";
pub const ENV_HIS_BASE_URL: &str = "HIS_API_BASE_URL";
pub const DEFAULT_TOKEN_ENV: &str = "SPECIALTY_API_TOKEN";

/// Fatal configuration problems, reported at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported config file format: {}. Use .toml, .yaml, .yml or .json", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

type Result<T> = std::result::Result<T, ConfigError>;

/// Language-model endpoint settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible base URL; `/chat/completions` is appended.
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<SecretString>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    /// Retries for transient failures. Zero means a single attempt.
    pub max_retries: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 800,
            timeout_seconds: 60,
            max_retries: 0,
        }
    }
}

/// HIS connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HisSettings {
    pub base_url: String,
    /// Environment variable the bearer token is read from.
    pub token_env: String,
    /// Token given directly in the file. The environment variable wins.
    pub token: Option<SecretString>,
    pub timeout_seconds: u64,
}

impl Default for HisSettings {
    fn default() -> Self {
        Self {
            base_url: his::DEFAULT_BASE_URL.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            token: None,
            timeout_seconds: his::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

/// Behaviour of the ReAct loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Number of most recent turns shown to the model.
    pub history_window: usize,
    /// Route specialty questions straight to the specialty tool.
    pub specialty_shortcut: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            history_window: 6,
            specialty_shortcut: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub llm: LlmSettings,
    pub his: HisSettings,
    pub agent: AgentSettings,
}

impl AgentConfig {
    /// Reads `path` (if given) or starts from defaults, applies the process
    /// environment and validates the result.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be loaded or the final
    /// configuration is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load from file based on extension
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or has an
    /// unsupported extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let parse: fn(&str) -> std::result::Result<Self, String> =
            match path.extension().and_then(|s| s.to_str()) {
                Some("toml") => |s| toml::from_str(s).map_err(|e| e.to_string()),
                Some("yaml" | "yml") => |s| serde_yaml::from_str(s).map_err(|e| e.to_string()),
                Some("json") => |s| serde_json::from_str(s).map_err(|e| e.to_string()),
                _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
            };

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Loaded configuration from {}", path.display());
        parse(&contents).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Overlays the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Overlays variables returned by `lookup`. Blank values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = get(ENV_LLM_ENDPOINT) {
            debug!("{ENV_LLM_ENDPOINT} overrides llm.endpoint");
            self.llm.endpoint = endpoint;
        }
        if let Some(model) = get(ENV_LLM_MODEL) {
            self.llm.model = model;
        }
        if let Some(key) = get(ENV_LLM_API_KEY) {
            self.llm.api_key = Some(SecretString::from(key));
        }
        if let Some(base_url) = get(ENV_HIS_BASE_URL) {
            debug!("{ENV_HIS_BASE_URL} overrides his.base_url");
            self.his.base_url = base_url;
        }
        if let Some(token) = get(&self.his.token_env) {
            self.his.token = Some(SecretString::from(token));
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.llm.endpoint).map_err(|e| {
            ConfigError::Invalid(format!("llm.endpoint '{}': {e}", self.llm.endpoint))
        })?;
        Url::parse(&self.his.base_url).map_err(|e| {
            ConfigError::Invalid(format!("his.base_url '{}': {e}", self.his.base_url))
        })?;

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }
        if self.agent.history_window == 0 {
            return Err(ConfigError::Invalid(
                "agent.history_window must be at least 1".into(),
            ));
        }
        if self.llm.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "llm.timeout_seconds must be at least 1".into(),
            ));
        }
        if self.his.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "his.timeout_seconds must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Client configuration for the language model.
    #[must_use]
    pub fn llm_config(&self) -> Config {
        let mut config = Config::new(self.llm.model.clone())
            .with_base_url(self.llm.endpoint.clone())
            .with_temperature(self.llm.temperature)
            .with_max_tokens(self.llm.max_tokens)
            .with_timeout(self.llm.timeout_seconds)
            .with_retry_config(RetryConfig {
                max_retries: self.llm.max_retries,
                ..RetryConfig::default()
            });
        config.api_key.clone_from(&self.llm.api_key);
        config
    }

    /// Connection settings for the HIS client.
    #[must_use]
    pub fn his_config(&self) -> HisConfig {
        HisConfig {
            base_url: self.his.base_url.clone(),
            token: self.his.token.clone(),
            timeout: Duration::from_secs(self.his.timeout_seconds),
        }
    }
}
