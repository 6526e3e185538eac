//! # smartclinic-tools
//!
//! Tool registry and hospital information system (HIS) tools for the
//! SmartClinic assistant.
//!
//! ## Core Components
//!
//! - [`ToolImplementation`]: a named tool with a static [`ToolSchema`] and an
//!   async handler
//! - [`ToolRegistry`]: thread-safe map of tool name to handler that also acts
//!   as the parameter validator
//! - [`his`]: the HIS HTTP client, the thirteen HIS tools and the specialty
//!   query classifier
//!
//! ## Example: Registering and Executing a Tool
//!
//! ```rust
//! use async_trait::async_trait;
//! use serde_json::json;
//! use smartclinic_common::{ToolInvocationRequest, ToolParameters, ToolResult, ToolSchema};
//! use smartclinic_tools::{ToolImplementation, ToolRegistry};
//!
//! struct WardLookup;
//!
//! #[async_trait]
//! impl ToolImplementation for WardLookup {
//!     fn schema(&self) -> ToolSchema {
//!         ToolSchema::builder()
//!             .tool_name("ward_lookup")
//!             .description("Find the ward of an admitted patient")
//!             .build()
//!             .require("patient_id", "Patient ID", "3598")
//!     }
//!
//!     async fn execute(&self, parameters: &ToolParameters) -> ToolResult {
//!         ToolResult::ok(json!({"ward": "B2", "patient": parameters["patient_id"]}))
//!     }
//! }
//!
//! # async fn example() -> Result<(), smartclinic_tools::ToolError> {
//! let registry = ToolRegistry::new();
//! registry.register_tool(WardLookup);
//!
//! // Missing parameters short-circuit to a prompt; the handler is not called
//! let result = registry.execute(&ToolInvocationRequest::new("ward_lookup")).await?;
//! assert!(matches!(result, ToolResult::ParameterPrompt { .. }));
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! The [`ToolRegistry`] uses `DashMap` and is cheap to clone, so one registry
//! can serve every session.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, info};

use smartclinic_common::{RequiredParam, ToolInvocationRequest, ToolParameters, ToolResult, ToolSchema};

pub mod error;
pub mod his;

pub use error::ToolError;

/// A tool the assistant can invoke.
///
/// Handlers never fail with a Rust error: transport problems are reported as
/// [`ToolResult::Error`] so a failed call can never end a conversation.
#[async_trait]
pub trait ToolImplementation: Send + Sync {
    /// Static description of the tool and its parameters.
    fn schema(&self) -> ToolSchema;

    /// Run the tool. Required parameters are guaranteed present and optional
    /// defaults already applied when called through [`ToolRegistry::execute`].
    async fn execute(&self, parameters: &ToolParameters) -> ToolResult;
}

/// Registry of tools keyed by name, doubling as the parameter validator.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: Arc<DashMap<String, Arc<dyn ToolImplementation>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: Arc::new(DashMap::new()),
        }
    }

    /// Registers a shared tool, replacing any tool with the same name.
    pub fn register(&self, tool: Arc<dyn ToolImplementation>) {
        let name = tool.schema().tool_name;
        debug!("Registering tool '{name}'");
        self.tools.insert(name, tool);
    }

    pub fn register_tool<T: ToolImplementation + 'static>(&self, tool: T) {
        self.register(Arc::new(tool));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolImplementation>> {
        self.tools.get(name).map(|r| r.value().clone())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, sorted.
    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.iter().map(|t| t.key().clone()).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Every schema, sorted by tool name.
    #[must_use]
    pub fn catalog(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.iter().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.tool_name.cmp(&b.tool_name));
        schemas
    }

    fn tool(&self, name: &str) -> Result<Arc<dyn ToolImplementation>, ToolError> {
        self.get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// Schema of `tool_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] for unregistered names.
    pub fn requirements_for(&self, tool_name: &str) -> Result<ToolSchema, ToolError> {
        Ok(self.tool(tool_name)?.schema())
    }

    /// True iff every required parameter is present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] for unregistered names. A failed
    /// validation is `Ok(false)`, never an error.
    pub fn validate(&self, tool_name: &str, parameters: &ToolParameters) -> Result<bool, ToolError> {
        Ok(self.requirements_for(tool_name)?.is_satisfied_by(parameters))
    }

    /// Names of the required parameters missing from `parameters`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] for unregistered names.
    pub fn missing_params(
        &self,
        tool_name: &str,
        parameters: &ToolParameters,
    ) -> Result<Vec<String>, ToolError> {
        let schema = self.requirements_for(tool_name)?;
        Ok(schema
            .missing_params(parameters)
            .into_iter()
            .map(|p| p.name.clone())
            .collect())
    }

    /// Human-readable enumeration of every required parameter with examples.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] for unregistered names.
    pub fn prompt_for(&self, tool_name: &str) -> Result<String, ToolError> {
        Ok(self.requirements_for(tool_name)?.prompt_for_all())
    }

    /// Same as [`Self::prompt_for`], restricted to the parameters still missing.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] for unregistered names.
    pub fn prompt_for_missing(
        &self,
        tool_name: &str,
        parameters: &ToolParameters,
    ) -> Result<String, ToolError> {
        let schema = self.requirements_for(tool_name)?;
        let missing = schema.missing_params(parameters);
        Ok(schema.prompt_text(&missing))
    }

    /// Returns `parameters` with optional defaults filled in.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] for unregistered names.
    pub fn apply_defaults(
        &self,
        tool_name: &str,
        parameters: &ToolParameters,
    ) -> Result<ToolParameters, ToolError> {
        let mut filled = parameters.clone();
        self.requirements_for(tool_name)?.apply_defaults(&mut filled);
        Ok(filled)
    }

    /// Applies defaults, validates, and either runs the tool or returns a
    /// [`ToolResult::ParameterPrompt`] without calling it.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] for unregistered names.
    pub async fn execute(&self, request: &ToolInvocationRequest) -> Result<ToolResult, ToolError> {
        let tool = self.tool(&request.tool_name)?;
        let schema = tool.schema();

        let mut parameters = request.parameters.clone();
        schema.apply_defaults(&mut parameters);

        let missing: Vec<&RequiredParam> = schema.missing_params(&parameters);
        if !missing.is_empty() {
            info!(
                "{} is missing {} required parameter(s)",
                request.tool_name,
                missing.len()
            );
            return Ok(ToolResult::ParameterPrompt {
                missing_params: missing.iter().map(|p| p.name.clone()).collect(),
                message: schema.prompt_text(&missing),
            });
        }

        info!("Executing tool {}", request.tool_name);
        Ok(tool.execute(&parameters).await)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use serde_json::json;
    use smartclinic_common::ParamDefault;
    use smartclinic_common::tools::DATE_FORMAT;

    /// Counts calls and echoes its parameters back.
    struct EchoTool {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolImplementation for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema::builder()
                .tool_name("get_session_slots")
                .description("List the free slots of a doctor session")
                .build()
                .require("resource_id", "Doctor/Resource ID", "2")
                .require("session_id", "Session ID", "363")
                .optional("session_date", "Session date", Some(ParamDefault::Today))
        }

        async fn execute(&self, parameters: &ToolParameters) -> ToolResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ToolResult::ok(json!(parameters))
        }
    }

    fn registry_with_counter() -> (ToolRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ToolRegistry::new();
        registry.register_tool(EchoTool {
            calls: calls.clone(),
        });
        (registry, calls)
    }

    fn params(pairs: &[(&str, &str)]) -> ToolParameters {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();

        assert!(matches!(
            registry.requirements_for("nope"),
            Err(ToolError::NotFound(name)) if name == "nope"
        ));
        assert!(registry.validate("nope", &ToolParameters::new()).is_err());
        assert!(registry.prompt_for("nope").is_err());
    }

    #[test]
    fn test_validate_returns_false_instead_of_error() {
        let (registry, _) = registry_with_counter();

        assert!(!registry.validate("get_session_slots", &ToolParameters::new()).unwrap());
        assert!(
            registry
                .validate(
                    "get_session_slots",
                    &params(&[("resource_id", "2"), ("session_id", "363")])
                )
                .unwrap()
        );
    }

    #[test]
    fn test_prompt_for_missing_only_lists_missing() {
        let (registry, _) = registry_with_counter();
        let prompt = registry
            .prompt_for_missing("get_session_slots", &params(&[("resource_id", "2")]))
            .unwrap();

        assert!(prompt.contains("Session ID"));
        assert!(!prompt.contains("Doctor/Resource ID"));
        assert_eq!(
            registry
                .missing_params("get_session_slots", &params(&[("resource_id", "2")]))
                .unwrap(),
            vec!["session_id".to_string()]
        );
    }

    #[test]
    fn test_apply_defaults_fills_today() {
        let (registry, _) = registry_with_counter();
        let filled = registry
            .apply_defaults("get_session_slots", &ToolParameters::new())
            .unwrap();

        let date = filled.get("session_date").unwrap();
        assert_eq!(
            chrono::NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            chrono::Local::now().date_naive()
        );
    }

    #[tokio::test]
    async fn test_execute_short_circuits_without_calling_tool() {
        let (registry, calls) = registry_with_counter();

        let result = registry
            .execute(&ToolInvocationRequest::new("get_session_slots"))
            .await
            .unwrap();

        match result {
            ToolResult::ParameterPrompt {
                missing_params,
                message,
            } => {
                assert_eq!(missing_params, vec!["resource_id", "session_id"]);
                assert!(message.contains("Doctor/Resource ID"));
            }
            other => panic!("expected a parameter prompt, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_runs_tool_with_defaults() {
        let (registry, calls) = registry_with_counter();
        let request = ToolInvocationRequest::new("get_session_slots")
            .with_parameter("resource_id", "2")
            .with_parameter("session_id", "363");

        let result = registry.execute(&request).await.unwrap();

        let payload = result.payload().unwrap();
        assert_eq!(payload["resource_id"], "2");
        assert!(payload.get("session_date").is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute(&ToolInvocationRequest::new("launch_rocket"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: 'launch_rocket'");
    }

    #[test]
    fn test_catalog_is_sorted() {
        let registry = his::tool_registry(&Arc::new(
            his::HisClient::new(his::HisConfig::default()).unwrap(),
        ));

        let names: Vec<String> = registry.catalog().into_iter().map(|s| s.tool_name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 13);
        assert_eq!(registry.tool_names(), sorted);
    }
}
