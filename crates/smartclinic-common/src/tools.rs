//! Tool schemas, invocation requests and tool results.
//!
//! A [`ToolSchema`] is static metadata: the tool's name, what it does, which
//! parameters it needs and which it can fill in on its own. The reasoning step
//! produces a [`ToolInvocationRequest`]; the registry checks it against the
//! schema and either executes the tool or short-circuits to a
//! [`ToolResult::ParameterPrompt`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Local, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Ordered mapping of parameter name to value.
pub type ToolParameters = BTreeMap<String, String>;

/// Date format used for every date-valued parameter.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Returns true if `value` carries something other than whitespace.
fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// A parameter the tool cannot run without.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct RequiredParam {
    /// Key used in the parameter map.
    pub name: String,
    /// Human label shown when asking the user for it.
    pub label: String,
    /// Example value shown next to the label.
    pub example: String,
}

/// Default for an optional parameter.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ParamDefault {
    /// A fixed value.
    Literal(String),
    /// The current local date as `YYYY-MM-DD`.
    Today,
}

impl ParamDefault {
    /// Resolves the default against the given date.
    #[must_use]
    pub fn resolve_on(&self, today: NaiveDate) -> String {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Today => today.format(DATE_FORMAT).to_string(),
        }
    }

    /// Resolves the default against the current local date.
    #[must_use]
    pub fn resolve(&self) -> String {
        self.resolve_on(Local::now().date_naive())
    }
}

/// A parameter the tool can run without.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct OptionalParam {
    /// Key used in the parameter map.
    pub name: String,
    /// Human label.
    pub label: String,
    /// Value injected when the caller did not supply one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ParamDefault>,
}

/// Static description of a tool and its parameters.
///
/// # Examples
///
/// ```
/// use smartclinic_common::{ParamDefault, ToolParameters, ToolSchema};
///
/// let schema = ToolSchema::builder()
///     .tool_name("get_session_slots")
///     .description("Available slots of a doctor session")
///     .build()
///     .require("resource_id", "Doctor/Resource ID", "5")
///     .require("session_id", "Session ID", "12")
///     .optional("session_date", "Session date", Some(ParamDefault::Today));
///
/// let params = ToolParameters::new();
/// assert!(!schema.is_satisfied_by(&params));
/// assert_eq!(schema.missing_params(&params).len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder, Eq, PartialEq)]
pub struct ToolSchema {
    /// Unique tool name the model refers to.
    #[builder(setter(into))]
    pub tool_name: String,
    /// What the tool does, shown to the model.
    #[builder(setter(into))]
    pub description: String,
    /// Parameters that must be present and non-empty.
    #[builder(default)]
    pub required_params: Vec<RequiredParam>,
    /// Parameters that may be omitted.
    #[builder(default)]
    pub optional_params: Vec<OptionalParam>,
}

impl ToolSchema {
    /// Adds a required parameter.
    #[must_use]
    pub fn require(
        mut self,
        name: impl Into<String>,
        label: impl Into<String>,
        example: impl Into<String>,
    ) -> Self {
        self.required_params.push(RequiredParam {
            name: name.into(),
            label: label.into(),
            example: example.into(),
        });
        self
    }

    /// Adds an optional parameter with an optional default.
    #[must_use]
    pub fn optional(
        mut self,
        name: impl Into<String>,
        label: impl Into<String>,
        default: Option<ParamDefault>,
    ) -> Self {
        self.optional_params.push(OptionalParam {
            name: name.into(),
            label: label.into(),
            default,
        });
        self
    }

    /// Names of the required parameters, in declaration order.
    #[must_use]
    pub fn required_names(&self) -> Vec<&str> {
        self.required_params.iter().map(|p| p.name.as_str()).collect()
    }

    /// Names of every declared parameter, required first.
    #[must_use]
    pub fn parameter_names(&self) -> Vec<&str> {
        self.required_params
            .iter()
            .map(|p| p.name.as_str())
            .chain(self.optional_params.iter().map(|p| p.name.as_str()))
            .collect()
    }

    /// Required parameters absent or blank in `parameters`.
    #[must_use]
    pub fn missing_params(&self, parameters: &ToolParameters) -> Vec<&RequiredParam> {
        self.required_params
            .iter()
            .filter(|p| !parameters.get(&p.name).is_some_and(|v| is_present(v)))
            .collect()
    }

    /// True iff every required parameter is present and non-empty.
    #[must_use]
    pub fn is_satisfied_by(&self, parameters: &ToolParameters) -> bool {
        self.missing_params(parameters).is_empty()
    }

    /// Fills absent or blank optional parameters from their defaults, using
    /// `today` for date defaults. Supplied values are never overwritten.
    pub fn apply_defaults_on(&self, parameters: &mut ToolParameters, today: NaiveDate) {
        for param in &self.optional_params {
            let Some(default) = &param.default else {
                continue;
            };
            if parameters.get(&param.name).is_some_and(|v| is_present(v)) {
                continue;
            }
            let value = default.resolve_on(today);
            debug!("{}: defaulting {} to {value:?}", self.tool_name, param.name);
            parameters.insert(param.name.clone(), value);
        }
    }

    /// Fills absent optional parameters from their defaults using the current
    /// local date.
    pub fn apply_defaults(&self, parameters: &mut ToolParameters) {
        self.apply_defaults_on(parameters, Local::now().date_naive());
    }

    /// User-facing request for the given parameters, one bullet per parameter
    /// with its example value.
    #[must_use]
    pub fn prompt_text(&self, params: &[&RequiredParam]) -> String {
        let action = self.description.trim_end_matches('.');
        let mut chars = action.chars();
        let action = chars.next().map_or_else(String::new, |first| {
            first.to_lowercase().chain(chars).collect::<String>()
        });
        let mut text = format!("To {action} I need a few more details. Please provide:");
        for param in params {
            text.push_str(&format!(
                "\n- {} (`{}`, e.g. {})",
                param.label, param.name, param.example
            ));
        }
        text
    }

    /// User-facing request enumerating every required parameter.
    #[must_use]
    pub fn prompt_for_all(&self) -> String {
        let all: Vec<&RequiredParam> = self.required_params.iter().collect();
        self.prompt_text(&all)
    }

    /// One-line summary for the model's tool catalog.
    #[must_use]
    pub fn catalog_line(&self) -> String {
        let required = self.required_names().join(", ");
        let optional: Vec<&str> = self.optional_params.iter().map(|p| p.name.as_str()).collect();
        format!(
            "- {}: {} (required: [{}], optional: [{}])",
            self.tool_name,
            self.description,
            required,
            optional.join(", ")
        )
    }
}

/// A request to run one tool with string parameters.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ToolInvocationRequest {
    /// Name of the tool to run.
    pub tool_name: String,
    /// Collected parameter values.
    #[serde(default)]
    pub parameters: ToolParameters,
}

impl ToolInvocationRequest {
    /// Creates a request with no parameters.
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters: ToolParameters::new(),
        }
    }

    /// Creates a request with the given parameters.
    pub fn with_parameters(tool_name: impl Into<String>, parameters: ToolParameters) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
        }
    }

    /// Adds or replaces a parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Value of a parameter, if present.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Merges `newer` into this request. Non-empty newer values win; blank
    /// newer values never erase an existing one.
    pub fn merge(&mut self, newer: &ToolParameters) {
        for (name, value) in newer {
            if is_present(value) {
                self.parameters.insert(name.clone(), value.trim().to_string());
            }
        }
    }
}

impl fmt::Display for ToolInvocationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.tool_name)?;
        for (i, (name, value)) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, ")")
    }
}

/// Outcome of invoking a tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    /// The HIS answered; the payload is its JSON, treated as opaque.
    Ok {
        /// Response body.
        payload: serde_json::Value,
    },
    /// Required parameters are missing; nothing was sent.
    ParameterPrompt {
        /// Names of the missing parameters.
        missing_params: Vec<String>,
        /// Text asking the user for them.
        message: String,
    },
    /// The call failed.
    Error {
        /// What went wrong.
        message: String,
    },
}

impl ToolResult {
    /// Successful result carrying `payload`.
    #[must_use]
    pub const fn ok(payload: serde_json::Value) -> Self {
        Self::Ok { payload }
    }

    /// Failed result carrying `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether the payload of an `Ok` result is an object with an `error` key.
    #[must_use]
    pub fn reports_error(&self) -> bool {
        matches!(self, Self::Ok { payload } if payload.get("error").is_some())
    }

    /// Payload of an `Ok` result.
    #[must_use]
    pub const fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Ok { payload } => Some(payload),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    fn walkin_schema() -> ToolSchema {
        ToolSchema::builder()
            .tool_name("create_walkin")
            .description("Create a walk-in appointment")
            .build()
            .require("resource_id", "Doctor/Resource ID", "5")
            .require("session_id", "Session ID", "12")
            .require("session_date", "Appointment date", "2024-05-01")
            .require("from_time", "Preferred time", "09:30")
            .require("patient_id", "Patient ID", "1001")
    }

    fn params(pairs: &[(&str, &str)]) -> ToolParameters {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let schema = walkin_schema();
        let supplied = params(&[("resource_id", "5"), ("session_id", "   ")]);

        let missing: Vec<&str> = schema
            .missing_params(&supplied)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(
            missing,
            vec!["session_id", "session_date", "from_time", "patient_id"]
        );
    }

    #[test]
    fn test_prompt_enumerates_labels_and_examples() {
        let prompt = walkin_schema().prompt_for_all();
        assert!(prompt.contains("Doctor/Resource ID"));
        assert!(prompt.contains("Session ID"));
        assert!(prompt.contains("Appointment date"));
        assert!(prompt.contains("Preferred time"));
        assert!(prompt.contains("Patient ID"));
        assert!(prompt.contains("e.g. 09:30"));
        assert!(prompt.starts_with("To create a walk-in appointment"));
    }

    #[test]
    fn test_defaults_do_not_overwrite_supplied_values() {
        let schema = ToolSchema::builder()
            .tool_name("find_appointment_resources")
            .description("Find bookable doctors")
            .build()
            .optional("date_from", "Start date", Some(ParamDefault::Today))
            .optional("resource_type", "Resource type", Some(ParamDefault::Literal("1".into())))
            .optional("clinic_id", "Clinic ID", None);

        let today = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let mut supplied = params(&[("resource_type", "2")]);
        schema.apply_defaults_on(&mut supplied, today);

        assert_eq!(supplied.get("date_from").unwrap(), "2024-03-09");
        assert_eq!(supplied.get("resource_type").unwrap(), "2");
        assert!(!supplied.contains_key("clinic_id"));
    }

    #[test]
    fn test_merge_newer_non_empty_values_win() {
        let mut request = ToolInvocationRequest::new("create_walkin")
            .with_parameter("resource_id", "5")
            .with_parameter("session_id", "12");

        request.merge(&params(&[
            ("session_id", "14"),
            ("resource_id", ""),
            ("patient_id", " 1001 "),
        ]));

        assert_eq!(request.parameter("resource_id"), Some("5"));
        assert_eq!(request.parameter("session_id"), Some("14"));
        assert_eq!(request.parameter("patient_id"), Some("1001"));
    }

    #[test]
    fn test_request_display() {
        let request = ToolInvocationRequest::new("create_visit").with_parameter("appointment_id", "1820");
        assert_eq!(request.to_string(), "create_visit(appointment_id=1820)");
    }

    #[test]
    fn test_reports_error_only_for_error_key() {
        assert!(ToolResult::ok(serde_json::json!({"error": "boom"})).reports_error());
        assert!(!ToolResult::ok(serde_json::json!({"Codes": {}})).reports_error());
        assert!(!ToolResult::ok(serde_json::json!([1, 2])).reports_error());
        assert!(!ToolResult::error("boom").reports_error());
    }

    #[test]
    fn test_tool_result_serialization() {
        let result = ToolResult::ParameterPrompt {
            missing_params: vec!["visit_id".to_string()],
            message: "Please provide the visit ID".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "parameter_prompt");
        assert_eq!(json["missing_params"][0], "visit_id");
    }

    #[test]
    fn test_catalog_line() {
        let line = walkin_schema().catalog_line();
        assert!(line.starts_with("- create_walkin: Create a walk-in appointment"));
        assert!(line.contains("required: [resource_id, session_id, session_date, from_time, patient_id]"));
    }
}

#[cfg(test)]
mod proptests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn validation_is_idempotent(values in proptest::collection::btree_map("[a-z_]{1,12}", "[ a-z0-9]{0,6}", 0..8)) {
            let schema = ToolSchema::builder()
                .tool_name("t")
                .description("t")
                .build()
                .require("visit_id", "Visit ID", "1")
                .require("patient_id", "Patient ID", "2");

            let first = schema.is_satisfied_by(&values);
            let second = schema.is_satisfied_by(&values);
            prop_assert_eq!(first, second);
            prop_assert_eq!(first, schema.missing_params(&values).is_empty());
        }

        #[test]
        fn defaults_are_idempotent(seed in proptest::collection::btree_map("[a-z_]{1,8}", "[a-z0-9]{0,4}", 0..4)) {
            let schema = ToolSchema::builder()
                .tool_name("t")
                .description("t")
                .build()
                .optional("date_from", "From", Some(ParamDefault::Today));
            let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

            let mut once = seed.clone();
            schema.apply_defaults_on(&mut once, today);
            let mut twice = once.clone();
            schema.apply_defaults_on(&mut twice, today);
            prop_assert_eq!(once, twice);
        }
    }
}
