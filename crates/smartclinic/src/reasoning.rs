//! The reasoning step: one model call that decides between a direct answer
//! and a single tool invocation, and the synthesis call that turns a tool
//! payload into prose.
//!
//! The model is asked for a JSON object. Its reply is parsed leniently:
//! `<think>` blocks are removed, the outermost `{...}` span is taken, scalar
//! parameter values are stringified and empty ones dropped. Anything that
//! still does not form a valid decision becomes a [`ReasoningDecision::DirectAnswer`]
//! carrying the model's own text, so parsing never fails.

use std::fmt::Write as _;
use std::sync::LazyLock;

use log::{debug, error, info, warn};
use regex::Regex;
use serde_json::Value;

use smartclinic_client::LLMClient;
use smartclinic_common::{
    ConversationHistory, Message, ReasoningDecision, ToolInvocationRequest, ToolParameters,
    ToolSchema,
};

use crate::error::AgentError;
use crate::session::PendingTool;

/// Reply used whenever the language model cannot be reached or returns
/// nothing usable.
pub const MODEL_UNAVAILABLE_MESSAGE: &str = "I'm sorry, the assistant is temporarily unavailable. Please try again in a moment.";

/// Reply used when the model answered with nothing at all.
pub const REPHRASE_MESSAGE: &str = "I'm having trouble understanding how to help with your query. Could you please rephrase your question?";

/// Tool the specialty shortcut routes to.
pub const SPECIALTY_TOOL: &str = "get_doctor_specialties";

/// Lower-case substrings that send a message straight to [`SPECIALTY_TOOL`].
pub const SPECIALTY_KEYWORDS: &[&str] = &[
    "specialty",
    "specialties",
    "speciality",
    "specialities",
    "doctors",
    "department",
];

/// Default number of turns shown to the model.
pub const DEFAULT_HISTORY_WINDOW: usize = 6;

/// Longest tool payload, in characters, passed to the synthesis call.
const MAX_OBSERVATION_CHARS: usize = 12_000;

const REASONING_INSTRUCTIONS: &str = r#"You are an intelligent hospital assistant connected to the hospital information system (HIS).
Analyze the user's latest message and decide whether to call ONE of the tools below or to answer directly.

Respond with a single JSON object and nothing else.

To use a tool:
{"reasoning": "your step-by-step reasoning", "use_tool": true, "action": {"action_type": "<tool name>", "parameters": {"<parameter>": "<value>"}}}

To answer directly:
{"reasoning": "your step-by-step reasoning", "use_tool": false, "direct_answer": "your answer to the user"}

Only fill in parameter values the user actually gave. Never invent IDs; leave missing values out and the user will be asked for them."#;

const SYNTHESIS_INSTRUCTIONS: &str = "You are an intelligent hospital assistant that helps users with their queries.
Based on the user's query and the data retrieved from the hospital information system, formulate a helpful, concise and informative response to the user's original query.
Provide only the final answer without mentioning the reasoning process or the fact that you used a tool.";

#[allow(clippy::unwrap_used)]
static THINK_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

#[allow(clippy::unwrap_used)]
static JSON_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Removes `<think>...</think>` sections some local models emit.
#[must_use]
pub fn strip_think_tags(content: &str) -> String {
    let result = THINK_TAGS.replace_all(content, "");
    result.replace("</think>", "").trim().to_string()
}

/// Stringifies a JSON parameter value. `null`, blank strings and
/// non-scalar values yield `None`.
fn parameter_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// The `direct_answer` field when usable, else the model text itself.
fn fallback_answer(content: &str, direct_answer: Option<&str>) -> ReasoningDecision {
    let text = direct_answer
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(content);
    if text.is_empty() {
        ReasoningDecision::DirectAnswer(REPHRASE_MESSAGE.to_string())
    } else {
        ReasoningDecision::DirectAnswer(text.to_string())
    }
}

/// Turns raw model output into a decision. Never fails.
///
/// ```
/// use smartclinic::reasoning::parse_decision;
/// use smartclinic_common::{ReasoningDecision, ToolSchema};
///
/// let catalog = vec![ToolSchema::builder()
///     .tool_name("create_visit")
///     .description("Create a visit from an appointment")
///     .build()];
/// let raw = r#"Sure! {"use_tool": true, "action": {"action_type": "create_visit", "parameters": {"appointment_id": 1820}}}"#;
///
/// let ReasoningDecision::UseTool(request) = parse_decision(raw, &catalog) else {
///     unreachable!()
/// };
/// assert_eq!(request.parameter("appointment_id"), Some("1820"));
/// ```
#[must_use]
pub fn parse_decision(raw: &str, catalog: &[ToolSchema]) -> ReasoningDecision {
    let content = strip_think_tags(raw);
    let fallback = |direct_answer: Option<&str>| fallback_answer(&content, direct_answer);

    let Some(block) = JSON_BLOCK.find(&content) else {
        debug!("Model output carries no JSON object");
        return fallback(None);
    };

    let parsed: Value = match serde_json::from_str(block.as_str()) {
        Ok(value) => value,
        Err(e) => {
            warn!("Could not parse model JSON: {e}");
            return fallback(None);
        }
    };

    if let Some(reasoning) = parsed.get("reasoning").and_then(Value::as_str) {
        debug!("Model reasoning: {reasoning}");
    }
    let direct_answer = parsed.get("direct_answer").and_then(Value::as_str);

    if !is_truthy(parsed.get("use_tool")) {
        return fallback(direct_answer);
    }

    let Some(action) = parsed.get("action") else {
        warn!("Model asked for a tool without an action");
        return fallback(direct_answer);
    };
    let tool_name = action
        .get("action_type")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();

    if !catalog.iter().any(|schema| schema.tool_name == tool_name) {
        warn!("Model selected unknown tool '{tool_name}'");
        return fallback(direct_answer);
    }

    let parameters: ToolParameters = action
        .get("parameters")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(name, value)| Some((name.clone(), parameter_value(value)?)))
                .collect()
        })
        .unwrap_or_default();

    ReasoningDecision::UseTool(ToolInvocationRequest::with_parameters(tool_name, parameters))
}

/// Decides what to do with a user message and phrases tool results.
pub struct Reasoner<C: LLMClient> {
    client: C,
    history_window: usize,
    specialty_shortcut: bool,
}

impl<C: LLMClient> Reasoner<C> {
    pub const fn new(client: C) -> Self {
        Self {
            client,
            history_window: DEFAULT_HISTORY_WINDOW,
            specialty_shortcut: true,
        }
    }

    #[must_use]
    pub const fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    #[must_use]
    pub const fn with_specialty_shortcut(mut self, enabled: bool) -> Self {
        self.specialty_shortcut = enabled;
        self
    }

    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Messages sent to the model for the decision call.
    #[must_use]
    pub fn reasoning_messages(
        &self,
        history: &ConversationHistory,
        catalog: &[ToolSchema],
        pending: Option<&PendingTool>,
    ) -> Vec<Message> {
        let mut system = String::from(REASONING_INSTRUCTIONS);
        system.push_str("\n\nAvailable tools:\n");
        for schema in catalog {
            system.push_str(&schema.catalog_line());
            system.push('\n');
        }

        if let Some(pending) = pending {
            let collected = if pending.request.parameters.is_empty() {
                "nothing yet".to_string()
            } else {
                pending.request.to_string()
            };
            let _ = write!(
                system,
                "\nThe user is currently providing details for `{tool}`. Collected so far: {collected}. Still missing: {missing}.\nIf the latest message supplies any of them, call `{tool}` again with the values it contains.",
                tool = pending.tool_name(),
                missing = pending.missing.join(", "),
            );
        }

        let mut messages = vec![Message::system(system)];
        messages.extend(history.to_messages(self.history_window));
        messages
    }

    fn shortcut(
        &self,
        history: &ConversationHistory,
        catalog: &[ToolSchema],
        pending: Option<&PendingTool>,
    ) -> Option<ReasoningDecision> {
        if !self.specialty_shortcut || pending.is_some() {
            return None;
        }
        if !catalog.iter().any(|schema| schema.tool_name == SPECIALTY_TOOL) {
            return None;
        }

        let message = history.last_user_message()?;
        let lowered = message.to_lowercase();
        SPECIALTY_KEYWORDS
            .iter()
            .any(|keyword| lowered.contains(keyword))
            .then(|| {
                ReasoningDecision::UseTool(
                    ToolInvocationRequest::new(SPECIALTY_TOOL).with_parameter("query", message),
                )
            })
    }

    /// Sends `messages` and returns the cleaned reply text.
    async fn complete(&self, messages: Vec<Message>) -> Result<String, AgentError> {
        let request = self.client.config().chat_request(messages);
        let response = self
            .client
            .chat(&request)
            .await
            .map_err(|e| AgentError::ModelUnavailable(e.to_string()))?;
        debug!("Model replied: {}", response.content());
        Ok(strip_think_tags(response.content()))
    }

    /// Decides between a direct answer and one tool call.
    ///
    /// An unparseable reply still yields a decision; only a failed model
    /// call is an error.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ModelUnavailable`] if the model could not be
    /// reached or returned an invalid response.
    pub async fn decide(
        &self,
        history: &ConversationHistory,
        catalog: &[ToolSchema],
        pending: Option<&PendingTool>,
    ) -> Result<ReasoningDecision, AgentError> {
        if let Some(decision) = self.shortcut(history, catalog, pending) {
            info!("Specialty keyword found, skipping the model");
            return Ok(decision);
        }

        let messages = self.reasoning_messages(history, catalog, pending);
        let raw = self.complete(messages).await?;
        Ok(parse_decision(&raw, catalog))
    }

    /// Messages sent to the model for the synthesis call.
    #[must_use]
    pub fn synthesis_messages(
        user_query: &str,
        request: &ToolInvocationRequest,
        payload: &Value,
    ) -> Vec<Message> {
        let mut observation =
            serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
        if observation.chars().count() > MAX_OBSERVATION_CHARS {
            observation = observation.chars().take(MAX_OBSERVATION_CHARS).collect();
            observation.push_str("\n... (truncated)");
        }

        let content = format!(
            "User query: {user_query}\n\nRequest: {request}\n\nData:\n{observation}\n\nBased on this information, provide a helpful answer to the user's original query."
        );
        vec![Message::system(SYNTHESIS_INSTRUCTIONS), Message::user(content)]
    }

    /// Turns a tool payload into the final answer.
    pub async fn synthesize(
        &self,
        user_query: &str,
        request: &ToolInvocationRequest,
        payload: &Value,
    ) -> String {
        let messages = Self::synthesis_messages(user_query, request, payload);
        match self.complete(messages).await {
            Ok(answer) if !answer.is_empty() => answer,
            Ok(_) => {
                warn!("Model returned an empty synthesis");
                MODEL_UNAVAILABLE_MESSAGE.to_string()
            }
            Err(e) => {
                error!("{e}");
                MODEL_UNAVAILABLE_MESSAGE.to_string()
            }
        }
    }
}
