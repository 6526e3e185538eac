use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, LazyLock};

use log::{debug, error, info, warn};
use regex::Regex;

use smartclinic_client::{LLMClient, OpenAIClient};
use smartclinic_common::{ReasoningDecision, ToolInvocationRequest, ToolParameters, ToolResult};
use smartclinic_tools::ToolRegistry;
use smartclinic_tools::his::{self, HisClient};

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::events::{AgentEvent, EventCallback};
use crate::reasoning::{MODEL_UNAVAILABLE_MESSAGE, Reasoner};
use crate::session::{AgentState, PendingTool, Session};

/// Reply used when a tool call failed or the HIS reported an error.
pub const TOOL_FAILURE_MESSAGE: &str = "I'm sorry, I couldn't retrieve that information from the hospital system right now. Please try again later.";

/// Reply to a message with no text in it.
pub const EMPTY_MESSAGE_REPLY: &str = "Please type a question, for example \"What specialties are available?\"";

#[allow(clippy::unwrap_used)]
static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b([a-z][a-z0-9_]*)\s*[=:]\s*("[^"]*"|'[^']*'|[^\s,;]+)"#).unwrap()
});

/// Collects `name=value` and `name: value` pairs for the given parameter
/// names. Names match case-insensitively; later pairs win.
///
/// ```
/// use smartclinic::agent::explicit_assignments;
///
/// let found = explicit_assignments(
///     "resource_id=2, session_id: 363 and from_time = 07:10:00",
///     &["resource_id", "session_id", "from_time", "patient_id"],
/// );
/// assert_eq!(found["resource_id"], "2");
/// assert_eq!(found["from_time"], "07:10:00");
/// assert!(!found.contains_key("patient_id"));
/// ```
#[must_use]
pub fn explicit_assignments(message: &str, names: &[&str]) -> ToolParameters {
    let mut found = ToolParameters::new();
    for captures in ASSIGNMENT.captures_iter(message) {
        let (Some(name), Some(value)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let Some(name) = names
            .iter()
            .find(|declared| declared.eq_ignore_ascii_case(name.as_str()))
        else {
            continue;
        };

        let value = value
            .as_str()
            .trim_matches(|c: char| c == '"' || c == '\'')
            .trim_end_matches(['.', '!', '?'])
            .trim();
        if !value.is_empty() {
            found.insert((*name).to_string(), value.to_string());
        }
    }
    found
}

/// Logs a turn failure: user-fixable ones at `info`, the rest at `error`.
fn report(err: &AgentError) {
    if err.is_recoverable_by_user() {
        info!("{err}");
    } else {
        error!("{err}");
    }
}

/// The ReAct controller.
///
/// One [`ReActAgent`] serves any number of sessions. Each call to
/// [`handle_turn`](Self::handle_turn) runs a single Reason, Act, Observe
/// pass and returns exactly one reply: a direct answer, a request for
/// missing parameters, or an answer synthesized from one tool result.
pub struct ReActAgent<C: LLMClient> {
    reasoner: Reasoner<C>,
    registry: ToolRegistry,
    event_callback: Option<EventCallback>,
}

impl ReActAgent<OpenAIClient> {
    /// Builds the language-model client, the HIS client and the tool
    /// registry from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or either client cannot be
    /// created.
    pub fn from_config(config: &AgentConfig) -> anyhow::Result<Self> {
        config.validate().map_err(AgentError::from)?;
        let client = OpenAIClient::new(config.llm_config())?;
        let his_client = HisClient::new(config.his_config())?;
        let registry = his::tool_registry(&Arc::new(his_client));
        info!(
            "Assistant ready: model '{}' at {}, {} HIS tools at {}",
            config.llm.model,
            config.llm.endpoint,
            registry.len(),
            config.his.base_url
        );

        Ok(Self::new(client, registry)
            .with_history_window(config.agent.history_window)
            .with_specialty_shortcut(config.agent.specialty_shortcut))
    }
}

impl<C: LLMClient> ReActAgent<C> {
    pub const fn new(client: C, registry: ToolRegistry) -> Self {
        Self {
            reasoner: Reasoner::new(client),
            registry,
            event_callback: None,
        }
    }

    #[must_use]
    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.reasoner = self.reasoner.with_history_window(turns);
        self
    }

    #[must_use]
    pub fn with_specialty_shortcut(mut self, enabled: bool) -> Self {
        self.reasoner = self.reasoner.with_specialty_shortcut(enabled);
        self
    }

    #[must_use]
    pub fn with_event_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(AgentEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static,
    {
        self.event_callback = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn reasoner(&self) -> &Reasoner<C> {
        &self.reasoner
    }

    async fn emit(&self, event: AgentEvent) {
        if let Some(callback) = &self.event_callback {
            callback(event).await;
        }
    }

    /// Values the user typed as `name=value` for the pending tool.
    fn pending_assignments(&self, pending: &PendingTool, message: &str) -> ToolParameters {
        match self.registry.requirements_for(pending.tool_name()) {
            Ok(schema) => explicit_assignments(message, &schema.parameter_names()),
            Err(e) => {
                warn!("{e}");
                ToolParameters::new()
            }
        }
    }

    /// Runs one Reason, Act, Observe pass and returns the reply.
    ///
    /// The user message and the reply are appended to the session history.
    /// Failures never escape: they become apology texts.
    pub async fn handle_turn(&self, session: &mut Session, message: &str) -> String {
        let message = message.trim();
        if message.is_empty() {
            return EMPTY_MESSAGE_REPLY.to_string();
        }

        info!("Session {}: {message}", session.id);
        session.history.push_user(message);
        session.state = AgentState::Reasoning;

        let explicit = session
            .pending
            .as_ref()
            .map(|pending| self.pending_assignments(pending, message))
            .unwrap_or_default();

        let catalog = self.registry.catalog();
        let decision = match self
            .reasoner
            .decide(&session.history, &catalog, session.pending.as_ref())
            .await
        {
            Ok(decision) => decision,
            Err(e) => return self.unavailable(session, &e).await,
        };
        debug!("Decision: {decision:?}");
        self.emit(AgentEvent::Reasoned(decision.clone())).await;

        let request = match (decision, session.pending.take()) {
            (ReasoningDecision::UseTool(chosen), Some(pending))
                if chosen.tool_name == pending.tool_name() =>
            {
                let mut merged = pending.request;
                merged.merge(&chosen.parameters);
                merged.merge(&explicit);
                merged
            }
            (_, Some(pending)) if !explicit.is_empty() => {
                info!(
                    "Explicit values given for '{}', continuing it",
                    pending.tool_name()
                );
                let mut merged = pending.request;
                merged.merge(&explicit);
                merged
            }
            (decision, pending) => {
                if let Some(pending) = pending {
                    info!("Abandoning pending tool '{}'", pending.tool_name());
                }
                match decision {
                    ReasoningDecision::UseTool(request) => request,
                    ReasoningDecision::DirectAnswer(answer) => {
                        return self.finish(session, answer).await;
                    }
                }
            }
        };

        self.act(session, message, request).await
    }

    async fn act(
        &self,
        session: &mut Session,
        user_query: &str,
        request: ToolInvocationRequest,
    ) -> String {
        session.state = AgentState::Acting;
        info!("Invoking {request}");
        self.emit(AgentEvent::ToolInvoked(request.clone())).await;

        let result = match self.registry.execute(&request).await {
            Ok(result) => result,
            Err(e) => {
                report(&AgentError::from_tool(&request.tool_name, e));
                return self.finish(session, TOOL_FAILURE_MESSAGE.to_string()).await;
            }
        };

        if let ToolResult::ParameterPrompt {
            missing_params,
            message,
        } = result
        {
            report(&AgentError::ParameterMissing {
                tool: request.tool_name.clone(),
                missing: missing_params.clone(),
            });
            self.emit(AgentEvent::ParametersRequested {
                tool_name: request.tool_name.clone(),
                missing: missing_params.clone(),
            })
            .await;

            session.pending = Some(PendingTool {
                request,
                missing: missing_params,
            });
            session.history.push_agent(message.clone());
            session.state = AgentState::AwaitingParameters;
            self.emit(AgentEvent::Answered(message.clone())).await;
            return message;
        }

        session.state = AgentState::Observing;
        self.emit(AgentEvent::ToolCompleted {
            tool_name: request.tool_name.clone(),
            result: result.clone(),
        })
        .await;

        let failed = result.reports_error();
        let answer = match result {
            ToolResult::Ok { payload } if !failed => {
                self.reasoner.synthesize(user_query, &request, &payload).await
            }
            ToolResult::Ok { payload } => {
                report(&AgentError::ToolTransport {
                    tool: request.tool_name.clone(),
                    message: payload["error"].to_string(),
                });
                TOOL_FAILURE_MESSAGE.to_string()
            }
            ToolResult::Error { message } => {
                report(&AgentError::ToolTransport {
                    tool: request.tool_name.clone(),
                    message,
                });
                TOOL_FAILURE_MESSAGE.to_string()
            }
            ToolResult::ParameterPrompt { message, .. } => message,
        };

        self.finish(session, answer).await
    }

    /// Replies with the outage apology. A pending tool and its collected
    /// parameters stay in place for the next turn.
    async fn unavailable(&self, session: &mut Session, err: &AgentError) -> String {
        report(err);
        let answer = MODEL_UNAVAILABLE_MESSAGE.to_string();
        session.history.push_agent(answer.clone());
        session.state = if session.pending.is_some() {
            AgentState::AwaitingParameters
        } else {
            AgentState::Done
        };
        self.emit(AgentEvent::Answered(answer.clone())).await;
        answer
    }

    async fn finish(&self, session: &mut Session, answer: String) -> String {
        session.history.push_agent(answer.clone());
        session.state = AgentState::Done;
        self.emit(AgentEvent::Answered(answer.clone())).await;
        answer
    }
}
