//! Per-conversation state.

use std::fmt;

use uuid::Uuid;

use smartclinic_common::{ConversationHistory, ToolInvocationRequest};

/// Phase of the ReAct loop a session is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AgentState {
    #[default]
    Reasoning,
    /// A tool was chosen but required parameters are still missing. Persists
    /// across turns until the parameters arrive or the user moves on.
    AwaitingParameters,
    Acting,
    Observing,
    Done,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reasoning => "reasoning",
            Self::AwaitingParameters => "awaiting_parameters",
            Self::Acting => "acting",
            Self::Observing => "observing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// A tool whose parameters are being collected from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTool {
    /// The tool and the parameters gathered so far.
    pub request: ToolInvocationRequest,
    /// Required parameters still missing after the last attempt.
    pub missing: Vec<String>,
}

impl PendingTool {
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.request.tool_name
    }
}

/// Everything the agent remembers about one conversation.
///
/// Passed mutably into [`crate::ReActAgent::handle_turn`]; the agent itself
/// holds no per-conversation state.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub history: ConversationHistory,
    pub pending: Option<PendingTool>,
    pub state: AgentState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            history: ConversationHistory::new(),
            pending: None,
            state: AgentState::Reasoning,
        }
    }

    /// Whether a tool is waiting for parameters.
    #[must_use]
    pub const fn is_awaiting_parameters(&self) -> bool {
        self.pending.is_some()
    }

    /// Forgets the history and any pending tool. The id is kept.
    pub fn reset(&mut self) {
        self.history = ConversationHistory::new();
        self.pending = None;
        self.state = AgentState::Reasoning;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new();
        assert!(session.history.is_empty());
        assert!(!session.is_awaiting_parameters());
        assert_eq!(session.state, AgentState::Reasoning);
    }

    #[test]
    fn test_reset_keeps_id() {
        let mut session = Session::new();
        let id = session.id;
        session.history.push_user("hello");
        session.pending = Some(PendingTool {
            request: ToolInvocationRequest::new("create_visit"),
            missing: vec!["appointment_id".into()],
        });
        session.state = AgentState::AwaitingParameters;

        session.reset();

        assert_eq!(session.id, id);
        assert!(session.history.is_empty());
        assert!(session.pending.is_none());
        assert_eq!(session.state, AgentState::Reasoning);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(AgentState::AwaitingParameters.to_string(), "awaiting_parameters");
    }
}
