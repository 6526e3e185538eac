use serde::{Deserialize, Serialize};

use crate::tools::ToolInvocationRequest;

/// Outcome of one reasoning pass over the conversation.
///
/// ```
/// use smartclinic_common::{ReasoningDecision, ToolInvocationRequest};
///
/// let decision = ReasoningDecision::UseTool(
///     ToolInvocationRequest::new("get_doctor_specialties").with_parameter("query", "cardiology"),
/// );
/// assert_eq!(decision.tool_name(), Some("get_doctor_specialties"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ReasoningDecision {
    /// Reply to the user without calling any tool.
    DirectAnswer(String),
    /// Invoke a single tool.
    UseTool(ToolInvocationRequest),
}

impl ReasoningDecision {
    /// Name of the requested tool, if this decision uses one.
    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Self::DirectAnswer(_) => None,
            Self::UseTool(request) => Some(&request.tool_name),
        }
    }

    /// Whether this decision invokes a tool.
    #[must_use]
    pub const fn uses_tool(&self) -> bool {
        matches!(self, Self::UseTool(_))
    }
}
