//! Event types for the ReAct loop
//!
//! [`crate::ReActAgent`] emits an [`AgentEvent`] at each phase of a turn.
//! Events are **observability** only: the agent awaits the callback and then
//! carries on, whatever the callback does. The REPL uses them for `--debug`
//! output.

use std::future::Future;
use std::pin::Pin;

use smartclinic_common::{ReasoningDecision, ToolInvocationRequest, ToolResult};

/// Events emitted by the agent during a turn
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// The reasoning step produced a decision
    Reasoned(ReasoningDecision),

    /// A tool is about to be executed with the merged parameters
    ToolInvoked(ToolInvocationRequest),

    /// Required parameters are missing; the user is being asked for them
    ParametersRequested {
        /// Tool waiting for parameters
        tool_name: String,
        /// Names still missing
        missing: Vec<String>,
    },

    /// Tool execution finished
    ToolCompleted {
        /// Name of the tool that ran
        tool_name: String,
        /// What it returned
        result: ToolResult,
    },

    /// The final reply of the turn
    Answered(String),
}

/// Async callback for receiving agent events
pub type EventCallback =
    Box<dyn Fn(AgentEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;
