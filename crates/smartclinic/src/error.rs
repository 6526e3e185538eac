use thiserror::Error;

use smartclinic_tools::ToolError;

use crate::config::ConfigError;

/// Failures inside a single assistant turn.
///
/// None of these end a conversation: [`crate::ReActAgent::handle_turn`]
/// turns each of them into a reply. The variants exist so failures can be
/// logged and classified.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AgentError {
    #[error("Missing required parameters for '{tool}': {}", missing.join(", "))]
    ParameterMissing { tool: String, missing: Vec<String> },

    #[error("Tool '{tool}' failed: {message}")]
    ToolTransport { tool: String, message: String },

    #[error("Language model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Unknown tool: '{0}'")]
    UnknownTool(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AgentError {
    /// Classifies a registry error raised while running `tool`.
    #[must_use]
    pub fn from_tool(tool: &str, err: ToolError) -> Self {
        match err {
            ToolError::NotFound(name) => Self::UnknownTool(name),
            other => Self::ToolTransport {
                tool: tool.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Whether the user can fix this by supplying more information.
    #[must_use]
    pub const fn is_recoverable_by_user(&self) -> bool {
        matches!(self, Self::ParameterMissing { .. })
    }
}
