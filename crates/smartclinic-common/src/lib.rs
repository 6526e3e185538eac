//! # smartclinic-common
//!
//! Common types shared by the SmartClinic crates.
//!
//! This crate provides the data model of the hospital assistant:
//! - Conversation turns and the per-session history log
//! - Tool schemas, invocation requests and tool results
//! - The reasoning decision produced by the language model
//! - Language-model client configuration
//!
//! ## Example
//!
//! ```
//! use smartclinic_common::{ConversationHistory, ToolInvocationRequest, ToolSchema};
//!
//! let mut history = ConversationHistory::new();
//! history.push_user("Create a walk-in appointment");
//! history.push_agent("Which doctor should I book?");
//! assert_eq!(history.len(), 2);
//!
//! let schema = ToolSchema::builder()
//!     .tool_name("create_visit")
//!     .description("Create a visit from an appointment")
//!     .build()
//!     .require("appointment_id", "Appointment ID", "1820");
//! assert_eq!(schema.required_names(), vec!["appointment_id"]);
//!
//! let request = ToolInvocationRequest::new("create_visit")
//!     .with_parameter("appointment_id", "1820");
//! assert_eq!(request.parameter("appointment_id"), Some("1820"));
//! ```

/// Conversation turns, history and language-model prompt messages.
pub mod chat;
/// Language-model client configuration and request/response types.
pub mod client;
/// Reasoning decisions produced by the model.
pub mod decision;
/// Tool schemas, invocation requests and results.
pub mod tools;

pub use chat::{ConversationHistory, ConversationTurn, Message, MessageRole, TurnRole};
pub use client::{ChatRequest, ChatResponse, Config, FinishReason, RetryConfig, Usage};
pub use decision::ReasoningDecision;
pub use tools::{
    OptionalParam, ParamDefault, RequiredParam, ToolInvocationRequest, ToolParameters, ToolResult,
    ToolSchema,
};
