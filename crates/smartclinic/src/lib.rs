//! # smartclinic
//!
//! A hospital assistant that answers free-text questions by calling the
//! hospital information system (HIS) through a ReAct loop driven by a
//! locally hosted language model.
//!
//! Each user message gets one pass:
//!
//! 1. **Reason**: the model decides between a direct answer and one tool call
//! 2. **Act**: the tool runs, or the user is asked for missing parameters
//! 3. **Observe**: the tool's JSON is turned into the final answer
//!
//! ## Quick Start
//!
//! ```no_run
//! use smartclinic::{AgentConfig, ReActAgent, Session};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AgentConfig::load(None)?;
//! let agent = ReActAgent::from_config(&config)?;
//!
//! let mut session = Session::new();
//! let reply = agent.handle_turn(&mut session, "What specialties are available?").await;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```
//!
//! Conversation state lives in [`Session`]; the agent holds none, so one
//! agent serves many sessions.

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod reasoning;
pub mod session;

pub use smartclinic_client::*;
pub use smartclinic_common::*;
pub use smartclinic_tools::{ToolError, ToolImplementation, ToolRegistry, his};

pub use agent::{ReActAgent, TOOL_FAILURE_MESSAGE};
pub use config::{AgentConfig, ConfigError};
pub use error::AgentError;
pub use events::{AgentEvent, EventCallback};
pub use reasoning::{MODEL_UNAVAILABLE_MESSAGE, Reasoner};
pub use session::{AgentState, PendingTool, Session};
