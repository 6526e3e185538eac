//! Conversation turns and prompt messages.
//!
//! Two related but distinct types live here:
//!
//! - [`ConversationTurn`] / [`ConversationHistory`]: what the user and the agent
//!   actually said during a session. The history is append-only and owned by
//!   the session.
//! - [`Message`]: a role-tagged prompt message sent to the language model. The
//!   reasoning step builds these from the history plus its own system prompt.
//!
//! # Examples
//!
//! ```
//! use smartclinic_common::chat::{ConversationHistory, MessageRole, TurnRole};
//!
//! let mut history = ConversationHistory::new();
//! history.push_user("What specialties are available?");
//! history.push_agent("We offer cardiology and pediatrics.");
//!
//! let last = history.last(1);
//! assert_eq!(last[0].role, TurnRole::Agent);
//!
//! let messages = history.to_messages(6);
//! assert_eq!(messages[0].role, MessageRole::User);
//! assert_eq!(messages[1].role, MessageRole::Assistant);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a prompt message sent to the language model.
///
/// Serialized to the lowercase strings used by OpenAI-compatible endpoints.
///
/// ```
/// use smartclinic_common::chat::MessageRole;
///
/// let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
/// assert_eq!(json, "\"assistant\"");
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageRole {
    /// Instructions for the model.
    #[serde(rename = "system")]
    System,
    /// Text written by the end user.
    #[serde(rename = "user")]
    User,
    /// Text produced by the model.
    #[serde(rename = "assistant")]
    Assistant,
}

/// A single prompt message.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Message {
    /// Who authored the message.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
}

impl Message {
    /// Creates a message with the given role and content.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Author of a conversation turn.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The person chatting with the assistant.
    User,
    /// The assistant itself.
    Agent,
}

impl From<TurnRole> for MessageRole {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Self::User,
            TurnRole::Agent => Self::Assistant,
        }
    }
}

/// One entry of the conversation log.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    /// Unique identifier of this turn.
    pub id: Uuid,
    /// Who said it.
    pub role: TurnRole,
    /// What was said.
    pub text: String,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Creates a turn stamped with the current time.
    pub fn new(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

impl From<&ConversationTurn> for Message {
    fn from(turn: &ConversationTurn) -> Self {
        Self::new(turn.role.into(), turn.text.clone())
    }
}

/// Ordered, append-only log of conversation turns.
///
/// Turns are never reordered or removed; the only way to start over is to
/// replace the whole history (see `Session::reset` in the `smartclinic` crate).
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    /// Creates an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Appends a turn.
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// Appends a user turn and returns a reference to it.
    pub fn push_user(&mut self, text: impl Into<String>) -> &ConversationTurn {
        self.push_role(TurnRole::User, text)
    }

    /// Appends an agent turn and returns a reference to it.
    pub fn push_agent(&mut self, text: impl Into<String>) -> &ConversationTurn {
        self.push_role(TurnRole::Agent, text)
    }

    fn push_role(&mut self, role: TurnRole, text: impl Into<String>) -> &ConversationTurn {
        let index = self.turns.len();
        self.turns.push(ConversationTurn::new(role, text));
        &self.turns[index]
    }

    /// Returns the last `n` turns in chronological order.
    #[must_use]
    pub fn last(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// Text of the most recent user turn, if any.
    #[must_use]
    pub fn last_user_message(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::User)
            .map(|t| t.text.as_str())
    }

    /// All turns in chronological order.
    #[must_use]
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Iterates over the turns in chronological order.
    pub fn iter(&self) -> std::slice::Iter<'_, ConversationTurn> {
        self.turns.iter()
    }

    /// Number of recorded turns.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether nothing has been said yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Converts the last `window` turns into prompt messages.
    #[must_use]
    pub fn to_messages(&self, window: usize) -> Vec<Message> {
        self.last(window).iter().map(Message::from).collect()
    }
}

impl<'a> IntoIterator for &'a ConversationHistory {
    type Item = &'a ConversationTurn;
    type IntoIter = std::slice::Iter<'a, ConversationTurn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn test_history_is_append_only_and_ordered() {
        let mut history = ConversationHistory::new();
        history.push_user("first");
        history.push_agent("second");
        history.push_user("third");

        let texts: Vec<&str> = history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_last_window() {
        let mut history = ConversationHistory::new();
        for i in 0..10 {
            history.push_user(format!("message {i}"));
        }

        let window = history.last(6);
        assert_eq!(window.len(), 6);
        assert_eq!(window[0].text, "message 4");
        assert_eq!(window[5].text, "message 9");

        // Larger window than history returns everything
        assert_eq!(history.last(100).len(), 10);
    }

    #[test]
    fn test_last_user_message_skips_agent_turns() {
        let mut history = ConversationHistory::new();
        assert!(history.last_user_message().is_none());

        history.push_user("do you have cardiologists");
        history.push_agent("Yes, we do.");

        assert_eq!(
            history.last_user_message(),
            Some("do you have cardiologists")
        );
    }

    #[test]
    fn test_to_messages_maps_roles() {
        let mut history = ConversationHistory::new();
        history.push_user("hello");
        history.push_agent("hi");

        let messages = history.to_messages(6);
        assert_eq!(messages, vec![Message::user("hello"), Message::assistant("hi")]);
    }

    #[test]
    fn test_turn_role_serialization() {
        let json = serde_json::to_string(&TurnRole::Agent).unwrap();
        assert_eq!(json, "\"agent\"");

        let role: TurnRole = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, TurnRole::User);
    }

    #[test]
    fn test_turn_timestamps_are_monotonic() {
        let mut history = ConversationHistory::new();
        history.push_user("a");
        history.push_agent("b");

        let turns = history.turns();
        assert!(turns[0].timestamp <= turns[1].timestamp);
        assert_ne!(turns[0].id, turns[1].id);
    }
}
