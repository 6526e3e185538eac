//! Display utilities for CLI output formatting
//!
//! Renders agent replies, `--debug` events, the session history and the tool
//! catalog.

use colored::Colorize;

use smartclinic::{AgentEvent, ReasoningDecision, Session, ToolRegistry, ToolResult, TurnRole};

/// Longest tool payload shown in debug output.
const MAX_RESULT_CHARS: usize = 200;

/// Cuts `text` to [`MAX_RESULT_CHARS`] characters, noting the full length.
fn truncate(text: &str) -> String {
    let total = text.chars().count();
    if total <= MAX_RESULT_CHARS {
        return text.to_string();
    }
    let shown: String = text.chars().take(MAX_RESULT_CHARS).collect();
    format!("{shown}... ({total} chars)")
}

/// One-line rendering of an agent event.
pub fn render_event(event: &AgentEvent) -> Option<String> {
    let line = match event {
        AgentEvent::Reasoned(ReasoningDecision::UseTool(request)) => {
            format!("  ├─○ Decided: use {}", request.tool_name.bright_green())
        }
        AgentEvent::Reasoned(ReasoningDecision::DirectAnswer(_)) => {
            "  ├─○ Decided: answer directly".to_string()
        }
        AgentEvent::ToolInvoked(request) => {
            format!("  ├─● Tool: {}", request.to_string().bright_yellow())
        }
        AgentEvent::ParametersRequested { tool_name, missing } => format!(
            "  ├─? {} needs: {}",
            tool_name.bright_green(),
            missing.join(", ")
        ),
        AgentEvent::ToolCompleted { tool_name, result } => match result {
            ToolResult::Ok { payload } => format!(
                "  ├─✓ {}: {}",
                tool_name.bright_green(),
                truncate(&payload.to_string())
            ),
            ToolResult::Error { message } => {
                format!("  ├─✗ {}: {}", tool_name.bright_red(), truncate(message))
            }
            ToolResult::ParameterPrompt { .. } => return None,
        },
        AgentEvent::Answered(_) => return None,
    };
    Some(line.dimmed().to_string())
}

pub fn display_event(event: &AgentEvent) {
    if let Some(line) = render_event(event) {
        println!("{line}");
    }
}

/// Display the assistant's reply
pub fn display_reply(reply: &str) {
    println!("\n{} {}", "●".bright_magenta(), "SmartClinic".bright_magenta().bold());
    println!("{reply}");
}

pub fn display_error(message: &str) {
    eprintln!("{} {message}", "Error:".bright_red());
}

/// List the turns of the current session
pub fn display_history(session: &Session) {
    if session.history.is_empty() {
        println!("{}", "No messages yet.".dimmed());
        return;
    }
    for (idx, turn) in session.history.iter().enumerate() {
        let role = match turn.role {
            TurnRole::User => "You".bright_cyan(),
            TurnRole::Agent => "SmartClinic".bright_magenta(),
        };
        println!(
            "[{idx}] {} {role}: {}",
            turn.timestamp.format("%H:%M:%S").to_string().dimmed(),
            turn.text
        );
    }
    if let Some(pending) = &session.pending {
        println!(
            "{} {} is waiting for: {}",
            "Pending:".bright_yellow(),
            pending.tool_name(),
            pending.missing.join(", ")
        );
    }
}

/// List the available tools and their parameters
pub fn display_tools(registry: &ToolRegistry) {
    println!("{}", "Available tools:".bright_cyan().bold());
    for schema in registry.catalog() {
        println!("{}", schema.catalog_line());
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;
    use smartclinic::ToolInvocationRequest;

    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short"), "short");
        let long = "é".repeat(MAX_RESULT_CHARS + 10);
        let cut = truncate(&long);
        assert!(cut.ends_with(&format!("... ({} chars)", MAX_RESULT_CHARS + 10)));
        assert!(cut.starts_with(&"é".repeat(MAX_RESULT_CHARS)));
    }

    #[test]
    fn test_render_events() {
        colored::control::set_override(false);

        let invoked = AgentEvent::ToolInvoked(
            ToolInvocationRequest::new("create_visit").with_parameter("appointment_id", "1820"),
        );
        assert_eq!(
            render_event(&invoked).unwrap(),
            "  ├─● Tool: create_visit(appointment_id=1820)"
        );

        let completed = AgentEvent::ToolCompleted {
            tool_name: "create_visit".into(),
            result: ToolResult::ok(json!({"VISITID": 1})),
        };
        assert!(render_event(&completed).unwrap().contains(r#"{"VISITID":1}"#));

        let requested = AgentEvent::ParametersRequested {
            tool_name: "create_walkin".into(),
            missing: vec!["session_id".into(), "patient_id".into()],
        };
        assert!(
            render_event(&requested)
                .unwrap()
                .ends_with("needs: session_id, patient_id")
        );

        assert!(render_event(&AgentEvent::Answered("hi".into())).is_none());
    }
}
