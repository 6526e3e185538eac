//! REPL mode for interactive conversations.

use anyhow::Result;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use smartclinic::{LLMClient, ReActAgent, Session};

use crate::display;

const HISTORY_FILE: &str = ".smartclinic_history";

/// What a `:` command asks the loop to do.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    Reset,
    History,
    Tools,
    Quit,
    Unknown(String),
}

fn parse_command(input: &str) -> Command {
    match input.split_whitespace().collect::<Vec<_>>().as_slice() {
        ["help"] => Command::Help,
        ["reset"] => Command::Reset,
        ["history"] => Command::History,
        ["tools"] => Command::Tools,
        ["quit" | "exit"] => Command::Quit,
        parts => Command::Unknown(parts.join(" ")),
    }
}

fn print_help() {
    println!("{}", "REPL Commands:".bright_cyan().bold());
    println!("  {} - Start a new conversation", ":reset".bright_yellow());
    println!("  {} - Show this conversation", ":history".bright_yellow());
    println!("  {} - List the hospital system tools", ":tools".bright_yellow());
    println!("  {} - Show this help message", ":help".bright_yellow());
    println!("  {} - Exit the REPL", ":quit / Ctrl-D".bright_yellow());
    println!();
}

/// Runs the REPL loop.
///
/// # Errors
///
/// Returns an error if the line editor cannot be initialized.
pub async fn run_repl<C: LLMClient>(agent: &ReActAgent<C>, session: &mut Session) -> Result<()> {
    println!("{}", "SmartClinic".bright_magenta().bold());
    println!("{}", "Ask about specialties, appointments or visits. :help for commands, Ctrl-D to exit".dimmed());
    println!();

    let mut rl = DefaultEditor::new()?;
    if rl.load_history(HISTORY_FILE).is_err() {
        log::debug!("No previous history found");
    }

    loop {
        let prompt = if session.is_awaiting_parameters() {
            format!("{} ", "?".bright_yellow())
        } else {
            format!("{} ", ">".bright_green())
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if let Some(cmd) = line.strip_prefix(':') {
                    match parse_command(cmd) {
                        Command::Help => print_help(),
                        Command::Reset => {
                            session.reset();
                            println!("{}", "Conversation cleared.".dimmed());
                        }
                        Command::History => display::display_history(session),
                        Command::Tools => display::display_tools(agent.registry()),
                        Command::Quit => break,
                        Command::Unknown(other) => display::display_error(&format!(
                            "Unknown command: :{other}\nType :help for available commands"
                        )),
                    }
                    continue;
                }

                let reply = agent.handle_turn(session, line).await;
                display::display_reply(&reply);
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("Exiting");
                break;
            }
            Err(err) => {
                display::display_error(&err.to_string());
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(HISTORY_FILE) {
        log::warn!("Could not save history: {e}");
    }
    Ok(())
}
