//! SmartClinic CLI - interactive chat with the hospital assistant
//!
//! Loads the assistant configuration, connects to the language model and the
//! HIS, then reads questions from a rustyline prompt. `--message` answers a
//! single question and exits.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use smartclinic::{AgentConfig, ReActAgent, Session};

mod display;
mod repl;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (.toml, .yaml, .yml or .json)
    #[arg(short, long, env = "SMARTCLINIC_CONFIG")]
    config: Option<PathBuf>,

    /// Language-model endpoint (OpenAI-compatible base URL)
    #[arg(long)]
    llm_endpoint: Option<String>,

    /// Model name sent to the endpoint
    #[arg(long)]
    model: Option<String>,

    /// HIS REST API base URL
    #[arg(long)]
    his_url: Option<String>,

    /// Disable the specialty keyword shortcut
    #[arg(long)]
    no_shortcut: bool,

    /// Print each step of the reasoning loop
    #[arg(long)]
    debug: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Ask a single question and exit
    #[arg(short, long)]
    message: Option<String>,
}

impl Args {
    /// Applies command-line overrides on top of file and environment values.
    fn apply(&self, config: &mut AgentConfig) {
        if let Some(endpoint) = &self.llm_endpoint {
            config.llm.endpoint.clone_from(endpoint);
        }
        if let Some(model) = &self.model {
            config.llm.model.clone_from(model);
        }
        if let Some(url) = &self.his_url {
            config.his.base_url.clone_from(url);
        }
        if self.no_shortcut {
            config.agent.specialty_shortcut = false;
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "smartclinic=debug,smartclinic_client=debug,smartclinic_tools=debug"
    } else {
        "smartclinic=info,smartclinic_client=warn,smartclinic_tools=info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => AgentConfig::from_file(path)?,
        None => AgentConfig::default(),
    };
    config.apply_env();
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let mut agent = ReActAgent::from_config(&config)?;
    if args.debug {
        agent = agent.with_event_callback(|event| {
            Box::pin(async move {
                display::display_event(&event);
            })
        });
    }

    let mut session = Session::new();
    info!("Session {}", session.id);

    if let Some(message) = &args.message {
        let reply = agent.handle_turn(&mut session, message).await;
        println!("{reply}");
        return Ok(());
    }

    repl::run_repl(&agent, &mut session).await
}
