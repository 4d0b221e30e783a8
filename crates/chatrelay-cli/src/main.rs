use std::sync::Arc;

use clap::{Parser, Subcommand};

use chatrelay_agent::{AgentTurnHandler, LlmTurnHandler, TurnHandler};
use chatrelay_core::config::{Config, TurnMode};
use chatrelay_providers::GroqProvider;
use chatrelay_tools::{ToolRegistry, register_builtin_tools};

#[derive(Parser)]
#[command(
    name = "chatrelay",
    about = "Streams hosted-LLM chat turns to web and mobile clients over WebSocket",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay gateway
    Serve {
        /// Port to listen on (default: 8000)
        #[arg(long)]
        port: Option<u16>,

        /// Route turns through the tool-calling agent
        #[arg(long)]
        agent: bool,
    },

    /// Run one chat turn and print the answer (non-streaming)
    Chat {
        /// Message to send
        #[arg(short, long)]
        message: String,

        /// Route the turn through the tool-calling agent
        #[arg(long)]
        agent: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    // Load config
    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::config_path);
    let mut config = Config::load(&config_path)?;

    match cli.command {
        Commands::Serve { port, agent } => {
            if agent {
                config.agent.mode = TurnMode::Agent;
            }
            let port = port.unwrap_or(config.gateway.port);
            let config = Arc::new(config);
            let handler = build_handler(&config)?;

            tracing::info!(port, mode = ?config.agent.mode, "Starting chatrelay gateway");
            let state = Arc::new(chatrelay_gateway::GatewayState::new(config, handler));
            chatrelay_gateway::start_gateway(state, port).await?;
        }
        Commands::Chat { message, agent } => {
            if agent {
                config.agent.mode = TurnMode::Agent;
            }
            let handler = build_handler(&Arc::new(config))?;
            let answer = handler.run_turn(&message).await?;
            println!("{answer}");
        }
    }

    Ok(())
}

/// Construct the turn handler selected by config.
///
/// The credential is resolved here so a missing key aborts startup instead
/// of failing on the first turn.
fn build_handler(config: &Arc<Config>) -> anyhow::Result<Arc<dyn TurnHandler>> {
    let api_key = config.resolve_api_key()?;

    let mut provider = GroqProvider::new(api_key);
    if let Some(ref base_url) = config.provider.base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    let provider = Arc::new(provider);

    Ok(match config.agent.mode {
        TurnMode::Llm => Arc::new(LlmTurnHandler::new(provider, config)),
        TurnMode::Agent => {
            let mut tools = ToolRegistry::new();
            register_builtin_tools(&mut tools);
            Arc::new(AgentTurnHandler::new(provider, Arc::new(tools), config))
        }
    })
}
