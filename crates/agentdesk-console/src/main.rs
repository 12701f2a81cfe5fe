//! Console front-end for the agent backend: browse agents, chat with a
//! streamed reply, and manage markdown documents.

mod commands;

use clap::{Parser, Subcommand};
use tracing::debug;

#[derive(Parser)]
#[command(name = "agentdesk", about = "Console for the agent backend", version)]
struct Cli {
    /// Backend base URL (overrides AGENTDESK_BACKEND_URL).
    #[arg(long, global = true)]
    backend_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Browse and edit configured agents.
    Agents {
        #[command(subcommand)]
        command: commands::agents::AgentsCommand,
    },
    /// Chat with an agent via a streamed reply.
    Chat(commands::chat::ChatArgs),
    /// List, view, and edit markdown documents.
    Docs {
        #[command(subcommand)]
        command: commands::docs::DocsCommand,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    agentdesk_client::observability::init_tracing();

    let cli = Cli::parse();
    let mut config = agentdesk_client::BackendConfig::from_env();
    if let Some(base_url) = cli.backend_url {
        config = config.base_url(base_url);
    }
    debug!(base_url = %config.base_url, "backend configured");
    let client = agentdesk_client::AgentClient::new(config)?;

    match cli.command {
        Command::Agents { command } => commands::agents::run(&client, command).await,
        Command::Chat(args) => commands::chat::run(&client, args).await,
        Command::Docs { command } => commands::docs::run(&client, command).await,
    }
}
