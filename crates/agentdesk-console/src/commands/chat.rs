use std::io::Write as _;

use agentdesk_client::{AgentClient, CANCELLED_MARKER, ChatEvent, ChatSession};
use clap::Args;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::debug;

#[derive(Args)]
pub struct ChatArgs {
    /// Agent to chat with.
    #[arg(default_value = "default")]
    pub agent: String,
    /// One-shot prompt; opens an interactive session when omitted.
    #[arg(long)]
    pub prompt: Option<String>,
}

pub async fn run(client: &AgentClient, args: ChatArgs) -> anyhow::Result<()> {
    let mut session = ChatSession::new(client.clone(), &args.agent);

    if let Some(prompt) = args.prompt {
        stream_reply(&mut session, &prompt).await?;
        return Ok(());
    }

    println!(
        "chatting with `{}` (empty line exits, Ctrl-C cancels a running reply)",
        args.agent
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            break;
        }
        stream_reply(&mut session, &line).await?;
    }
    Ok(())
}

/// Streams one reply to stdout; Ctrl-C cancels the run without exiting.
async fn stream_reply(session: &mut ChatSession, prompt: &str) -> anyhow::Result<()> {
    session.submit(prompt).await?;
    debug!(agent = %session.agent_name(), "streaming reply");

    // Ctrl-C fires the run's abort handle; the cancellation then arrives
    // through the event stream like any other terminal outcome.
    let abort = session.abort_handle();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok()
            && let Some(handle) = abort
        {
            handle.abort();
        }
    });

    while let Some(event) = session.next_event().await {
        match event {
            ChatEvent::Delta { text, .. } => {
                print!("{text}");
                std::io::stdout().flush()?;
            }
            ChatEvent::Completed { .. } => {
                println!();
                break;
            }
            ChatEvent::Failed { failure, .. } => {
                if failure.is_cancelled() {
                    println!("{}", CANCELLED_MARKER.trim_start());
                } else {
                    eprintln!("\n[Error: {failure}]");
                }
                break;
            }
            ChatEvent::Started { .. } => {}
        }
    }

    watcher.abort();
    Ok(())
}
