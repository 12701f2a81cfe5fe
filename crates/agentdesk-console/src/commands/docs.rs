use agentdesk_client::{AgentClient, MarkdownRenderer as _, PulldownMarkdownRenderer};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum DocsCommand {
    /// List the documents known to the backend.
    List,
    /// Print a document (raw markdown, or HTML with --html).
    Show {
        filename: String,
        /// Render the markdown to HTML before printing.
        #[arg(long)]
        html: bool,
    },
    /// Create an empty document.
    New { filename: String },
    /// Replace a document's content from a local file.
    Save {
        filename: String,
        /// Local file holding the new markdown content.
        #[arg(long)]
        file: std::path::PathBuf,
    },
}

pub async fn run(client: &AgentClient, command: DocsCommand) -> anyhow::Result<()> {
    match command {
        DocsCommand::List => {
            for doc in client.list_documents().await? {
                println!("{}\t{}", doc.filename, doc.title);
            }
        }
        DocsCommand::Show { filename, html } => {
            let content = client.document(&filename).await?;
            if html {
                println!("{}", PulldownMarkdownRenderer.render(&content)?);
            } else {
                println!("{content}");
            }
        }
        DocsCommand::New { filename } => {
            client.create_document(&filename).await?;
            println!("created {filename}");
        }
        DocsCommand::Save { filename, file } => {
            let content = tokio::fs::read_to_string(&file).await?;
            let stored = client.save_document(&filename, &content).await?;
            println!("saved {filename} ({} bytes)", stored.len());
        }
    }
    Ok(())
}
