use agentdesk_client::AgentClient;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum AgentsCommand {
    /// List the names of all configured agents.
    List,
    /// Show one agent's full definition.
    Show { name: String },
    /// Replace an agent's instruction text.
    SetInstruction {
        name: String,
        /// New instruction text; reads stdin when omitted.
        instruction: Option<String>,
    },
}

pub async fn run(client: &AgentClient, command: AgentsCommand) -> anyhow::Result<()> {
    match command {
        AgentsCommand::List => {
            for name in client.list_agents().await? {
                println!("{name}");
            }
        }
        AgentsCommand::Show { name } => {
            let agent = client.agent(&name).await?;
            println!("name:        {}", agent.name);
            println!("model:       {}", agent.model);
            println!("output key:  {}", agent.output_key);
            println!("description: {}", agent.description);
            println!("sub agents:  {}", join_or_none(&agent.sub_agents));
            println!("tools:       {}", join_or_none(&agent.tools));
            println!("\ninstruction:\n{}", agent.instruction);
        }
        AgentsCommand::SetInstruction { name, instruction } => {
            let instruction = match instruction {
                Some(text) => text,
                None => read_stdin().await?,
            };
            let updated = client.update_instruction(&name, &instruction).await?;
            println!("updated {}", updated.name);
        }
    }
    Ok(())
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

async fn read_stdin() -> anyhow::Result<String> {
    use tokio::io::AsyncReadExt as _;
    let mut text = String::new();
    tokio::io::stdin().read_to_string(&mut text).await?;
    Ok(text)
}
