use agentdesk_client::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    let client = AgentClient::from_env()?;

    for name in client.list_agents().await? {
        let agent = client.agent(&name).await?;
        println!("{name} [{}]: {}", agent.model, agent.description);
    }

    for doc in client.list_documents().await? {
        println!("{} ({})", doc.title, doc.filename);
    }
    Ok(())
}
