use agentdesk_client::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    let client = AgentClient::from_env()?;

    let mut run = client
        .chat("default")
        .prompt("Draft a two-line product blurb.")
        .start_stream()
        .await?;

    while let Some(event) = run.next_event().await {
        match event {
            ChatEvent::Delta { text, .. } => print!("{text}"),
            ChatEvent::Completed { .. } => println!(),
            ChatEvent::Failed { failure, .. } => eprintln!("run error: {failure}"),
            ChatEvent::Started { .. } => {}
        }
    }

    let _ = run.finish().await?;
    Ok(())
}
