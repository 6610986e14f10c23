use sage_chat::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ChatError> {
    let client = ChatClient::chat_completions(
        BackendKind::OpenAi,
        ChatConfig::from_env(BackendKind::OpenAi)?,
    )?;

    let mut exchange = client
        .session(SessionConfig::named("stream-demo"))
        .submit("Give me one fun fact about octopuses.")
        .tier(Tier::Standard)
        .start_stream()
        .await?;

    while let Some(event) = exchange.next_event().await {
        match event {
            ExchangeEvent::Fragment { text, .. } => print!("{text}"),
            ExchangeEvent::Completed { .. } => println!(),
            ExchangeEvent::Failed { error, .. } => eprintln!("exchange failed: {error}"),
            ExchangeEvent::Cancelled { .. } => eprintln!("exchange cancelled"),
            ExchangeEvent::Started { .. } => {}
        }
    }

    let _ = exchange.finish().await?;
    Ok(())
}
