use sage_chat::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ChatError> {
    let client = ChatClient::chat_completions(
        BackendKind::Xai,
        ChatConfig::from_env(BackendKind::Xai)?,
    )?;

    let answer = client
        .session(SessionConfig::named("collect-demo"))
        .submit("What happened in tech news today?")
        .history(vec![
            ChatMessage::user("Keep answers short."),
            ChatMessage::assistant("Got it, short answers from here on."),
        ])
        .tier(Tier::Elevated)
        .collect_text()
        .await?;

    println!("{answer}");
    Ok(())
}
