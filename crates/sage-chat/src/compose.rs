use crate::message::{ChatMessage, Role};

/// Role-tagged message as serialized into the request body.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl WireMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Assembles the outbound message list for one exchange.
///
/// Order: exactly one leading system entry, an optional `Context: …` user
/// entry when `context` is non-empty, the prior history verbatim (role and
/// order preserved), and exactly one trailing user entry with the literal
/// input text. Pure function; input emptiness is validated by the caller
/// before composition.
pub fn compose(
    system_prompt: &str,
    context: Option<&str>,
    history: &[ChatMessage],
    text: &str,
) -> Vec<WireMessage> {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(WireMessage::new(Role::System, system_prompt));
    if let Some(context) = context.filter(|c| !c.is_empty()) {
        messages.push(WireMessage::new(Role::User, format!("Context: {context}")));
    }
    for entry in history {
        messages.push(WireMessage::new(entry.role, entry.content.clone()));
    }
    messages.push(WireMessage::new(Role::User, text));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_exchange_is_system_then_user() {
        let messages = compose("be brief", None, &[], "hello");
        assert_eq!(
            messages,
            vec![
                WireMessage::new(Role::System, "be brief"),
                WireMessage::new(Role::User, "hello"),
            ]
        );
    }

    #[test]
    fn context_is_prefixed_and_placed_before_history() {
        let history = vec![
            ChatMessage::user("earlier question"),
            ChatMessage::assistant("earlier answer"),
        ];
        let messages = compose("sys", Some("quoted text"), &history, "follow-up");
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "Context: quoted text");
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].content, "earlier question");
        assert_eq!(messages[3].role, Role::Assistant);
        assert_eq!(messages[3].content, "earlier answer");
        assert_eq!(
            messages.last().unwrap(),
            &WireMessage::new(Role::User, "follow-up")
        );
    }

    #[test]
    fn empty_context_is_omitted() {
        let messages = compose("sys", Some(""), &[], "hi");
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn exactly_one_system_entry_for_conversation_history() {
        let history = vec![
            ChatMessage::user("q1"),
            ChatMessage::assistant("a1"),
            ChatMessage::user("q2"),
            ChatMessage::assistant("a2"),
        ];
        let messages = compose("sys", None, &history, "hi");
        let system_count = messages.iter().filter(|m| m.role == Role::System).count();
        assert_eq!(system_count, 1);
        assert_eq!(messages[0].content, "sys");
        assert_eq!(messages.last().unwrap().content, "hi");
    }
}
