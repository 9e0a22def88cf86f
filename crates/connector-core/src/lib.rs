//! Clawrelay Connector Core
//!
//! Shared types between reply producers (the gateway adapter and the
//! direct-LLM fallback) and the SSE bridge that serves the browser.
//! Producers push `RelayEvent`s into a channel; the bridge frames them.

use serde::{Deserialize, Serialize};

/// One chat message as exchanged with the browser and with the
/// fallback completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// One unit of a streamed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// An incremental content fragment, forwarded verbatim in arrival order.
    Delta(String),

    /// Terminal sentinel — nothing follows.
    Done,

    /// Error surfaced to the stream consumer, at most once, before `Done`.
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::ChatMessage;

    #[test]
    fn chat_message_roundtrip() {
        let json = r#"{"role":"user","content":"hi"}"#;
        let parsed: ChatMessage = serde_json::from_str(json).expect("parse chat message");
        assert_eq!(parsed.role, "user");
        assert_eq!(parsed.content, "hi");

        let serialized = serde_json::to_string(&parsed).expect("serialize");
        assert_eq!(serialized, json);
    }
}
