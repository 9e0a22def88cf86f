//! Gateway → Client payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of the `connect.challenge` event.
///
/// The nonce is received but not validated or echoed — the gateway does
/// not require challenge-response over token auth.
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengePayload {
    #[serde(default)]
    pub nonce: Option<String>,
}

/// Payload of an `agent` event, discriminated on `stream`.
///
/// Unknown stream kinds fail to parse and are skipped by the caller,
/// which keeps the demux forward-compatible.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "stream", rename_all = "lowercase")]
pub enum AgentStream {
    /// Incremental reply content.
    Assistant {
        #[serde(default)]
        data: AssistantData,
    },
    /// Reply lifecycle transitions; `phase == "end"` closes the reply.
    Lifecycle {
        #[serde(default)]
        data: LifecycleData,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantData {
    #[serde(default)]
    pub delta: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LifecycleData {
    #[serde(default)]
    pub phase: Option<String>,
}

/// Payload of a successful `chat.history` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPayload {
    #[serde(default)]
    pub messages: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}
