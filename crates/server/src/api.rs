//! HTTP request/response bodies

use clawrelay_connector_core::ChatMessage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// Body of the `GET /history` response. `messages` is always present,
/// empty on any gateway failure.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}
