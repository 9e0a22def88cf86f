//! `GET /history` — read the shared session's message history
//!
//! This endpoint never fails: any gateway problem (unreachable socket,
//! rejected handshake, rejected call, timeout) collapses to an empty
//! message list, and the browser falls back to its local cache.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use tracing::{debug, warn};

use crate::api::HistoryResponse;
use crate::state::AppState;

pub async fn history_handler(State(state): State<Arc<AppState>>) -> Json<HistoryResponse> {
    let gateway = state.gateway_client();
    match gateway.history().await {
        Ok(payload) => {
            debug!(
                component = "history",
                event = "history.fetch.completed",
                messages = payload.messages.len(),
                "History fetched"
            );
            Json(HistoryResponse {
                messages: payload.messages,
                session_key: payload.session_key,
            })
        }
        Err(err) => {
            warn!(
                component = "history",
                event = "history.fetch.failed",
                error = %err,
                "History fetch failed, returning empty list"
            );
            Json(HistoryResponse::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use futures::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;

    fn state_for(gateway_url: String) -> Arc<AppState> {
        Arc::new(AppState::new(RelayConfig {
            gateway_url,
            gateway_token: "tok".to_string(),
            fallback: None,
        }))
    }

    #[tokio::test]
    async fn unreachable_gateway_collapses_to_empty_messages() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("ws://{}", listener.local_addr().expect("addr"));
        drop(listener);

        let Json(response) = history_handler(State(state_for(url))).await;
        assert!(response.messages.is_empty());
        assert_eq!(response.session_key, None);
    }

    #[tokio::test]
    async fn gateway_history_passes_through() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("ws://{}", listener.local_addr().expect("addr"));
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("ws handshake");
            ws.send(Message::Text(
                json!({"type": "event", "event": "connect.challenge", "payload": {}})
                    .to_string()
                    .into(),
            ))
            .await
            .expect("challenge");

            let connect: Value = loop {
                if let Message::Text(text) = ws.next().await.expect("frame").expect("message") {
                    break serde_json::from_str(text.as_str()).expect("json frame");
                }
            };
            ws.send(Message::Text(
                json!({"type": "res", "id": connect["id"], "ok": true})
                    .to_string()
                    .into(),
            ))
            .await
            .expect("connect res");

            let call: Value = loop {
                if let Message::Text(text) = ws.next().await.expect("frame").expect("message") {
                    break serde_json::from_str(text.as_str()).expect("json frame");
                }
            };
            assert_eq!(call["method"], "chat.history");
            ws.send(Message::Text(
                json!({
                    "type": "res",
                    "id": call["id"],
                    "ok": true,
                    "payload": {
                        "messages": [{"role": "assistant", "content": "Hello"}],
                        "sessionKey": "agent:main:main"
                    }
                })
                .to_string()
                .into(),
            ))
            .await
            .expect("history res");
        });

        let Json(response) = history_handler(State(state_for(url))).await;
        assert_eq!(response.messages.len(), 1);
        assert_eq!(response.session_key.as_deref(), Some("agent:main:main"));
    }
}
