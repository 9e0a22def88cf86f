//! `POST /chat` — one gateway chat call streamed back as SSE

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::Json;
use clawrelay_connector_core::{ChatMessage, RelayEvent};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::api::ChatRequest;
use crate::bridge::{sse_event, SseBridge};
use crate::state::AppState;

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    if request.messages.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    info!(
        component = "chat",
        event = "chat.request.received",
        messages = request.messages.len(),
        "Chat request received"
    );

    let rx = spawn_chat_pipeline(state, request.messages);
    let stream = ReceiverStream::new(rx).map(|event| Ok(sse_event(&event)));
    Ok(Sse::new(stream))
}

/// Spawn the producer task for one chat request and hand back the
/// event stream feeding the SSE response.
fn spawn_chat_pipeline(
    state: Arc<AppState>,
    messages: Vec<ChatMessage>,
) -> mpsc::Receiver<RelayEvent> {
    let (bridge, rx) = SseBridge::new(32);
    tokio::spawn(run_chat(state, messages, bridge));
    rx
}

/// Gateway first; on a connection failure (unreachable socket or
/// rejected handshake) fall back to the direct LLM call with the full
/// message list. Post-handshake failures surface as a single error
/// fragment with no fallback.
async fn run_chat(state: Arc<AppState>, messages: Vec<ChatMessage>, mut bridge: SseBridge) {
    let message = messages
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default();

    let gateway = state.gateway_client();
    match gateway.chat(&message, bridge.sender()).await {
        Ok(()) => bridge.finish().await,
        Err(err) if err.is_connection_failure() => {
            warn!(
                component = "chat",
                event = "chat.gateway.unreachable",
                error = %err,
                "Gateway unreachable, trying direct fallback"
            );
            match state.fallback() {
                Some(fallback) => match fallback.stream_chat(&messages, bridge.sender()).await {
                    Ok(()) => bridge.finish().await,
                    Err(fallback_err) => {
                        warn!(
                            component = "chat",
                            event = "chat.fallback.failed",
                            error = %fallback_err,
                            "Fallback call failed after gateway failure"
                        );
                        bridge
                            .error(format!(
                                "gateway and fallback both failed: {fallback_err}"
                            ))
                            .await;
                        bridge.finish().await;
                    }
                },
                None => {
                    bridge.error(err.to_string()).await;
                    bridge.finish().await;
                }
            }
        }
        Err(err) => {
            bridge.error(err.to_string()).await;
            bridge.finish().await;
        }
    }
}
