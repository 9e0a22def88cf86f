//! SSE stream bridge
//!
//! Converts the relay's internal event stream into the browser-facing
//! SSE framing: `data: {"content": …}` per fragment, `data: {"error": …}`
//! for at most one error, and the literal `data: [DONE]` sentinel last.
//! The producer side guards against emitting after finalization.

use axum::response::sse::Event;
use clawrelay_connector_core::RelayEvent;
use serde_json::json;
use tokio::sync::mpsc;

/// Terminal sentinel, sent verbatim as the final SSE data line.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Producer-side handle feeding one SSE response stream.
pub struct SseBridge {
    tx: mpsc::Sender<RelayEvent>,
    finished: bool,
}

impl SseBridge {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<RelayEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                finished: false,
            },
            rx,
        )
    }

    /// A plain sender for delta producers (gateway or fallback).
    pub fn sender(&self) -> mpsc::Sender<RelayEvent> {
        self.tx.clone()
    }

    /// Emit one error fragment. Dropped once the stream is finalized.
    pub async fn error(&mut self, message: impl Into<String>) {
        if self.finished {
            return;
        }
        let _ = self.tx.send(RelayEvent::Error(message.into())).await;
    }

    /// Emit the terminal sentinel. Idempotent: only the first call sends.
    pub async fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let _ = self.tx.send(RelayEvent::Done).await;
    }
}

/// The SSE data line for one relay event.
pub fn frame_payload(event: &RelayEvent) -> String {
    match event {
        RelayEvent::Delta(content) => json!({ "content": content }).to_string(),
        RelayEvent::Error(message) => json!({ "error": message }).to_string(),
        RelayEvent::Done => DONE_SENTINEL.to_string(),
    }
}

/// Frame one relay event as an SSE event.
pub fn sse_event(event: &RelayEvent) -> Event {
    Event::default().data(frame_payload(event))
}
