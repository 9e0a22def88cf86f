//! Async driver for one gateway call
//!
//! Opens the socket, feeds inbound frames to the pure `CallSession`
//! state machine, and executes its effects: writing frames, forwarding
//! deltas downstream, and resolving or failing the call.

use std::time::Duration;

use clawrelay_connector_core::RelayEvent;
use clawrelay_protocol::{ClientInfo, ConnectParams, GatewayFrame, HistoryParams, HistoryPayload};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::session::{Call, CallSession, Effect, Phase};
use crate::GatewayError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Bound on the socket-open phase.
pub const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Wall-clock bound on a whole chat call, measured from request start.
pub const CHAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Wall-clock bound on a whole history call.
pub const HISTORY_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for one-shot calls against an OpenClaw gateway.
///
/// Each call opens its own connection, authenticates, performs exactly
/// one application request, and closes. No connection is shared or
/// reused across calls.
pub struct GatewayClient {
    url: String,
    token: String,
    client_info: ClientInfo,
    open_timeout: Duration,
    chat_timeout: Duration,
    history_timeout: Duration,
}

impl GatewayClient {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            client_info: ClientInfo::default(),
            open_timeout: OPEN_TIMEOUT,
            chat_timeout: CHAT_TIMEOUT,
            history_timeout: HISTORY_TIMEOUT,
        }
    }

    /// Send one user message to the main agent and forward reply deltas
    /// into `deltas` as they arrive. Resolves once the gateway signals
    /// the end of the reply (or closes the socket mid-stream, which the
    /// gateway does after its own terminal conditions).
    pub async fn chat(
        &self,
        message: &str,
        deltas: mpsc::Sender<RelayEvent>,
    ) -> Result<(), GatewayError> {
        let deadline = Instant::now() + self.chat_timeout;
        let ws = self.open(deadline).await?;
        let call = Call::Agent {
            message: message.to_string(),
        };
        self.drive(ws, call, deadline, Some(deltas)).await?;
        debug!(
            component = "gateway",
            event = "gateway.chat.completed",
            "Chat call completed"
        );
        Ok(())
    }

    /// Fetch the shared session's message history.
    pub async fn history(&self) -> Result<HistoryPayload, GatewayError> {
        let deadline = Instant::now() + self.history_timeout;
        let ws = self.open(deadline).await?;
        let call = Call::History {
            params: HistoryParams::default(),
        };
        let payload = self.drive(ws, call, deadline, None).await?;
        match payload {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| GatewayError::Request(format!("malformed history payload: {e}"))),
            None => Err(GatewayError::Closed(
                "history call resolved without a payload".to_string(),
            )),
        }
    }

    async fn open(&self, deadline: Instant) -> Result<WsStream, GatewayError> {
        let open_deadline = deadline.min(Instant::now() + self.open_timeout);
        match timeout_at(open_deadline, connect_async(self.url.as_str())).await {
            Err(_) => Err(GatewayError::OpenTimeout),
            Ok(Err(e)) => Err(GatewayError::Connect(e.to_string())),
            Ok(Ok((ws, _))) => {
                debug!(
                    component = "gateway",
                    event = "gateway.socket.opened",
                    url = %self.url,
                    "Gateway socket opened"
                );
                Ok(ws)
            }
        }
    }

    /// Run the session loop until the call resolves, fails, or hits the
    /// deadline. Messages are handled strictly sequentially in arrival
    /// order; malformed frames are logged and skipped.
    async fn drive(
        &self,
        ws: WsStream,
        call: Call,
        deadline: Instant,
        deltas: Option<mpsc::Sender<RelayEvent>>,
    ) -> Result<Option<Value>, GatewayError> {
        let connect = ConnectParams::operator(self.client_info.clone(), self.token.clone());
        let mut session = CallSession::new(connect, call);
        let (mut sink, mut stream) = ws.split();

        loop {
            let next = match timeout_at(deadline, stream.next()).await {
                Err(_) => {
                    // Force-close; the caller decides how the timeout
                    // surfaces (error fragment for chat, empty history).
                    let _ = sink.send(Message::Close(None)).await;
                    return Err(GatewayError::Timeout);
                }
                Ok(item) => item,
            };

            let text = match next {
                None => return ended(&session, "socket closed"),
                Some(Err(e)) => return ended(&session, &e.to_string()),
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Ping(data))) => {
                    let _ = sink.send(Message::Pong(data)).await;
                    continue;
                }
                Some(Ok(Message::Close(_))) => return ended(&session, "close frame received"),
                Some(Ok(_)) => continue,
            };

            let frame: GatewayFrame = match serde_json::from_str(text.as_str()) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(
                        component = "gateway",
                        event = "gateway.frame.malformed",
                        error = %e,
                        payload_bytes = text.len(),
                        "Ignoring malformed gateway frame"
                    );
                    continue;
                }
            };

            for effect in session.handle_frame(frame) {
                match effect {
                    Effect::Send(frame) => {
                        let json = serde_json::to_string(&frame)
                            .map_err(|e| GatewayError::Closed(e.to_string()))?;
                        if let Err(e) = sink.send(Message::Text(json.into())).await {
                            return if session.authenticated() {
                                Err(GatewayError::Closed(e.to_string()))
                            } else {
                                Err(GatewayError::Connect(e.to_string()))
                            };
                        }
                    }
                    Effect::Delta(delta) => {
                        let Some(tx) = deltas.as_ref() else { continue };
                        if tx.send(RelayEvent::Delta(delta)).await.is_err() {
                            let _ = sink.send(Message::Close(None)).await;
                            return Err(GatewayError::ChannelClosed);
                        }
                    }
                    Effect::Complete(payload) => {
                        let _ = sink.send(Message::Close(None)).await;
                        return Ok(payload);
                    }
                    Effect::Fail(err) => {
                        warn!(
                            component = "gateway",
                            event = "gateway.call.failed",
                            error = %err,
                            "Gateway call failed"
                        );
                        let _ = sink.send(Message::Close(None)).await;
                        return Err(err);
                    }
                }
            }
        }
    }
}

/// Map an end-of-socket condition to the call's outcome.
///
/// Mid-stream the gateway closing the socket ends the reply (matching
/// its behavior after terminal conditions on its side); during the
/// handshake it is a connection failure; between call dispatch and the
/// call result it is a hard close.
fn ended(session: &CallSession, detail: &str) -> Result<Option<Value>, GatewayError> {
    match session.phase() {
        Phase::Streaming => Ok(None),
        Phase::AwaitingChallenge | Phase::AwaitingConnectResult => Err(GatewayError::Connect(
            format!("gateway closed during handshake: {detail}"),
        )),
        _ => Err(GatewayError::Closed(detail.to_string())),
    }
}
