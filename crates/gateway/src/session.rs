//! Pure call-session state machine
//!
//! All protocol logic for one gateway call lives here as a pure,
//! synchronous function: `handle_frame(frame) -> effects`. No IO, no
//! async, no sockets — fully unit-testable. The async driver in
//! `client.rs` feeds it inbound frames and executes the effects.

use clawrelay_protocol::{
    error_message, AgentParams, AgentStream, ConnectParams, GatewayFrame, HistoryParams,
    HistoryPayload, EVENT_AGENT, EVENT_CONNECT_CHALLENGE, METHOD_AGENT, METHOD_CHAT_HISTORY,
    METHOD_CONNECT,
};
use serde_json::Value;

use crate::GatewayError;

/// The application call this session performs after authenticating.
#[derive(Debug, Clone)]
pub enum Call {
    /// Stream one `agent` reply.
    Agent { message: String },
    /// Resolve one `chat.history` request.
    History { params: HistoryParams },
}

/// Where the session currently is. The pre-socket `AwaitingOpen` phase
/// belongs to the driver; a session only exists once frames can arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    AwaitingChallenge,
    AwaitingConnectResult,
    AwaitingCallResult,
    Streaming,
    Done,
    Failed,
}

/// What the driver must do in response to an inbound frame.
#[derive(Debug)]
pub enum Effect {
    /// Write a frame to the socket.
    Send(GatewayFrame),
    /// Forward one content fragment downstream.
    Delta(String),
    /// The call resolved; `Some` carries the history payload.
    Complete(Option<Value>),
    /// The call failed terminally.
    Fail(GatewayError),
}

/// Per-connection state for exactly one chat or history call.
pub struct CallSession {
    phase: Phase,
    connect: ConnectParams,
    call: Call,
    connect_id: Option<String>,
    call_id: Option<String>,
}

impl CallSession {
    pub fn new(connect: ConnectParams, call: Call) -> Self {
        Self {
            phase: Phase::AwaitingChallenge,
            connect,
            call,
            connect_id: None,
            call_id: None,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// True once the `connect` handshake has been accepted.
    pub fn authenticated(&self) -> bool {
        matches!(
            self.phase,
            Phase::AwaitingCallResult | Phase::Streaming | Phase::Done
        )
    }

    /// Advance the session with one inbound frame.
    ///
    /// Frames that do not fit the current phase are ignored: a `res`
    /// whose id matches no outstanding request, any pre-auth message
    /// other than the challenge or the connect result, and event kinds
    /// this client does not know.
    pub fn handle_frame(&mut self, frame: GatewayFrame) -> Vec<Effect> {
        match self.phase {
            Phase::AwaitingChallenge => self.on_awaiting_challenge(frame),
            Phase::AwaitingConnectResult => self.on_awaiting_connect_result(frame),
            Phase::AwaitingCallResult => self.on_awaiting_call_result(frame),
            Phase::Streaming => self.on_streaming(frame),
            Phase::Done | Phase::Failed => Vec::new(),
        }
    }

    fn on_awaiting_challenge(&mut self, frame: GatewayFrame) -> Vec<Effect> {
        match frame {
            GatewayFrame::Event { event, .. } if event == EVENT_CONNECT_CHALLENGE => {
                // The challenge nonce is acknowledged by replying, not echoed.
                let id = clawrelay_protocol::new_id();
                let req = GatewayFrame::request(
                    id.clone(),
                    METHOD_CONNECT,
                    serde_json::to_value(&self.connect).unwrap_or(Value::Null),
                );
                self.connect_id = Some(id);
                self.phase = Phase::AwaitingConnectResult;
                vec![Effect::Send(req)]
            }
            _ => Vec::new(),
        }
    }

    fn on_awaiting_connect_result(&mut self, frame: GatewayFrame) -> Vec<Effect> {
        let GatewayFrame::Response { id, ok, error, .. } = frame else {
            return Vec::new();
        };
        if Some(id.as_str()) != self.connect_id.as_deref() {
            return Vec::new();
        }

        if !ok {
            self.phase = Phase::Failed;
            let message = error_message(error.as_ref(), "connection refused by gateway");
            return vec![Effect::Fail(GatewayError::Handshake(message))];
        }

        let (method, params) = match &self.call {
            Call::Agent { message } => (
                METHOD_AGENT,
                serde_json::to_value(AgentParams::main(message.clone())).unwrap_or(Value::Null),
            ),
            Call::History { params } => (
                METHOD_CHAT_HISTORY,
                serde_json::to_value(params).unwrap_or(Value::Null),
            ),
        };
        let id = clawrelay_protocol::new_id();
        let req = GatewayFrame::request(id.clone(), method, params);
        self.call_id = Some(id);
        self.phase = Phase::AwaitingCallResult;
        vec![Effect::Send(req)]
    }

    fn on_awaiting_call_result(&mut self, frame: GatewayFrame) -> Vec<Effect> {
        match frame {
            GatewayFrame::Response { id, ok, payload, error }
                if Some(id.as_str()) == self.call_id.as_deref() =>
            {
                if !ok {
                    self.phase = Phase::Failed;
                    let message = error_message(error.as_ref(), "request refused by gateway");
                    return vec![Effect::Fail(GatewayError::Request(message))];
                }
                match self.call {
                    Call::Agent { .. } => {
                        // Acceptance only — content arrives as events.
                        self.phase = Phase::Streaming;
                        Vec::new()
                    }
                    Call::History { .. } => {
                        let payload = payload
                            .filter(|p| serde_json::from_value::<HistoryPayload>(p.clone()).is_ok());
                        match payload {
                            Some(p) => {
                                self.phase = Phase::Done;
                                vec![Effect::Complete(Some(p))]
                            }
                            None => {
                                self.phase = Phase::Failed;
                                vec![Effect::Fail(GatewayError::Request(
                                    "malformed history payload".to_string(),
                                ))]
                            }
                        }
                    }
                }
            }
            // The gateway may start streaming before the call result lands.
            GatewayFrame::Event { .. } if matches!(self.call, Call::Agent { .. }) => {
                self.on_streaming(frame)
            }
            _ => Vec::new(),
        }
    }

    fn on_streaming(&mut self, frame: GatewayFrame) -> Vec<Effect> {
        let GatewayFrame::Event { event, payload, .. } = frame else {
            return Vec::new();
        };
        if event != EVENT_AGENT {
            return Vec::new();
        }
        let Some(payload) = payload else {
            return Vec::new();
        };
        // Unknown stream discriminators fail to parse and are skipped.
        match serde_json::from_value::<AgentStream>(payload) {
            Ok(AgentStream::Assistant { data }) => match data.delta {
                Some(delta) if !delta.is_empty() => vec![Effect::Delta(delta)],
                _ => Vec::new(),
            },
            Ok(AgentStream::Lifecycle { data }) => {
                if data.phase.as_deref() == Some(clawrelay_protocol::PHASE_END) {
                    self.phase = Phase::Done;
                    vec![Effect::Complete(None)]
                } else {
                    Vec::new()
                }
            }
            Err(_) => Vec::new(),
        }
    }
}
