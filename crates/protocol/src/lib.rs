//! Clawrelay Protocol
//!
//! Shared types for the OpenClaw gateway wire protocol (v3).
//! All gateway communication is JSON over one WebSocket, using three
//! frame kinds: request, response, and event.

use uuid::Uuid;

pub mod client;
pub mod frames;
pub mod server;

pub use client::{AgentParams, AuthParams, ClientInfo, ConnectParams, HistoryParams};
pub use frames::{error_message, GatewayFrame};
pub use server::{AgentStream, ChallengePayload, HistoryPayload};

/// Protocol version spoken by this client (both min and max).
pub const PROTOCOL_VERSION: u32 = 3;

/// The single agent addressed by every chat call.
pub const AGENT_ID: &str = "main";

/// Fixed conversation identifier shared across calls.
pub const SESSION_KEY: &str = "agent:main:main";

/// Number of messages requested by a history call.
pub const HISTORY_LIMIT: u32 = 100;

/// Method names.
pub const METHOD_CONNECT: &str = "connect";
pub const METHOD_AGENT: &str = "agent";
pub const METHOD_CHAT_HISTORY: &str = "chat.history";

/// Event names.
pub const EVENT_CONNECT_CHALLENGE: &str = "connect.challenge";
pub const EVENT_AGENT: &str = "agent";

/// Lifecycle phase that marks the end of a reply.
pub const PHASE_END: &str = "end";

/// Generate a new unique ID
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
