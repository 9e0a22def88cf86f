//! Clawrelay Gateway Client
//!
//! The protocol adapter for one logical call against an OpenClaw gateway:
//! open a WebSocket, perform the challenge/connect handshake, then either
//! stream one `agent` reply or resolve one `chat.history` request. The
//! adapter owns the socket for the lifetime of the call; nothing is reused
//! across calls.

pub mod client;
pub mod session;

pub use client::GatewayClient;
use thiserror::Error;

/// Errors terminating a gateway call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The socket never opened, or failed before the session authenticated.
    #[error("gateway connection failed: {0}")]
    Connect(String),

    /// The socket-open phase exceeded its bound.
    #[error("gateway connection timed out")]
    OpenTimeout,

    /// The gateway rejected the `connect` handshake.
    #[error("gateway handshake rejected: {0}")]
    Handshake(String),

    /// The application call was rejected after a successful handshake.
    #[error("gateway request failed: {0}")]
    Request(String),

    /// The call's wall-clock bound expired without a terminal signal.
    #[error("gateway call timed out")]
    Timeout,

    /// The gateway closed the socket before the call resolved.
    #[error("gateway closed the connection: {0}")]
    Closed(String),

    /// The downstream consumer went away mid-stream.
    #[error("delta channel closed")]
    ChannelClosed,
}

impl GatewayError {
    /// Failures that mean the gateway could not be reached or
    /// authenticated. During a chat call these trigger the fallback
    /// client; everything else is reported on the stream itself.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            GatewayError::Connect(_) | GatewayError::OpenTimeout | GatewayError::Handshake(_)
        )
    }
}
