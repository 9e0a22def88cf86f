//! Clawrelay Server
//!
//! Relays browser chat requests to an OpenClaw gateway over its
//! WebSocket protocol, streaming replies back as Server-Sent Events,
//! with a direct LLM fallback when the gateway is unreachable.

mod api;
mod bridge;
mod chat;
mod config;
mod history;
mod logging;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::RelayConfig;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "clawrelay", about = "OpenClaw gateway chat relay")]
struct Args {
    /// Address to bind the HTTP server on.
    #[arg(long, default_value = "127.0.0.1", env = "CLAWRELAY_BIND")]
    bind: String,

    /// Port to bind the HTTP server on.
    #[arg(long, default_value_t = 4100, env = "CLAWRELAY_PORT")]
    port: u16,

    /// WebSocket URL of the OpenClaw gateway.
    #[arg(
        long,
        env = "OPENCLAW_GATEWAY_URL",
        default_value = "wss://oclaw.kaoohi.com"
    )]
    gateway_url: String,

    /// Auth token for the gateway; defaults to the fallback API key.
    #[arg(long, env = "OPENCLAW_GATEWAY_TOKEN", hide_env_values = true)]
    gateway_token: Option<String>,

    /// API key for the direct LLM fallback; unset disables the fallback.
    #[arg(long, env = "ZAI_API_KEY", hide_env_values = true)]
    fallback_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible fallback endpoint.
    #[arg(
        long,
        env = "ZAI_BASE_URL",
        default_value = clawrelay_fallback::DEFAULT_BASE_URL
    )]
    fallback_base_url: String,

    /// Model requested from the fallback endpoint.
    #[arg(long, env = "ZAI_MODEL", default_value = clawrelay_fallback::DEFAULT_MODEL)]
    fallback_model: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _logging = logging::init_logging()?;

    let addr: SocketAddr = SocketAddr::new(args.bind.parse()?, args.port);
    let config = RelayConfig::from_args(args);
    let state = Arc::new(AppState::new(config));

    let app = Router::new()
        .route("/chat", post(chat::chat_handler))
        .route("/history", get(history::history_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    info!(
        component = "server",
        event = "server.listening",
        addr = %addr,
        "Clawrelay listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
