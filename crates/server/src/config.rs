//! Runtime configuration

use tracing::warn;

use crate::Args;

/// Resolved relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub gateway_url: String,
    pub gateway_token: String,
    pub fallback: Option<FallbackSettings>,
}

/// Settings for the direct LLM fallback; absent when no API key is set.
#[derive(Debug, Clone)]
pub struct FallbackSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
}

impl RelayConfig {
    pub fn from_args(args: Args) -> Self {
        // The LLM API key doubles as the gateway token when no dedicated
        // token is set.
        let gateway_token = args
            .gateway_token
            .or_else(|| args.fallback_api_key.clone())
            .unwrap_or_default();
        if gateway_token.is_empty() {
            warn!(
                component = "config",
                event = "config.gateway_token.missing",
                "No gateway token configured; the gateway handshake will likely be rejected"
            );
        }

        let fallback = args.fallback_api_key.map(|api_key| FallbackSettings {
            base_url: args.fallback_base_url,
            model: args.fallback_model,
            api_key,
        });

        Self {
            gateway_url: args.gateway_url,
            gateway_token,
            fallback,
        }
    }
}
