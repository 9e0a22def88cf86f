//! Application state

use clawrelay_fallback::FallbackClient;
use clawrelay_gateway::GatewayClient;

use crate::config::RelayConfig;

/// Shared state behind the HTTP handlers.
///
/// No connection state lives here: every chat and history call builds
/// its own gateway client and owns its socket for the call's lifetime.
pub struct AppState {
    config: RelayConfig,
    fallback: Option<FallbackClient>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        let fallback = config.fallback.as_ref().map(|settings| {
            FallbackClient::new(
                settings.base_url.as_str(),
                settings.model.as_str(),
                settings.api_key.as_str(),
            )
        });
        Self { config, fallback }
    }

    /// Build a gateway client for one call.
    pub fn gateway_client(&self) -> GatewayClient {
        GatewayClient::new(
            self.config.gateway_url.as_str(),
            self.config.gateway_token.as_str(),
        )
    }

    /// The fallback client, when an API key is configured.
    pub fn fallback(&self) -> Option<&FallbackClient> {
        self.fallback.as_ref()
    }
}
