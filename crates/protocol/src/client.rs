//! Client → Gateway request params

use serde::{Deserialize, Serialize};

/// Params of the `connect` request sent after the challenge event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub min_protocol: u32,
    pub max_protocol: u32,
    pub client: ClientInfo,
    pub role: String,
    pub auth: AuthParams,
}

impl ConnectParams {
    /// The handshake this relay always performs: protocol v3 only,
    /// operator role, token auth.
    pub fn operator(client: ClientInfo, token: impl Into<String>) -> Self {
        Self {
            min_protocol: crate::PROTOCOL_VERSION,
            max_protocol: crate::PROTOCOL_VERSION,
            client,
            role: "operator".to_string(),
            auth: AuthParams {
                token: token.into(),
            },
        }
    }
}

/// Descriptor identifying this client to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub id: String,
    pub version: String,
    pub platform: String,
    pub mode: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            id: "clawrelay".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            platform: "server".to_string(),
            mode: "operator".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthParams {
    pub token: String,
}

/// Params of the `agent` request carrying one user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentParams {
    pub agent_id: String,
    pub message: String,
    pub session_key: String,
    pub idempotency_key: String,
}

impl AgentParams {
    /// Address the fixed main agent/session; `idempotency_key` is fresh
    /// per call.
    pub fn main(message: impl Into<String>) -> Self {
        Self {
            agent_id: crate::AGENT_ID.to_string(),
            message: message.into(),
            session_key: crate::SESSION_KEY.to_string(),
            idempotency_key: crate::new_id(),
        }
    }
}

/// Params of the `chat.history` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    pub session_key: String,
    pub limit: u32,
}

impl Default for HistoryParams {
    fn default() -> Self {
        Self {
            session_key: crate::SESSION_KEY.to_string(),
            limit: crate::HISTORY_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentParams, ClientInfo, ConnectParams, HistoryParams};

    #[test]
    fn connect_params_wire_shape() {
        let params = ConnectParams::operator(ClientInfo::default(), "tok-123");
        let json = serde_json::to_value(&params).expect("serialize");

        assert_eq!(json["minProtocol"], 3);
        assert_eq!(json["maxProtocol"], 3);
        assert_eq!(json["role"], "operator");
        assert_eq!(json["auth"]["token"], "tok-123");
        assert_eq!(json["client"]["id"], "clawrelay");
    }

    #[test]
    fn agent_params_wire_shape() {
        let params = AgentParams::main("hi");
        let json = serde_json::to_value(&params).expect("serialize");

        assert_eq!(json["agentId"], "main");
        assert_eq!(json["message"], "hi");
        assert_eq!(json["sessionKey"], "agent:main:main");
        assert!(json["idempotencyKey"].as_str().is_some_and(|k| !k.is_empty()));
    }

    #[test]
    fn agent_params_fresh_idempotency_key_per_call() {
        let a = AgentParams::main("hi");
        let b = AgentParams::main("hi");
        assert_ne!(a.idempotency_key, b.idempotency_key);
    }

    #[test]
    fn history_params_defaults() {
        let json = serde_json::to_value(HistoryParams::default()).expect("serialize");
        assert_eq!(json["sessionKey"], "agent:main:main");
        assert_eq!(json["limit"], 100);
    }
}
