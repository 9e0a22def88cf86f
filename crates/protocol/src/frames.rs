//! The gateway frame envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A gateway wire frame — the top-level message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GatewayFrame {
    /// Client → Server call.
    #[serde(rename = "req")]
    Request {
        id: String,
        method: String,
        params: Value,
    },

    /// Server → Client reply, correlated by `id`.
    #[serde(rename = "res")]
    Response {
        id: String,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },

    /// Server → Client unsolicited notification.
    #[serde(rename = "event")]
    Event {
        event: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
    },
}

impl GatewayFrame {
    /// Build a request frame with a serializable params struct.
    pub fn request(id: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        GatewayFrame::Request {
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// Extract a human-readable message from a response's `error` member.
///
/// The gateway is loose about the error shape: usually `{code, message}`,
/// sometimes a bare string. Absent or unrecognized shapes collapse to
/// the provided default.
pub fn error_message(error: Option<&Value>, default: &str) -> String {
    match error {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Object(map)) => map
            .get("message")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .unwrap_or(default)
            .to_string(),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{error_message, GatewayFrame};
    use serde_json::json;

    #[test]
    fn roundtrip_request() {
        let frame = GatewayFrame::request("req-1", "agent", json!({"agentId": "main"}));
        let serialized = serde_json::to_string(&frame).expect("serialize");
        assert!(serialized.contains(r#""type":"req""#));

        let reparsed: GatewayFrame = serde_json::from_str(&serialized).expect("reparse");
        match reparsed {
            GatewayFrame::Request { id, method, params } => {
                assert_eq!(id, "req-1");
                assert_eq!(method, "agent");
                assert_eq!(params["agentId"], "main");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn deserializes_response_with_error() {
        let json = r#"{"type":"res","id":"req-2","ok":false,"error":{"code":"auth","message":"bad token"}}"#;
        let parsed: GatewayFrame = serde_json::from_str(json).expect("parse res");
        match parsed {
            GatewayFrame::Response { id, ok, error, .. } => {
                assert_eq!(id, "req-2");
                assert!(!ok);
                assert_eq!(error_message(error.as_ref(), "fallback"), "bad token");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn deserializes_event_without_seq() {
        let json = r#"{"type":"event","event":"connect.challenge","payload":{"nonce":"abc"}}"#;
        let parsed: GatewayFrame = serde_json::from_str(json).expect("parse event");
        match parsed {
            GatewayFrame::Event {
                event,
                payload,
                seq,
            } => {
                assert_eq!(event, "connect.challenge");
                assert_eq!(payload.expect("payload")["nonce"], "abc");
                assert_eq!(seq, None);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn error_message_shapes() {
        assert_eq!(
            error_message(Some(&json!("socket closed")), "d"),
            "socket closed"
        );
        assert_eq!(
            error_message(Some(&json!({"message": "denied"})), "d"),
            "denied"
        );
        assert_eq!(error_message(Some(&json!({"code": 7})), "d"), "d");
        assert_eq!(error_message(None, "d"), "d");
    }
}
