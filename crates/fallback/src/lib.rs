//! Clawrelay Fallback Client
//!
//! Direct streamed completion call against an OpenAI-compatible endpoint,
//! used when the gateway cannot be reached or authenticated. Deltas are
//! forwarded through the same relay channel the gateway adapter uses, so
//! the browser sees one framing regardless of the source.

use clawrelay_connector_core::{ChatMessage, RelayEvent};
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Default endpoint and model (Z.ai GLM).
pub const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";
pub const DEFAULT_MODEL: &str = "glm-4-plus";

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 4096;

/// Errors from the fallback completion call.
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("fallback request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fallback endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("delta channel closed")]
    ChannelClosed,
}

/// Client for the direct LLM path.
pub struct FallbackClient {
    base_url: String,
    model: String,
    api_key: String,
    http: reqwest::Client,
}

impl FallbackClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Run one streamed completion over the browser's full message list,
    /// forwarding each content delta as it arrives. Resolves on the
    /// endpoint's `[DONE]` sentinel or end of body.
    pub async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        deltas: mpsc::Sender<RelayEvent>,
    ) -> Result<(), FallbackError> {
        let url = format!(
            "{}/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        info!(
            component = "fallback",
            event = "fallback.request.started",
            model = %self.model,
            messages = messages.len(),
            "Falling back to direct completion call"
        );

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FallbackError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut lines = LineBuffer::default();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk?;
            for line in lines.push(&bytes) {
                match parse_data_line(&line) {
                    DataLine::Done => {
                        debug!(
                            component = "fallback",
                            event = "fallback.stream.completed",
                            "Fallback stream completed"
                        );
                        return Ok(());
                    }
                    DataLine::Delta(delta) => {
                        deltas
                            .send(RelayEvent::Delta(delta))
                            .await
                            .map_err(|_| FallbackError::ChannelClosed)?;
                    }
                    DataLine::Skip => {}
                }
            }
        }

        Ok(())
    }
}

/// Reassembles SSE lines from arbitrary byte chunks.
#[derive(Default)]
struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }
}

enum DataLine {
    /// The `[DONE]` sentinel.
    Done,
    /// A non-empty content delta.
    Delta(String),
    /// Anything else: comments, empty keep-alives, role/finish chunks.
    Skip,
}

fn parse_data_line(line: &str) -> DataLine {
    let Some(rest) = line.strip_prefix("data:") else {
        return DataLine::Skip;
    };
    let data = rest.trim();
    if data == "[DONE]" {
        return DataLine::Done;
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(data) else {
        return DataLine::Skip;
    };
    match value["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => DataLine::Delta(content.to_string()),
        _ => DataLine::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_data_line, DataLine, FallbackClient, LineBuffer};
    use clawrelay_connector_core::{ChatMessage, RelayEvent};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    /// Serve one canned HTTP response on an ephemeral port and return
    /// its base URL. The body is terminated by connection close.
    async fn serve_canned(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("http://{}", listener.local_addr().expect("addr"));
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            // Drain the request head before answering.
            let mut buf = vec![0u8; 8192];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "{status_line}\r\nContent-Type: text/event-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream
                .write_all(response.as_bytes())
                .await
                .expect("write response");
            // Wait for the client to hang up before dropping the socket.
            let _ = stream.read(&mut buf).await;
        });
        url
    }

    #[tokio::test]
    async fn streams_deltas_from_a_canned_completion() {
        let url = serve_canned(
            "HTTP/1.1 200 OK",
            concat!(
                "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"He\"}}]}\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n\n",
                "data: [DONE]\n\n",
            ),
        )
        .await;

        let client = FallbackClient::new(url, "glm-4-plus", "key");
        let (tx, mut rx) = mpsc::channel(16);
        client
            .stream_chat(&[ChatMessage::new("user", "hi")], tx)
            .await
            .expect("stream succeeds");

        let mut parts = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                RelayEvent::Delta(d) => parts.push(d),
                other => panic!("unexpected relay event: {:?}", other),
            }
        }
        assert_eq!(parts.concat(), "Hello");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let url = serve_canned("HTTP/1.1 401 Unauthorized", "{\"error\":\"bad key\"}").await;

        let client = FallbackClient::new(url, "glm-4-plus", "key");
        let (tx, _rx) = mpsc::channel(16);
        let err = client
            .stream_chat(&[ChatMessage::new("user", "hi")], tx)
            .await
            .expect_err("401 fails");
        match err {
            super::FallbackError::Status { status, .. } => assert_eq!(status, 401),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn parses_content_deltas() {
        let line = r#"data: {"choices":[{"delta":{"content":"He"}}]}"#;
        match parse_data_line(line) {
            DataLine::Delta(d) => assert_eq!(d, "He"),
            _ => panic!("expected delta"),
        }
    }

    #[test]
    fn recognizes_done_sentinel() {
        assert!(matches!(parse_data_line("data: [DONE]"), DataLine::Done));
        assert!(matches!(parse_data_line("data:[DONE]"), DataLine::Done));
    }

    #[test]
    fn skips_non_content_lines() {
        assert!(matches!(parse_data_line(""), DataLine::Skip));
        assert!(matches!(parse_data_line(": keep-alive"), DataLine::Skip));
        assert!(matches!(
            parse_data_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            DataLine::Skip
        ));
        assert!(matches!(
            parse_data_line(r#"data: {"choices":[{"delta":{"content":""}}]}"#),
            DataLine::Skip
        ));
        assert!(matches!(parse_data_line("data: not json"), DataLine::Skip));
    }

    #[test]
    fn reassembles_lines_across_chunk_boundaries() {
        let mut buffer = LineBuffer::default();

        let first = buffer.push(b"data: {\"choices\":[{\"delta\":{\"con");
        assert!(first.is_empty());

        let second = buffer.push(b"tent\":\"Hi\"}}]}\r\n\r\ndata: [DO");
        assert_eq!(second.len(), 2);
        match parse_data_line(&second[0]) {
            DataLine::Delta(d) => assert_eq!(d, "Hi"),
            _ => panic!("expected delta"),
        }
        assert!(second[1].is_empty());

        let third = buffer.push(b"NE]\n\n");
        assert!(matches!(parse_data_line(&third[0]), DataLine::Done));
    }
}
