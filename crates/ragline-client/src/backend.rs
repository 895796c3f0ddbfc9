//! RAG backend: single-shot JSON queries and server-sent event streams

use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource, retry::Never};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    stream::{BoxedEventChannel, EventChannel, SseEvent},
    types::QueryRequest,
};

/// Trait for RAG backends
#[async_trait]
pub trait Backend: Send + Sync {
    /// POST `{"query": question}` to `endpoint` and return the JSON body
    async fn query(&self, endpoint: &str, question: &str) -> Result<Value>;

    /// Whether this backend can open server-push channels at all
    fn supports_streaming(&self) -> bool {
        true
    }

    /// Open a server-sent event channel to `url`
    fn open_stream(&self, url: &str) -> Result<BoxedEventChannel>;
}

/// HTTP backend built on reqwest
#[derive(Debug, Clone, Default)]
pub struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create a new HTTP backend
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn query(&self, endpoint: &str, question: &str) -> Result<Value> {
        tracing::debug!("POST {}", endpoint);

        let response = self
            .client
            .post(endpoint)
            .json(&QueryRequest { query: question })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::status(status));
        }

        Ok(response.json().await?)
    }

    fn open_stream(&self, url: &str) -> Result<BoxedEventChannel> {
        let target = reqwest::Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
        tracing::debug!("GET {} (event stream)", target);

        let mut event_source = EventSource::new(self.client.get(target))
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;
        // One attempt only; a dropped connection surfaces as an error event.
        event_source.set_retry_policy(Box::new(Never));

        Ok(Box::new(HttpEventChannel { event_source }))
    }
}

/// Event channel backed by reqwest-eventsource
pub struct HttpEventChannel {
    event_source: EventSource,
}

#[async_trait]
impl EventChannel for HttpEventChannel {
    async fn next_event(&mut self) -> Option<SseEvent> {
        let event = self.event_source.next().await?;
        Some(match event {
            Ok(Event::Open) => SseEvent::Open,
            Ok(Event::Message(msg)) => SseEvent::Message { data: msg.data },
            Err(e) => SseEvent::Error {
                message: e.to_string(),
            },
        })
    }

    fn close(&mut self) {
        self.event_source.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port and return its base URL
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _addr) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
        });

        format!("http://{}", addr)
    }

    /// Read headers and any Content-Length body so the socket closes cleanly
    async fn read_request(stream: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let body_len = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + body_len {
                return;
            }
        }
    }

    #[tokio::test]
    async fn test_query_returns_json_body() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 16\r\nConnection: close\r\n\r\n{\"answer\":\"hi\"}\n",
        )
        .await;

        let body = HttpBackend::new()
            .query(&format!("{}/query", base), "q")
            .await
            .unwrap();
        assert_eq!(body["answer"], "hi");
    }

    #[tokio::test]
    async fn test_query_non_success_is_status_error() {
        let base = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let err = HttpBackend::new()
            .query(&format!("{}/query", base), "q")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Status { status: 503, .. }), "got: {}", err);
        assert_eq!(err.to_string(), "HTTP 503 Service Unavailable");
    }

    #[tokio::test]
    async fn test_event_channel_maps_stream_events() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\ndata: {\"delta\":\"Hel\"}\n\ndata: {\"done\":true}\n\n",
        )
        .await;

        let mut channel = HttpBackend::new()
            .open_stream(&format!("{}/stream?q=hi", base))
            .unwrap();

        assert_eq!(channel.next_event().await, Some(SseEvent::Open));
        assert_eq!(
            channel.next_event().await,
            Some(SseEvent::Message {
                data: r#"{"delta":"Hel"}"#.to_string()
            })
        );
        assert_eq!(
            channel.next_event().await,
            Some(SseEvent::Message {
                data: r#"{"done":true}"#.to_string()
            })
        );
        // Server hung up; no reconnect is attempted
        assert!(matches!(
            channel.next_event().await,
            Some(SseEvent::Error { .. })
        ));
        assert_eq!(channel.next_event().await, None);
        channel.close();
    }

    #[test]
    fn test_open_stream_rejects_relative_url() {
        let backend = HttpBackend::new();
        let err = backend.open_stream("/stream?q=hi").err().unwrap();
        assert!(matches!(err, Error::InvalidUrl(_)), "got: {}", err);
    }

    #[test]
    fn test_http_backend_supports_streaming() {
        assert!(HttpBackend::new().supports_streaming());
    }

    #[tokio::test]
    async fn test_query_unreachable_host_is_http_error() {
        let backend = HttpBackend::new();
        // Port 9 (discard) on localhost is closed in test environments
        let err = backend.query("http://127.0.0.1:9/query", "q").await.unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got: {}", err);
    }
}
