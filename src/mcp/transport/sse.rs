//! Legacy HTTP+SSE transport for MCP
//!
//! [`SseTransport`] implements the two-endpoint transport used by servers
//! that predate Streamable HTTP:
//!
//! 1. The client opens a long-lived `GET` with `Accept: text/event-stream`.
//! 2. The server's first event is `endpoint`, whose data is the (usually
//!    relative) URL the client must POST its messages to.
//! 3. Every JSON-RPC message from the server arrives as a `message` event on
//!    the GET stream; POST responses carry no protocol data.
//!
//! The inbound stream ends when the server closes the GET stream.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::error::{McpClientError, Result};
use crate::mcp::transport::event_stream::SseParser;
use crate::mcp::transport::{queued_messages, SharedReceiver, Transport};

/// Event announcing the POST endpoint.
const ENDPOINT_EVENT: &str = "endpoint";
/// Event carrying a JSON-RPC message.
const MESSAGE_EVENT: &str = "message";

/// Legacy HTTP+SSE transport.
#[derive(Debug)]
pub struct SseTransport {
    /// Client for message POSTs (per-request timeout).
    http_client: reqwest::Client,
    /// Stream URL the session was opened against.
    stream_url: url::Url,
    /// POST target announced by the server.
    endpoint: url::Url,
    /// Static extra headers merged into every request.
    headers: HashMap<String, String>,
    /// Inbound `message` event payloads.
    inbound_rx: SharedReceiver,
    /// Background task reading the GET stream.
    reader: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SseTransport {
    /// Open the event stream at `url` and wait for the `endpoint` event.
    ///
    /// `timeout` bounds connection establishment, the wait for the endpoint
    /// announcement, and each message POST. The GET stream itself stays open
    /// for as long as the server keeps it open.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError::McpAuth`] on `401`,
    /// [`McpClientError::McpTransport`] if the stream cannot be opened, ends
    /// before announcing an endpoint, announces an endpoint on a different
    /// origin, or does not announce one within `timeout`.
    pub async fn connect(
        url: url::Url,
        headers: HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self> {
        let stream_client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                McpClientError::McpTransport(format!("failed to build HTTP client: {e}"))
            })?;
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                McpClientError::McpTransport(format!("failed to build HTTP client: {e}"))
            })?;

        let mut req = stream_client
            .get(url.as_str())
            .header("Accept", "text/event-stream");
        for (k, v) in &headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let response = tokio::time::timeout(timeout, req.send())
            .await
            .map_err(|_| McpClientError::McpTransport("SSE connect timed out".to_string()))?
            .map_err(|e| McpClientError::McpTransport(format!("SSE GET failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            let www_auth = response
                .headers()
                .get("WWW-Authenticate")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            return Err(McpClientError::McpAuth(www_auth).into());
        }
        if !status.is_success() {
            return Err(
                McpClientError::McpTransport(format!("SSE GET returned status {status}")).into(),
            );
        }

        let (endpoint_tx, endpoint_rx) = oneshot::channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
        let reader = tokio::spawn(read_event_stream(
            response.bytes_stream(),
            endpoint_tx,
            inbound_tx,
        ));

        let announced = match tokio::time::timeout(timeout, endpoint_rx).await {
            Ok(Ok(endpoint)) => endpoint,
            Ok(Err(_)) => {
                reader.abort();
                return Err(McpClientError::McpTransport(
                    "SSE stream closed before endpoint event".to_string(),
                )
                .into());
            }
            Err(_) => {
                reader.abort();
                return Err(McpClientError::McpTransport(
                    "timed out waiting for SSE endpoint event".to_string(),
                )
                .into());
            }
        };

        let endpoint = match resolve_endpoint(&url, &announced) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                reader.abort();
                return Err(e);
            }
        };
        tracing::debug!(endpoint = %endpoint, "MCP SSE endpoint announced");

        Ok(Self {
            http_client,
            stream_url: url,
            endpoint,
            headers,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            reader: std::sync::Mutex::new(Some(reader)),
        })
    }

    /// POST target announced by the server.
    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    /// Static headers attached to every request.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    fn stop_reader(&self) {
        let handle = match self.reader.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

/// Resolve the announced endpoint against the stream URL, rejecting a
/// different origin.
fn resolve_endpoint(stream_url: &url::Url, announced: &str) -> Result<url::Url> {
    let endpoint = stream_url.join(announced.trim()).map_err(|e| {
        McpClientError::McpTransport(format!("invalid SSE endpoint `{announced}`: {e}"))
    })?;
    if endpoint.origin() != stream_url.origin() {
        return Err(McpClientError::McpTransport(format!(
            "SSE endpoint origin does not match connection origin: {endpoint}"
        ))
        .into());
    }
    Ok(endpoint)
}

async fn read_event_stream(
    byte_stream: impl Stream<Item = reqwest::Result<bytes::Bytes>>,
    endpoint_tx: oneshot::Sender<String>,
    inbound_tx: mpsc::UnboundedSender<String>,
) {
    tokio::pin!(byte_stream);
    let mut parser = SseParser::default();
    let mut endpoint_tx = Some(endpoint_tx);

    while let Some(chunk) = byte_stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!("MCP SSE stream error: {e}");
                break;
            }
        };
        for event in parser.feed(&chunk) {
            let name = event.name().to_string();
            match name.as_str() {
                ENDPOINT_EVENT => {
                    if let Some(tx) = endpoint_tx.take() {
                        let _ = tx.send(event.data);
                    }
                }
                MESSAGE_EVENT if !event.is_ping() => {
                    if inbound_tx.send(event.data).is_err() {
                        return;
                    }
                }
                other => tracing::trace!(event = other, "MCP SSE: ignoring event"),
            }
        }
    }
    tracing::debug!("MCP SSE stream ended");
}

#[async_trait::async_trait]
impl Transport for SseTransport {
    /// POST a JSON-RPC message to the announced endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError::McpAuth`] on `401` and
    /// [`McpClientError::McpTransport`] on any other failure.
    async fn send(&self, message: String) -> Result<()> {
        let mut req = self
            .http_client
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .body(message);
        for (k, v) in &self.headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let response = req
            .send()
            .await
            .map_err(|e| McpClientError::McpTransport(format!("SSE POST failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            let www_auth = response
                .headers()
                .get("WWW-Authenticate")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            return Err(McpClientError::McpAuth(www_auth).into());
        }
        if !status.is_success() {
            return Err(McpClientError::McpTransport(format!(
                "SSE POST to {} returned status {status}",
                self.stream_url
            ))
            .into());
        }
        Ok(())
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        queued_messages(Arc::clone(&self.inbound_rx))
    }

    fn receive_err(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        Box::pin(futures::stream::empty())
    }

    /// Stop reading the event stream, which closes the GET connection.
    async fn close(&self) -> Result<()> {
        self.stop_reader();
        Ok(())
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.stop_reader();
    }
}
