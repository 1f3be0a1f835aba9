//! Streamable HTTP transport for MCP
//!
//! This module implements [`HttpTransport`], which speaks the Streamable HTTP
//! transport. Every outbound JSON-RPC message is sent as an HTTP POST. The
//! server may reply with:
//!
//! - `application/json` -- a direct JSON response body
//! - `text/event-stream` -- an SSE stream carrying one or more JSON-RPC
//!   messages
//! - `202 Accepted` -- an acknowledgement with no body (used for
//!   notifications)
//!
//! # Session management
//!
//! After a successful `initialize` POST the server MAY return an
//! `MCP-Session-Id` response header. When present, this value is stored and
//! attached to every subsequent POST. If the server returns `404` while a
//! session is active the session is cleared and
//! `McpClientError::Mcp("mcp session expired")` is returned.
//!
//! [`Transport::close`] terminates an active session with an HTTP DELETE.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use tokio::sync::{mpsc, RwLock};

use crate::error::{McpClientError, Result};
use crate::mcp::transport::event_stream::SseParser;
use crate::mcp::transport::{queued_messages, SharedReceiver, Transport};
use crate::mcp::types::LATEST_PROTOCOL_VERSION;

/// Streamable HTTP transport.
///
/// # Examples
///
/// ```no_run
/// use std::collections::HashMap;
/// use std::time::Duration;
/// use url::Url;
/// use mcp_remote_client::mcp::transport::http::HttpTransport;
///
/// # fn main() -> anyhow::Result<()> {
/// let transport = HttpTransport::new(
///     Url::parse("http://localhost:3000/mcp")?,
///     HashMap::new(),
///     Duration::from_secs(30),
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpTransport {
    /// Underlying reqwest HTTP client.
    http_client: reqwest::Client,
    /// MCP endpoint URL (POST target).
    endpoint: url::Url,
    /// Active session ID, populated after `initialize` succeeds.
    session_id: Arc<RwLock<Option<String>>>,
    /// Protocol version header value.
    protocol_version: String,
    /// Static extra headers merged into every request (e.g. Authorization).
    headers: HashMap<String, String>,
    /// Sender for inbound JSON-RPC message strings.
    response_tx: mpsc::UnboundedSender<String>,
    /// Shared receiver exposed via `receive()`.
    response_rx: SharedReceiver,
    /// Last SSE event ID, used for stream resumption via `Last-Event-ID`.
    last_event_id: Arc<RwLock<Option<String>>>,
}

impl HttpTransport {
    /// Construct a new [`HttpTransport`] targeting `endpoint`.
    ///
    /// The `headers` map is merged into every outbound request; auth headers
    /// go here. The `timeout` applies to each individual HTTP request. No
    /// network I/O is performed at construction time.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError::McpTransport`] if the HTTP client cannot be
    /// built (TLS initialisation failure).
    pub fn new(
        endpoint: url::Url,
        headers: HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                McpClientError::McpTransport(format!("failed to build HTTP client: {e}"))
            })?;

        let (response_tx, response_rx) = mpsc::unbounded_channel();

        Ok(Self {
            http_client,
            endpoint,
            session_id: Arc::new(RwLock::new(None)),
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            headers,
            response_tx,
            response_rx: Arc::new(tokio::sync::Mutex::new(response_rx)),
            last_event_id: Arc::new(RwLock::new(None)),
        })
    }

    /// Static headers attached to every request.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// The active session ID, if the server assigned one.
    pub async fn session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    async fn apply_session_headers(
        &self,
        mut req: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        if let Some(ref id) = *self.session_id.read().await {
            req = req.header("MCP-Session-Id", id.as_str());
        }
        for (k, v) in &self.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        req
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    /// Send a JSON-RPC message via HTTP POST to the MCP endpoint.
    ///
    /// Response handling by status and `Content-Type`:
    ///
    /// - `401 Unauthorized`: returns `McpClientError::McpAuth` carrying the
    ///   `WWW-Authenticate` value.
    /// - `404` (with active session): clears session; returns
    ///   `McpClientError::Mcp("mcp session expired")`.
    /// - `202 Accepted`: no-op (notification ACK).
    /// - `text/event-stream`: events are forwarded to `receive()` by a
    ///   background task.
    /// - anything else: the body is read and forwarded to `receive()`.
    async fn send(&self, message: String) -> Result<()> {
        let mut req = self
            .http_client
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream")
            .header("MCP-Protocol-Version", &self.protocol_version)
            .body(message);

        if let Some(ref id) = *self.last_event_id.read().await {
            req = req.header("Last-Event-ID", id.as_str());
        }
        let req = self.apply_session_headers(req).await;

        let response = req
            .send()
            .await
            .map_err(|e| McpClientError::McpTransport(format!("HTTP POST failed: {e}")))?;

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

        if status == reqwest::StatusCode::NOT_FOUND {
            let mut sid = self.session_id.write().await;
            if sid.take().is_some() {
                return Err(McpClientError::Mcp("mcp session expired".into()).into());
            }
            return Err(McpClientError::McpTransport("HTTP 404 Not Found".into()).into());
        }

        if status == reqwest::StatusCode::ACCEPTED {
            return Ok(());
        }

        if !status.is_success() {
            return Err(
                McpClientError::McpTransport(format!("HTTP POST returned status {status}")).into(),
            );
        }

        if let Some(new_session_id) = response
            .headers()
            .get("MCP-Session-Id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
        {
            let mut sid = self.session_id.write().await;
            if sid.is_none() {
                *sid = Some(new_session_id);
            }
        }

        let content_type = response
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.contains("text/event-stream") {
            let byte_stream = response.bytes_stream();
            let response_tx = self.response_tx.clone();
            let last_event_id = Arc::clone(&self.last_event_id);
            tokio::spawn(async move {
                forward_sse_stream(byte_stream, response_tx, last_event_id).await;
            });
        } else {
            let body = response.text().await.map_err(|e| {
                McpClientError::McpTransport(format!("failed to read response body: {e}"))
            })?;
            if !body.trim().is_empty() {
                let _ = self.response_tx.send(body);
            }
        }

        Ok(())
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        queued_messages(Arc::clone(&self.response_rx))
    }

    /// Always empty; HTTP failures surface from `send`.
    fn receive_err(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        Box::pin(futures::stream::empty())
    }

    /// Terminate the server session with an HTTP DELETE, if one is active.
    ///
    /// Servers that do not support explicit termination answer `405`; that
    /// is not an error.
    async fn close(&self) -> Result<()> {
        let Some(sid) = self.session_id.write().await.take() else {
            return Ok(());
        };

        let mut req = self
            .http_client
            .delete(self.endpoint.as_str())
            .header("MCP-Session-Id", sid.as_str())
            .header("MCP-Protocol-Version", &self.protocol_version);
        for (k, v) in &self.headers {
            req = req.header(k.as_str(), v.as_str());
        }

        match req.send().await {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) if resp.status() == reqwest::StatusCode::METHOD_NOT_ALLOWED => Ok(()),
            Ok(resp) => {
                tracing::debug!(status = %resp.status(), "MCP session DELETE rejected");
                Ok(())
            }
            Err(e) => {
                Err(McpClientError::McpTransport(format!("HTTP DELETE failed: {e}")).into())
            }
        }
    }
}

/// Forward the data of every non-ping SSE event in `byte_stream` to
/// `response_tx`, recording event IDs in `last_event_id`.
pub async fn forward_sse_stream(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>>,
    response_tx: mpsc::UnboundedSender<String>,
    last_event_id: Arc<RwLock<Option<String>>>,
) {
    use futures::StreamExt;

    tokio::pin!(byte_stream);
    let mut parser = SseParser::default();

    while let Some(chunk_result) = byte_stream.next().await {
        let chunk = match chunk_result {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!("MCP SSE response stream error: {e}");
                break;
            }
        };
        for event in parser.feed(&chunk) {
            if let Some(id) = event.id.clone() {
                *last_event_id.write().await = Some(id);
            }
            if !event.is_ping() && response_tx.send(event.data).is_err() {
                return;
            }
        }
    }

    if let Some(event) = parser.finish() {
        if !event.is_ping() {
            let _ = response_tx.send(event.data);
        }
    }
}
