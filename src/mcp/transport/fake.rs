//! In-process fake transport for MCP unit tests
//!
//! This module provides [`FakeTransport`] and [`FakeTransportHandle`], an
//! in-process pair that replaces real network or process I/O in tests, plus
//! [`spawn_scripted_server`] and [`FakeTransportFactory`], which together
//! stand in for a remote MCP server behind the connection manager.
//!
//! # Channel Wiring
//!
//! From the **client** perspective:
//!
//! ```text
//! client send() -----> outbound_tx -----> outbound_rx (handle reads)
//! handle inbound_tx -> inbound_tx  -----> inbound_rx  (client receive())
//! ```

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

use crate::error::{McpClientError, Result};
use crate::mcp::auth::{auth_headers, AuthMaterial};
use crate::mcp::config::ConnectionConfig;
use crate::mcp::transport::{Transport, TransportFactory};
use crate::mcp::types::{JsonRpcError, LATEST_PROTOCOL_VERSION};

/// In-process fake transport.
#[derive(Debug)]
pub struct FakeTransport {
    outbound_tx: mpsc::UnboundedSender<String>,
    inbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    inbound_inject_tx: mpsc::UnboundedSender<String>,
    reject_unauthorized: bool,
    closed: Arc<AtomicBool>,
}

impl FakeTransport {
    /// Create a new `(FakeTransport, FakeTransportHandle)` pair.
    pub fn new() -> (Self, FakeTransportHandle) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        let transport = Self {
            outbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            inbound_inject_tx: inbound_tx.clone(),
            reject_unauthorized: false,
            closed: Arc::new(AtomicBool::new(false)),
        };

        let handle = FakeTransportHandle {
            outbound_rx,
            inbound_tx,
        };

        (transport, handle)
    }

    /// A transport whose every send fails with an HTTP-401-style error.
    pub fn unauthorized() -> (Self, FakeTransportHandle) {
        let (mut transport, handle) = Self::new();
        transport.reject_unauthorized = true;
        (transport, handle)
    }

    /// Inject a [`serde_json::Value`] as a server message.
    pub fn inject_response(&self, response: Value) {
        let serialized =
            serde_json::to_string(&response).expect("FakeTransport: failed to serialize response");
        self.inbound_inject_tx
            .send(serialized)
            .expect("FakeTransport: inbound channel closed before inject_response");
    }

    /// Flag set by [`Transport::close`].
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

/// The test-side handle for a [`FakeTransport`].
#[derive(Debug)]
pub struct FakeTransportHandle {
    /// Receives messages that the client sent via [`Transport::send`].
    pub outbound_rx: mpsc::UnboundedReceiver<String>,
    /// Sends server messages into the client's [`Transport::receive`] stream.
    pub inbound_tx: mpsc::UnboundedSender<String>,
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, message: String) -> Result<()> {
        if self.reject_unauthorized {
            return Err(McpClientError::McpAuth("Bearer error=\"invalid_token\"".into()).into());
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(McpClientError::McpTransport("FakeTransport closed".into()).into());
        }
        self.outbound_tx.send(message).map_err(|e| {
            McpClientError::McpTransport(format!("FakeTransport outbound channel closed: {}", e))
                .into()
        })
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        let rx = Arc::clone(&self.inbound_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let mut guard = rx.lock().await;
            let item = guard.recv().await?;
            drop(guard);
            Some((item, rx))
        }))
    }

    fn receive_err(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        Box::pin(futures::stream::empty())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Outcome of one scripted tool call.
pub type ToolResult = std::result::Result<Value, JsonRpcError>;

/// Tool behaviour for a scripted server: `(tool name, arguments)` to result.
pub type ToolHandler = Arc<dyn Fn(&str, &Value) -> ToolResult + Send + Sync>;

/// Tool handler returning `{"content":[{"type":"text","text": <args as JSON>}]}`.
pub fn echo_tool() -> ToolHandler {
    Arc::new(|_name: &str, args: &Value| -> ToolResult {
        Ok(serde_json::json!({
            "content": [{ "type": "text", "text": args.to_string() }]
        }))
    })
}

/// Answer `initialize` and `tools/call` on `handle` until it closes.
///
/// `tools/call` params are passed to `on_tool_call` as `(name, arguments)`;
/// the full params are pushed to `seen_calls`.
pub fn spawn_scripted_server(
    mut handle: FakeTransportHandle,
    on_tool_call: ToolHandler,
    seen_calls: Arc<std::sync::Mutex<Vec<Value>>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(raw) = handle.outbound_rx.recv().await {
            let Ok(msg) = serde_json::from_str::<Value>(&raw) else {
                continue;
            };
            let Some(id) = msg.get("id").cloned() else {
                continue;
            };
            let reply = match msg["method"].as_str() {
                Some("initialize") => serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {
                        "protocolVersion": LATEST_PROTOCOL_VERSION,
                        "capabilities": { "tools": {} },
                        "serverInfo": { "name": "scripted", "version": "1.0.0" }
                    }
                }),
                Some("tools/call") => {
                    let params = msg["params"].clone();
                    seen_calls.lock().unwrap().push(params.clone());
                    let name = params["name"].as_str().unwrap_or_default();
                    match on_tool_call(name, &params["arguments"]) {
                        Ok(result) => serde_json::json!({ "jsonrpc": "2.0", "id": id, "result": result }),
                        Err(error) => serde_json::json!({ "jsonrpc": "2.0", "id": id, "error": error }),
                    }
                }
                _ => serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32601, "message": "Method not found" }
                }),
            };
            if handle
                .inbound_tx
                .send(serde_json::to_string(&reply).unwrap())
                .is_err()
            {
                break;
            }
        }
    })
}

/// Factory building [`FakeTransport`]s backed by scripted servers.
///
/// Records every build attempt and the auth header each was built with.
pub struct FakeTransportFactory {
    on_tool_call: ToolHandler,
    attempts: AtomicUsize,
    headers_seen: std::sync::Mutex<Vec<std::collections::HashMap<String, String>>>,
    closed_flags: std::sync::Mutex<Vec<Arc<AtomicBool>>>,
    rejected_tokens: Vec<String>,
    fail_first: AtomicUsize,
    create_delay: Duration,
    /// Every `tools/call` params object received by any scripted server.
    pub seen_calls: Arc<std::sync::Mutex<Vec<Value>>>,
}

impl FakeTransportFactory {
    /// Factory whose servers answer tool calls with `on_tool_call`.
    pub fn new(on_tool_call: ToolHandler) -> Self {
        Self {
            on_tool_call,
            attempts: AtomicUsize::new(0),
            headers_seen: std::sync::Mutex::new(Vec::new()),
            closed_flags: std::sync::Mutex::new(Vec::new()),
            rejected_tokens: Vec::new(),
            fail_first: AtomicUsize::new(0),
            create_delay: Duration::from_millis(10),
            seen_calls: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Transports built with any of `tokens` reject every send as unauthorized.
    pub fn rejecting(mut self, tokens: &[&str]) -> Self {
        self.rejected_tokens = tokens.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Fail the first `n` builds with a transport error.
    pub fn failing_first(self, n: usize) -> Self {
        self.fail_first.store(n, Ordering::SeqCst);
        self
    }

    /// Number of build attempts so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Auth headers of every build, in order.
    pub fn headers_seen(&self) -> Vec<std::collections::HashMap<String, String>> {
        self.headers_seen.lock().unwrap().clone()
    }

    /// Number of built transports that have been closed.
    pub fn closed_count(&self) -> usize {
        self.closed_flags
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.load(Ordering::SeqCst))
            .count()
    }
}

#[async_trait::async_trait]
impl TransportFactory for FakeTransportFactory {
    async fn create(
        &self,
        connection: &ConnectionConfig,
        auth: Option<&AuthMaterial>,
    ) -> Result<Arc<dyn Transport>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        connection.descriptor()?;
        tokio::time::sleep(self.create_delay).await;

        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(McpClientError::McpTransport("connection refused".into()).into());
        }

        self.headers_seen.lock().unwrap().push(auth_headers(auth));

        let token = auth.and_then(|a| a.token.as_deref());
        let rejected = token.is_some_and(|t| self.rejected_tokens.iter().any(|r| r == t));
        let (transport, handle) = if rejected {
            FakeTransport::unauthorized()
        } else {
            FakeTransport::new()
        };
        self.closed_flags.lock().unwrap().push(transport.closed_flag());
        spawn_scripted_server(
            handle,
            Arc::clone(&self.on_tool_call),
            Arc::clone(&self.seen_calls),
        );
        Ok(Arc::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_send_delivers_to_handle_outbound_rx() {
        let (transport, mut handle) = FakeTransport::new();

        transport
            .send(r#"{"jsonrpc":"2.0","method":"ping"}"#.to_string())
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), handle.outbound_rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        assert_eq!(received, r#"{"jsonrpc":"2.0","method":"ping"}"#);
    }

    #[tokio::test]
    async fn test_receive_yields_injected_messages_in_order() {
        let (transport, handle) = FakeTransport::new();

        handle.inbound_tx.send(r#"{"via":"handle"}"#.to_string()).unwrap();
        transport.inject_response(serde_json::json!({"via": "inject_response"}));

        let mut stream = transport.receive();
        let m1: Value = serde_json::from_str(&stream.next().await.unwrap()).unwrap();
        let m2: Value = serde_json::from_str(&stream.next().await.unwrap()).unwrap();
        assert_eq!(m1["via"], "handle");
        assert_eq!(m2["via"], "inject_response");
    }

    #[tokio::test]
    async fn test_send_returns_error_when_handle_dropped() {
        let (transport, handle) = FakeTransport::new();
        drop(handle);
        assert!(transport.send("test".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_unauthorized_transport_rejects_sends() {
        let (transport, _handle) = FakeTransport::unauthorized();
        let err = transport.send("{}".to_string()).await.unwrap_err();
        assert!(McpClientError::is_unauthorized(&err));
    }

    #[tokio::test]
    async fn test_close_sets_flag_and_rejects_sends() {
        let (transport, _handle) = FakeTransport::new();
        let flag = transport.closed_flag();
        transport.close().await.unwrap();
        assert!(flag.load(Ordering::SeqCst));
        assert!(transport.send("{}".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_factory_counts_attempts_and_records_headers() {
        let factory = FakeTransportFactory::new(echo_tool());
        let conn = ConnectionConfig::http("http://fake/mcp");
        let auth = AuthMaterial {
            token: Some("t".to_string()),
            ..Default::default()
        };

        factory.create(&conn, Some(&auth)).await.unwrap();
        factory.create(&conn, None).await.unwrap();

        assert_eq!(factory.attempts(), 2);
        let headers = factory.headers_seen();
        assert_eq!(headers[0]["Authorization"], "t");
        assert!(headers[1].is_empty());
    }
}
