//! Transport-backed async JSON-RPC 2.0 client
//!
//! This module provides [`JsonRpcClient`], a JSON-RPC 2.0 client bound to a
//! single [`Transport`]. Requests are written straight through
//! [`Transport::send`] so that transport failures (including HTTP `401`)
//! surface to the caller of [`JsonRpcClient::request`]. Inbound traffic is
//! consumed by [`start_read_loop`], which resolves pending requests.
//!
//! # Design
//!
//! - In-flight requests are tracked in a `pending` map keyed by `u64` request
//!   ID. Each entry is a `oneshot::Sender` that receives the `result` or
//!   `error` value when the matching response arrives.
//! - Server-initiated requests are answered with `-32601 Method not found`;
//!   this client advertises no server-facing capabilities.
//! - A [`tokio_util::sync::CancellationToken`] stops the read loop cleanly and
//!   drops all pending senders so that awaiting callers receive an error.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{McpClientError, Result};
use crate::mcp::transport::Transport;
use crate::mcp::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND};

/// Convenience alias for a boxed, `Send`-safe async future.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// The pending-response map type: maps request ID to the oneshot sender.
type PendingMap =
    HashMap<u64, oneshot::Sender<std::result::Result<serde_json::Value, JsonRpcError>>>;

/// Async JSON-RPC 2.0 client bound to one transport.
///
/// Create one with [`JsonRpcClient::new`], then call [`start_read_loop`] to
/// process incoming messages. Issue requests with [`JsonRpcClient::request`]
/// and notifications with [`JsonRpcClient::notify`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use mcp_remote_client::mcp::client::{start_read_loop, JsonRpcClient};
/// use mcp_remote_client::mcp::transport::Transport;
///
/// fn wire(transport: Arc<dyn Transport>) -> Arc<JsonRpcClient> {
///     let client = Arc::new(JsonRpcClient::new(transport, "billing"));
///     let _handle = start_read_loop(CancellationToken::new(), Arc::clone(&client));
///     client
/// }
/// ```
pub struct JsonRpcClient {
    /// Monotonically increasing request ID counter.
    next_id: AtomicU64,
    /// In-flight requests waiting for a response.
    pending: Mutex<PendingMap>,
    /// Transport every outbound message is written to.
    transport: Arc<dyn Transport>,
    /// Label used in timeout errors.
    server: String,
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("server", &self.server)
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl JsonRpcClient {
    /// Create a new client writing to `transport`.
    ///
    /// # Arguments
    ///
    /// * `transport` - The transport carrying this session.
    /// * `server` - Human-readable label for the remote peer.
    pub fn new(transport: Arc<dyn Transport>, server: impl Into<String>) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            transport,
            server: server.into(),
        }
    }

    /// The transport this client writes to.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Send a JSON-RPC request and await the typed response.
    ///
    /// Assigns the next monotonic ID, registers the pending slot, writes the
    /// request to the transport, and waits for the matching response.
    ///
    /// # Arguments
    ///
    /// * `method` - The JSON-RPC method name.
    /// * `params` - Parameters to serialize into the `params` field.
    /// * `timeout` - Optional deadline. `None` waits until the response
    ///   arrives or the read loop exits.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the send fails (for example
    /// [`McpClientError::McpAuth`] on HTTP `401`).
    /// Returns [`McpClientError::McpTimeout`] if the deadline elapses.
    /// Returns [`McpClientError::McpTransport`] if the read loop exits first.
    /// Returns [`McpClientError::Mcp`] if the server returns an error response.
    /// Returns [`McpClientError::Serialization`] if (de)serialization fails.
    pub async fn request<P, R>(
        &self,
        method: &str,
        params: P,
        timeout: Option<Duration>,
    ) -> Result<R>
    where
        P: serde::Serialize + Send,
        R: serde::de::DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let message = serde_json::to_string(&JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(serde_json::json!(id)),
            method: method.to_string(),
            params: Some(serde_json::to_value(params).map_err(McpClientError::from)?),
        })
        .map_err(McpClientError::from)?;

        // Register before sending so a fast response is never lost.
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if let Err(e) = self.transport.send(message).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let outcome = match timeout {
            Some(deadline) => match tokio::time::timeout(deadline, rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.pending.lock().await.remove(&id);
                    return Err(McpClientError::McpTimeout {
                        server: self.server.clone(),
                        method: method.to_string(),
                    }
                    .into());
                }
            },
            None => rx.await,
        };

        // The oneshot was dropped (read loop exited) before a response arrived.
        let rpc_result = outcome.map_err(|_| {
            McpClientError::McpTransport("read loop exited before response arrived".to_string())
        })?;

        let value = rpc_result.map_err(|e| McpClientError::Mcp(e.to_string()))?;

        serde_json::from_value(value).map_err(|e| McpClientError::Serialization(e).into())
    }

    /// Send a JSON-RPC notification (no response expected).
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the send fails.
    pub async fn notify<P: serde::Serialize + Send>(&self, method: &str, params: P) -> Result<()> {
        let message = serde_json::to_string(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": serde_json::to_value(params).map_err(McpClientError::from)?
        }))
        .map_err(McpClientError::from)?;

        self.transport.send(message).await
    }

    /// Number of requests still awaiting a response.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    async fn fail_pending(&self) {
        self.pending.lock().await.clear();
    }
}

/// Start the JSON-RPC read loop as a background Tokio task.
///
/// The loop consumes [`Transport::receive`] on the client's transport and
/// dispatches each message:
///
/// - **Response** (has `"id"` and `"result"` or `"error"`): resolves the
///   matching pending sender.
/// - **Server-initiated request** (has `"id"` and `"method"`): answered with
///   JSON-RPC `-32601 Method not found`.
/// - **Notification** (has `"method"` but no `"id"`): logged and ignored.
///
/// When the token is cancelled or the inbound stream ends, all pending
/// senders are dropped so that in-flight `request()` calls fail instead of
/// blocking indefinitely.
pub fn start_read_loop(
    cancellation: CancellationToken,
    client: Arc<JsonRpcClient>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let transport = Arc::clone(&client.transport);
        let mut inbound = transport.receive();
        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    client.fail_pending().await;
                    break;
                }

                maybe_msg = inbound.next() => {
                    let Some(raw) = maybe_msg else {
                        tracing::debug!(server = %client.server, "MCP inbound stream ended");
                        client.fail_pending().await;
                        break;
                    };
                    dispatch_message(&raw, &client).await;
                }
            }
        }
    })
}

/// Classify and dispatch a single inbound JSON string.
async fn dispatch_message(raw: &str, client: &Arc<JsonRpcClient>) {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("MCP read loop: failed to parse inbound JSON: {e}");
            return;
        }
    };

    let has_id = value.get("id").is_some_and(|id| !id.is_null());
    let has_method = value.get("method").is_some();
    let has_result = value.get("result").is_some();
    let has_error = value.get("error").is_some();

    if has_id && (has_result || has_error) && !has_method {
        handle_response(value, client).await;
    } else if has_id && has_method {
        reject_server_request(value, client).await;
    } else if has_method {
        tracing::debug!(
            method = value["method"].as_str().unwrap_or_default(),
            "MCP read loop: ignoring server notification"
        );
    } else {
        tracing::debug!(
            "MCP read loop: received unclassifiable message; ignoring. \
             has_id={has_id} has_method={has_method} has_result={has_result} has_error={has_error}"
        );
    }
}

/// Resolve a pending request sender with the response value or error.
async fn handle_response(value: serde_json::Value, client: &Arc<JsonRpcClient>) {
    let id_val = &value["id"];
    let id = match id_val
        .as_u64()
        .or_else(|| id_val.as_str().and_then(|s| s.parse::<u64>().ok()))
    {
        Some(n) => n,
        None => {
            tracing::warn!("MCP read loop: response has non-integer id: {id_val}");
            return;
        }
    };

    let Some(tx) = client.pending.lock().await.remove(&id) else {
        tracing::debug!("MCP read loop: received response for unknown id {id}; ignoring");
        return;
    };

    let outcome = match value.get("error") {
        Some(error_val) => Err(serde_json::from_value::<JsonRpcError>(error_val.clone())
            .unwrap_or_else(|_| JsonRpcError {
                code: -32603,
                message: format!("malformed error object: {error_val}"),
                data: None,
            })),
        None => Ok(value
            .get("result")
            .cloned()
            .unwrap_or(serde_json::Value::Null)),
    };

    // The caller may have already timed out.
    let _ = tx.send(outcome);
}

/// Answer a server-initiated request with `Method not found`.
async fn reject_server_request(value: serde_json::Value, client: &Arc<JsonRpcClient>) {
    let method = value
        .get("method")
        .and_then(|m| m.as_str())
        .unwrap_or_default()
        .to_string();

    let response = JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id: value.get("id").cloned(),
        result: None,
        error: Some(JsonRpcError {
            code: METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
            data: None,
        }),
    };

    match serde_json::to_string(&response) {
        Ok(serialized) => {
            if let Err(e) = client.transport.send(serialized).await {
                tracing::debug!("MCP read loop: failed to reject server request '{method}': {e}");
            }
        }
        Err(e) => tracing::warn!("MCP read loop: failed to serialize rejection: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::transport::fake::{FakeTransport, FakeTransportHandle};

    /// Build a client over a fake transport with the read loop running.
    fn make_client() -> (Arc<JsonRpcClient>, FakeTransportHandle, CancellationToken) {
        let (transport, handle) = FakeTransport::new();
        let token = CancellationToken::new();
        let client = Arc::new(JsonRpcClient::new(Arc::new(transport), "fake"));
        start_read_loop(token.clone(), Arc::clone(&client));
        (client, handle, token)
    }

    /// Reply to the next outbound request with `result`.
    fn reply_once(mut handle: FakeTransportHandle, result: serde_json::Value) {
        tokio::spawn(async move {
            let sent = handle.outbound_rx.recv().await.unwrap();
            let req: serde_json::Value = serde_json::from_str(&sent).unwrap();
            let response = serde_json::json!({
                "jsonrpc": "2.0",
                "id": req["id"],
                "result": result
            });
            handle
                .inbound_tx
                .send(serde_json::to_string(&response).unwrap())
                .unwrap();
            // Keep the handle alive until the test finishes with the reply.
            tokio::time::sleep(Duration::from_millis(200)).await;
        });
    }

    #[tokio::test]
    async fn test_request_resolves_with_correct_result() {
        let (client, handle, _token) = make_client();
        reply_once(handle, serde_json::json!({ "ok": true }));

        let result: serde_json::Value = client
            .request("ping", serde_json::json!({}), Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(result["ok"], true);
    }

    #[tokio::test]
    async fn test_request_without_timeout_waits_for_response() {
        let (client, handle, _token) = make_client();
        reply_once(handle, serde_json::json!(7));

        let result: u64 = client
            .request("ping", serde_json::json!({}), None)
            .await
            .unwrap();
        assert_eq!(result, 7);
    }

    #[tokio::test]
    async fn test_request_timeout_fires_and_clears_pending() {
        let (client, _handle, _token) = make_client();

        let result: Result<serde_json::Value> = client
            .request(
                "tools/call",
                serde_json::json!({}),
                Some(Duration::from_millis(50)),
            )
            .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<McpClientError>(),
            Some(McpClientError::McpTimeout { .. })
        ));
        assert_eq!(client.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_send_failure_surfaces_and_clears_pending() {
        let (client, handle, _token) = make_client();
        drop(handle);

        let result: Result<serde_json::Value> =
            client.request("ping", serde_json::json!({}), None).await;

        assert!(result.is_err());
        assert_eq!(client.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_pending_request_fails_when_read_loop_cancelled() {
        let (client, _handle, token) = make_client();

        let client_clone = Arc::clone(&client);
        let request_task = tokio::spawn(async move {
            client_clone
                .request::<_, serde_json::Value>("tools/call", serde_json::json!({}), None)
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(2), request_task)
            .await
            .expect("request task did not complete after loop exit")
            .expect("task panicked");

        let err = outcome.unwrap_err();
        assert!(err.to_string().contains("read loop exited"));
    }

    #[tokio::test]
    async fn test_json_rpc_error_response_mapped_to_mcp_error() {
        let (client, mut handle, _token) = make_client();

        tokio::spawn(async move {
            let sent = handle.outbound_rx.recv().await.unwrap();
            let req: serde_json::Value = serde_json::from_str(&sent).unwrap();
            let response = serde_json::json!({
                "jsonrpc": "2.0",
                "id": req["id"],
                "error": { "code": -32602, "message": "Unknown tool: nope" }
            });
            handle
                .inbound_tx
                .send(serde_json::to_string(&response).unwrap())
                .unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        });

        let err = client
            .request::<_, serde_json::Value>("tools/call", serde_json::json!({}), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<McpClientError>(),
            Some(McpClientError::Mcp(msg)) if msg.contains("Unknown tool: nope")
        ));
    }

    #[tokio::test]
    async fn test_notify_sends_without_id() {
        let (client, mut handle, _token) = make_client();

        client
            .notify("notifications/initialized", serde_json::json!({}))
            .await
            .unwrap();

        let raw = handle.outbound_rx.recv().await.unwrap();
        let val: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(val["method"], "notifications/initialized");
        assert!(val.get("id").is_none(), "notifications must not have an id");
    }

    #[tokio::test]
    async fn test_server_request_answered_with_method_not_found() {
        let (_client, mut handle, _token) = make_client();

        handle
            .inbound_tx
            .send(r#"{"jsonrpc":"2.0","id":"srv-1","method":"sampling/createMessage","params":{}}"#.to_string())
            .unwrap();

        let raw = tokio::time::timeout(Duration::from_secs(2), handle.outbound_rx.recv())
            .await
            .expect("timed out")
            .unwrap();
        let val: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(val["id"], "srv-1");
        assert_eq!(val["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_multiple_concurrent_requests_resolved_correctly() {
        let (client, mut handle, _token) = make_client();

        tokio::spawn(async move {
            while let Some(raw) = handle.outbound_rx.recv().await {
                let req: serde_json::Value = serde_json::from_str(&raw).unwrap();
                let resp = serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": req["id"],
                    "result": { "echo": req["id"] }
                });
                if handle
                    .inbound_tx
                    .send(serde_json::to_string(&resp).unwrap())
                    .is_err()
                {
                    break;
                }
            }
        });

        let (r1, r2, r3) = tokio::join!(
            client.request::<_, serde_json::Value>("ping", serde_json::json!({}), None),
            client.request::<_, serde_json::Value>("ping", serde_json::json!({}), None),
            client.request::<_, serde_json::Value>("ping", serde_json::json!({}), None),
        );

        let ids: std::collections::HashSet<u64> = [r1.unwrap(), r2.unwrap(), r3.unwrap()]
            .into_iter()
            .map(|v| v["echo"].as_u64().unwrap())
            .collect();
        assert_eq!(ids.len(), 3, "each request should have a unique ID");
    }
}
