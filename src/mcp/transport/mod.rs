//! MCP transport abstraction, implementations, and factory
//!
//! This module defines the [`Transport`] trait that all MCP transport
//! implementations satisfy, and [`create_transport`], which builds one from
//! a [`ConnectionConfig`] and optional [`AuthMaterial`]. Concrete
//! implementations live in submodules:
//!
//! - [`http::HttpTransport`] -- Streamable HTTP (`type: http`).
//! - [`sse::SseTransport`] -- legacy HTTP+SSE (`type: sse`).
//! - [`stdio::StdioTransport`] -- child process over stdin/stdout
//!   (`type: cli`).
//! - `fake::FakeTransport` -- in-process fake used in tests (cfg(test)
//!   only).
//!
//! # Design
//!
//! Callers `send` a serialized JSON-RPC string and `receive` a stream of
//! serialized JSON-RPC strings (one per logical message). Framing and session
//! management are the responsibility of each concrete implementation.
//! Building a transport performs at most one connection attempt or spawn;
//! nothing at this layer retries.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;

use crate::error::Result;
use crate::mcp::auth::{auth_headers, AuthMaterial};
use crate::mcp::config::{ConnectionConfig, ConnectionDescriptor};

pub mod event_stream;
pub mod http;
pub mod sse;
#[cfg(not(target_arch = "wasm32"))]
pub mod stdio;

#[cfg(test)]
pub mod fake;

/// Abstraction over MCP transport implementations.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send a complete JSON-RPC message string to the remote peer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::McpClientError::McpTransport`] if the
    /// underlying I/O operation fails, or
    /// [`crate::error::McpClientError::McpAuth`] if the peer rejects the
    /// credentials.
    async fn send(&self, message: String) -> Result<()>;

    /// Returns a stream of inbound JSON-RPC message strings.
    ///
    /// The stream ends when the transport is closed or the remote peer
    /// disconnects.
    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>>;

    /// Returns a stream of transport-level diagnostic strings.
    ///
    /// For stdio transports this carries the child's stderr. Diagnostic
    /// output is never an error condition.
    fn receive_err(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>>;

    /// Release the underlying connection or process.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Receiver half shared between a transport and the streams it hands out.
pub type SharedReceiver = Arc<tokio::sync::Mutex<tokio::sync::mpsc::UnboundedReceiver<String>>>;

/// Yield messages queued on `rx` until every sender is dropped.
///
/// Each poll holds the lock only while waiting for the next item, so a
/// later call to `receive` picks up where an earlier stream stopped.
pub(crate) fn queued_messages(
    rx: SharedReceiver,
) -> Pin<Box<dyn Stream<Item = String> + Send + 'static>> {
    Box::pin(futures::stream::unfold(rx, |rx| async move {
        let item = rx.lock().await.recv().await?;
        Some((item, rx))
    }))
}

/// Build a connected transport for `connection`.
///
/// Auth headers are `{ header or "Authorization": format(token) }` when
/// `auth` carries a non-empty token, and absent otherwise. Subprocess
/// transports receive no headers.
///
/// # Errors
///
/// Returns [`crate::error::McpClientError::UnsupportedTransportKind`] for an
/// unrecognised kind (and for `cli` on targets without process spawning),
/// [`crate::error::McpClientError::Config`] for an incomplete record, or the
/// transport's own error when connecting or spawning fails.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use mcp_remote_client::mcp::config::ConnectionConfig;
/// use mcp_remote_client::mcp::transport::create_transport;
///
/// # async fn demo() -> anyhow::Result<()> {
/// let conn = ConnectionConfig::http("http://localhost:3000/mcp");
/// let transport = create_transport(&conn, None, Duration::from_secs(30)).await?;
/// # Ok(())
/// # }
/// ```
pub async fn create_transport(
    connection: &ConnectionConfig,
    auth: Option<&AuthMaterial>,
    http_timeout: Duration,
) -> Result<Arc<dyn Transport>> {
    let headers = auth_headers(auth);

    match connection.descriptor()? {
        ConnectionDescriptor::RequestResponse { url } => Ok(Arc::new(http::HttpTransport::new(
            url,
            headers,
            http_timeout,
        )?)),
        ConnectionDescriptor::ServerPush { url } => Ok(Arc::new(
            sse::SseTransport::connect(url, headers, http_timeout).await?,
        )),
        #[cfg(not(target_arch = "wasm32"))]
        ConnectionDescriptor::Subprocess {
            executable,
            args,
            env,
            working_dir,
        } => Ok(Arc::new(stdio::StdioTransport::spawn(
            executable,
            args,
            env,
            working_dir,
        )?)),
        #[cfg(target_arch = "wasm32")]
        ConnectionDescriptor::Subprocess { .. } => {
            Err(crate::error::McpClientError::UnsupportedTransportKind(
                "cli (process spawning unavailable on this target)".to_string(),
            )
            .into())
        }
    }
}

/// Builds transports for the connection manager.
#[async_trait::async_trait]
pub trait TransportFactory: Send + Sync {
    /// Build one transport for `connection` authenticated with `auth`.
    async fn create(
        &self,
        connection: &ConnectionConfig,
        auth: Option<&AuthMaterial>,
    ) -> Result<Arc<dyn Transport>>;
}

/// Factory backed by [`create_transport`].
#[derive(Debug, Clone)]
pub struct DefaultTransportFactory {
    http_timeout: Duration,
}

impl DefaultTransportFactory {
    /// Factory applying `http_timeout` to HTTP requests.
    pub fn new(http_timeout: Duration) -> Self {
        Self { http_timeout }
    }
}

#[async_trait::async_trait]
impl TransportFactory for DefaultTransportFactory {
    async fn create(
        &self,
        connection: &ConnectionConfig,
        auth: Option<&AuthMaterial>,
    ) -> Result<Arc<dyn Transport>> {
        create_transport(connection, auth, self.http_timeout).await
    }
}
