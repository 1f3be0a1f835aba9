//! Connection lifecycle for a single remote MCP endpoint
//!
//! [`ConnectionManager`] owns at most one [`LiveConnection`]. Connections are
//! established lazily on the first [`ConnectionManager::ensure_connected`]
//! call and rebuilt whenever a managed access token differs from the one the
//! live connection was built with.
//!
//! # State machine
//!
//! ```text
//! Disconnected --ensure_connected ok--> Connected
//! Connected    --token rotated-------> Disconnected --> (rebuild) --> Connected
//! Connected    --disconnect----------> Disconnected
//! Disconnected --disconnect----------> Disconnected (no-op)
//! ```
//!
//! All transitions happen under one async mutex, so concurrent callers
//! converge on a single connection attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{McpClientError, Result};
use crate::mcp::auth::{AuthStrategy, ResolvedCredential, TokenFormat};
use crate::mcp::client::{start_read_loop, JsonRpcClient};
use crate::mcp::config::{ConnectionConfig, CredentialsConfig};
use crate::mcp::protocol::{InitializedMcpProtocol, McpProtocol};
use crate::mcp::transport::{Transport, TransportFactory};
use crate::mcp::types::{CallToolResponse, ClientCapabilities, Implementation, ToolCallRecord};

/// An initialized MCP session over one transport.
///
/// Owns the read loop feeding its JSON-RPC client. Closing the session
/// cancels the loop, which fails any request still waiting for a response.
#[derive(Debug)]
pub struct McpSession {
    protocol: InitializedMcpProtocol,
    cancellation: CancellationToken,
    read_loop: std::sync::Mutex<Option<JoinHandle<()>>>,
    request_timeout: Option<Duration>,
}

impl McpSession {
    /// Start the read loop on `transport` and perform the MCP handshake.
    ///
    /// On failure the read loop is stopped and the transport closed before
    /// the error is returned.
    ///
    /// # Errors
    ///
    /// Returns any error from the `initialize` exchange.
    pub async fn open(
        transport: Arc<dyn Transport>,
        label: &str,
        client_info: Implementation,
        request_timeout: Option<Duration>,
    ) -> Result<Self> {
        let cancellation = CancellationToken::new();
        let client = Arc::new(JsonRpcClient::new(Arc::clone(&transport), label));
        let read_loop = start_read_loop(cancellation.clone(), Arc::clone(&client));

        let handshake = McpProtocol::new(client)
            .initialize(client_info, ClientCapabilities::default(), request_timeout)
            .await;

        match handshake {
            Ok(protocol) => Ok(Self {
                protocol,
                cancellation,
                read_loop: std::sync::Mutex::new(Some(read_loop)),
                request_timeout,
            }),
            Err(e) => {
                cancellation.cancel();
                let _ = read_loop.await;
                if let Err(close_err) = transport.close().await {
                    tracing::debug!("failed to close transport after handshake error: {close_err}");
                }
                Err(e)
            }
        }
    }

    /// Identity the server reported during the handshake.
    pub fn server_info(&self) -> &Implementation {
        &self.protocol.initialize_response.server_info
    }

    /// Invoke a tool through this session.
    ///
    /// # Errors
    ///
    /// Returns the transport or JSON-RPC error unchanged.
    pub async fn call_tool(&self, record: &ToolCallRecord) -> Result<CallToolResponse> {
        self.protocol.call_tool(record, self.request_timeout).await
    }

    /// Stop the read loop and release the transport.
    ///
    /// # Errors
    ///
    /// Returns the transport's close error.
    pub async fn close(&self) -> Result<()> {
        self.cancellation.cancel();
        let handle = match self.read_loop.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.protocol.client.transport().close().await
    }
}

/// The connection in effect, cleared as a unit.
#[derive(Debug)]
pub struct LiveConnection {
    /// Transport carrying the session.
    pub transport: Arc<dyn Transport>,
    /// Initialized session on `transport`.
    pub session: Arc<McpSession>,
    /// Managed token the connection was built with.
    pub last_seen_token: Option<String>,
}

/// Lazily connects to one MCP endpoint and reconnects on token rotation.
pub struct ConnectionManager {
    connection: ConnectionConfig,
    credentials: CredentialsConfig,
    format: TokenFormat,
    strategy: AuthStrategy,
    factory: Arc<dyn TransportFactory>,
    client_info: Implementation,
    request_timeout: Option<Duration>,
    state: Mutex<Option<LiveConnection>>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connection", &self.connection)
            .field("strategy", &self.strategy)
            .field("client_info", &self.client_info)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Create a disconnected manager.
    ///
    /// # Arguments
    ///
    /// * `connection` - Endpoint to connect to.
    /// * `credentials` - Header name and key configuration.
    /// * `format` - Token rendering for the auth header.
    /// * `strategy` - Authentication strategy selected for this client.
    /// * `factory` - Builds one transport per connection attempt.
    /// * `client_info` - Identity sent in the handshake.
    /// * `request_timeout` - Optional deadline for each JSON-RPC request.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connection: ConnectionConfig,
        credentials: CredentialsConfig,
        format: TokenFormat,
        strategy: AuthStrategy,
        factory: Arc<dyn TransportFactory>,
        client_info: Implementation,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            connection,
            credentials,
            format,
            strategy,
            factory,
            client_info,
            request_timeout,
            state: Mutex::new(None),
        }
    }

    /// The authentication strategy in use.
    pub fn strategy(&self) -> &AuthStrategy {
        &self.strategy
    }

    /// Return the live session, connecting first if needed.
    ///
    /// The credential is resolved on every call. A managed token that
    /// differs from the one the live connection was built with closes that
    /// connection and builds a new one.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError::ConnectionEstablishment`] wrapping the cause
    /// (credential resolution, unsupported transport kind, transport or
    /// handshake failure). The manager is left disconnected.
    pub async fn ensure_connected(&self) -> Result<Arc<McpSession>> {
        let mut state = self.state.lock().await;

        let credential = self
            .strategy
            .resolve()
            .await
            .map_err(|e| self.establishment_error(e))?;

        if let Some(live) = state.as_ref() {
            if !credential.rotated(live.last_seen_token.as_deref()) {
                return Ok(Arc::clone(&live.session));
            }
            tracing::info!(
                target = %self.connection.target(),
                "MCP access token rotated; reconnecting"
            );
        }

        if let Some(stale) = state.take() {
            if let Err(e) = stale.session.close().await {
                tracing::warn!("failed to close stale MCP connection: {e:#}");
            }
        }

        let live = self
            .establish(&credential)
            .await
            .map_err(|e| self.establishment_error(e))?;
        let session = Arc::clone(&live.session);
        *state = Some(live);
        Ok(session)
    }

    async fn establish(&self, credential: &ResolvedCredential) -> Result<LiveConnection> {
        let material = credential.material(&self.credentials, &self.format);
        let transport = self
            .factory
            .create(&self.connection, Some(&material))
            .await?;

        let session = McpSession::open(
            Arc::clone(&transport),
            &self.connection.target(),
            self.client_info.clone(),
            self.request_timeout,
        )
        .await?;

        tracing::info!(
            kind = %self.connection.kind,
            target = %self.connection.target(),
            server = %session.server_info().name,
            "MCP connection established"
        );

        Ok(LiveConnection {
            transport,
            session: Arc::new(session),
            last_seen_token: credential.rotation_marker(),
        })
    }

    fn establishment_error(&self, cause: anyhow::Error) -> anyhow::Error {
        cause.context(McpClientError::ConnectionEstablishment(
            self.connection.target(),
        ))
    }

    /// Close and clear the live connection, if any.
    ///
    /// Calling this while disconnected does nothing.
    ///
    /// # Errors
    ///
    /// Returns the transport's close error. The manager is disconnected
    /// either way.
    pub async fn disconnect(&self) -> Result<()> {
        let Some(live) = self.state.lock().await.take() else {
            return Ok(());
        };
        tracing::info!(target = %self.connection.target(), "MCP connection closed");
        live.session.close().await
    }

    /// Whether a live connection is held.
    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Managed token the live connection was built with.
    pub async fn last_seen_token(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .as_ref()
            .and_then(|live| live.last_seen_token.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
