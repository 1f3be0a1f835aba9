//! Typed MCP lifecycle wrapper over [`JsonRpcClient`]
//!
//! This module provides two types that represent the two phases of an MCP
//! client session:
//!
//! - [`McpProtocol`] -- an uninitialized client. Call [`McpProtocol::initialize`]
//!   to perform the JSON-RPC `initialize` / `notifications/initialized`
//!   handshake and receive an [`InitializedMcpProtocol`].
//! - [`InitializedMcpProtocol`] -- a negotiated session exposing `tools/call`
//!   and `ping`.
//!
//! Both types share the [`JsonRpcClient`] with the read loop through an
//! `Arc`, so responses dispatched by the loop land in the same pending map
//! the protocol methods await.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{McpClientError, Result};
use crate::mcp::client::JsonRpcClient;
use crate::mcp::types::{
    CallToolResponse, ClientCapabilities, Implementation, InitializeParams, InitializeResponse,
    ToolCallRecord, LATEST_PROTOCOL_VERSION, METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_PING,
    METHOD_TOOLS_CALL, SUPPORTED_PROTOCOL_VERSIONS,
};

/// An uninitialized MCP client session.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use mcp_remote_client::mcp::client::{start_read_loop, JsonRpcClient};
/// use mcp_remote_client::mcp::protocol::McpProtocol;
/// use mcp_remote_client::mcp::transport::Transport;
/// use mcp_remote_client::mcp::types::{ClientCapabilities, Implementation};
///
/// # async fn demo(transport: Arc<dyn Transport>) -> anyhow::Result<()> {
/// let client = Arc::new(JsonRpcClient::new(transport, "billing"));
/// start_read_loop(CancellationToken::new(), Arc::clone(&client));
/// let session = McpProtocol::new(client)
///     .initialize(
///         Implementation::new("billing-system", "1.0.0"),
///         ClientCapabilities::default(),
///         None,
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct McpProtocol {
    client: Arc<JsonRpcClient>,
}

impl McpProtocol {
    /// Create a new uninitialized MCP protocol session.
    ///
    /// # Arguments
    ///
    /// * `client` - A [`JsonRpcClient`] whose read loop is already running
    ///   (see [`crate::mcp::client::start_read_loop`]).
    pub fn new(client: Arc<JsonRpcClient>) -> Self {
        Self { client }
    }

    /// Perform the MCP `initialize` / `notifications/initialized` handshake.
    ///
    /// Sends `initialize` with the given identity and capabilities, verifies
    /// that the server's chosen protocol version is in
    /// [`SUPPORTED_PROTOCOL_VERSIONS`], then sends
    /// `notifications/initialized`.
    ///
    /// # Arguments
    ///
    /// * `client_info` - Name and version of this client implementation.
    /// * `capabilities` - Capabilities this client advertises.
    /// * `timeout` - Optional deadline for the `initialize` response.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError::McpProtocolVersion`] if the server answers
    /// with an unsupported protocol version, or any error from the request or
    /// the notification send.
    pub async fn initialize(
        self,
        client_info: Implementation,
        capabilities: ClientCapabilities,
        timeout: Option<Duration>,
    ) -> Result<InitializedMcpProtocol> {
        let response: InitializeResponse = self
            .client
            .request(
                METHOD_INITIALIZE,
                InitializeParams {
                    protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
                    capabilities,
                    client_info,
                },
                timeout,
            )
            .await?;

        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&response.protocol_version.as_str()) {
            return Err(McpClientError::McpProtocolVersion {
                expected: SUPPORTED_PROTOCOL_VERSIONS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                got: response.protocol_version,
            }
            .into());
        }

        self.client
            .notify(METHOD_INITIALIZED, serde_json::json!({}))
            .await?;

        tracing::debug!(
            server = %response.server_info.name,
            version = %response.protocol_version,
            "MCP session initialized"
        );

        Ok(InitializedMcpProtocol {
            client: self.client,
            initialize_response: response,
        })
    }
}

/// A negotiated MCP client session.
#[derive(Debug)]
pub struct InitializedMcpProtocol {
    /// The underlying JSON-RPC client.
    pub client: Arc<JsonRpcClient>,
    /// The server's response to the `initialize` request.
    pub initialize_response: InitializeResponse,
}

impl InitializedMcpProtocol {
    /// Whether the server advertised the `tools` capability.
    pub fn has_tools(&self) -> bool {
        self.initialize_response.capabilities.tools.is_some()
    }

    /// Invoke a tool with the given call record as `tools/call` params.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, times out, or the server
    /// returns a JSON-RPC error.
    pub async fn call_tool(
        &self,
        record: &ToolCallRecord,
        timeout: Option<Duration>,
    ) -> Result<CallToolResponse> {
        self.client
            .request(METHOD_TOOLS_CALL, record, timeout)
            .await
    }

    /// Send a `ping` and wait for the empty response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or times out.
    pub async fn ping(&self, timeout: Option<Duration>) -> Result<()> {
        let _: serde_json::Value = self
            .client
            .request(METHOD_PING, serde_json::json!({}), timeout)
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
