//! Error types for mcp-remote-client
//!
//! This module defines all error types used throughout the crate, using
//! `thiserror` for ergonomic error handling. Fallible functions return
//! [`Result`], an `anyhow` alias, so callers can attach context with `?` while
//! still downcasting to [`McpClientError`] when they need to branch on a kind.

use thiserror::Error;

/// Main error type for mcp-remote-client operations
///
/// Covers connection establishment, transport I/O, JSON-RPC protocol
/// failures, remote tool errors, and configuration problems.
#[derive(Error, Debug)]
pub enum McpClientError {
    /// The connection descriptor names a transport kind this client cannot build
    #[error("Unsupported connection type: {0}")]
    UnsupportedTransportKind(String),

    /// Building the transport or performing the handshake failed
    ///
    /// The underlying cause is kept in the `anyhow` chain beneath this error.
    #[error("Failed to establish MCP connection: {0}")]
    ConnectionEstablishment(String),

    /// The remote tool call was rejected or the transport failed mid-call
    ///
    /// Only ever used for logging; callers receive the original error.
    #[error("remote call failed: tool={tool}, {cause}")]
    RemoteCall {
        /// Name of the tool that was invoked
        tool: String,
        /// Rendered cause chain of the original error
        cause: String,
    },

    /// The tool response did not carry a parseable JSON text payload
    #[error("Malformed MCP response payload: {0}")]
    MalformedResponsePayload(String),

    /// Transport-level I/O failure (spawn, pipe, HTTP request)
    #[error("MCP transport error: {0}")]
    McpTransport(String),

    /// No response arrived within the caller-supplied deadline
    #[error("MCP timeout waiting for `{method}` from {server}")]
    McpTimeout {
        /// Server the request was sent to
        server: String,
        /// JSON-RPC method that timed out
        method: String,
    },

    /// The server answered with a JSON-RPC error object
    #[error("MCP error: {0}")]
    Mcp(String),

    /// The server rejected the credentials (HTTP 401)
    #[error("MCP authorization failed: {0}")]
    McpAuth(String),

    /// The server negotiated a protocol version this client does not speak
    #[error("MCP protocol version mismatch: expected one of {expected:?}, got {got}")]
    McpProtocolVersion {
        /// Versions this client accepts
        expected: Vec<String>,
        /// Version the server selected
        got: String,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl McpClientError {
    /// Find an [`McpClientError`] matching `pred` anywhere in an `anyhow` chain.
    ///
    /// Connection failures wrap their cause, so a plain `downcast_ref` only
    /// sees the outermost layer.
    ///
    /// # Examples
    ///
    /// ```
    /// use mcp_remote_client::error::McpClientError;
    ///
    /// let err = anyhow::Error::new(McpClientError::UnsupportedTransportKind("ws".into()))
    ///     .context(McpClientError::ConnectionEstablishment("ws".into()));
    /// let found = McpClientError::find_in(&err, |e| {
    ///     matches!(e, McpClientError::UnsupportedTransportKind(_))
    /// });
    /// assert!(found.is_some());
    /// ```
    pub fn find_in(
        err: &anyhow::Error,
        pred: impl Fn(&McpClientError) -> bool,
    ) -> Option<&McpClientError> {
        err.chain()
            .filter_map(|cause| cause.downcast_ref::<McpClientError>())
            .find(|e| pred(*e))
    }

    /// Returns `true` if any layer of `err` is [`McpClientError::McpAuth`].
    pub fn is_unauthorized(err: &anyhow::Error) -> bool {
        Self::find_in(err, |e| matches!(e, McpClientError::McpAuth(_))).is_some()
    }

    /// Returns `true` if `err` reports a failed connection attempt.
    pub fn is_establishment_failure(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<McpClientError>(),
            Some(McpClientError::ConnectionEstablishment(_))
        )
    }
}

/// Result type alias for mcp-remote-client operations
///
/// Uses `anyhow::Error` as the error type, allowing rich error context and
/// easy propagation.
pub type Result<T> = anyhow::Result<T>;
