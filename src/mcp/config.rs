//! MCP connection configuration types
//!
//! This module defines the configuration records consumed by the transport
//! factory and the tool invocation pipeline: the raw [`ConnectionConfig`]
//! read from YAML, the validated [`ConnectionDescriptor`] built from it,
//! direct [`CredentialsConfig`], and per-phase [`ToolLoggingConfig`]
//! severities.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{McpClientError, Result};
use crate::mcp::logging::LogLevel;

/// Transport kind for Streamable HTTP request/response.
pub const TRANSPORT_HTTP: &str = "http";
/// Transport kind for legacy HTTP+SSE server push.
pub const TRANSPORT_SSE: &str = "sse";
/// Transport kind for a local subprocess over stdio.
pub const TRANSPORT_CLI: &str = "cli";

/// Raw connection record as it appears in configuration.
///
/// `type` selects the transport; the remaining fields are read according to
/// that kind. Convert to a [`ConnectionDescriptor`] before use.
///
/// # Examples
///
/// ```
/// use mcp_remote_client::mcp::config::ConnectionConfig;
///
/// let yaml = "type: http\nurl: http://localhost:3000/mcp\n";
/// let conn: ConnectionConfig = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(conn.kind, "http");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Transport kind: `http`, `sse`, or `cli`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Endpoint URL for `http` and `sse`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Executable path for `cli`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Arguments for `cli`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Extra environment variables for `cli`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    /// Working directory for `cli`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl ConnectionConfig {
    /// Streamable HTTP connection to `url`.
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            kind: TRANSPORT_HTTP.to_string(),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Legacy SSE connection to `url`.
    pub fn sse(url: impl Into<String>) -> Self {
        Self {
            kind: TRANSPORT_SSE.to_string(),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Subprocess connection running `path` with `args`.
    pub fn cli(path: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind: TRANSPORT_CLI.to_string(),
            path: Some(path.into()),
            args,
            ..Default::default()
        }
    }

    /// Short human-readable target, used in logs and error messages.
    pub fn target(&self) -> String {
        match self.kind.as_str() {
            TRANSPORT_CLI => self.path.clone().unwrap_or_default(),
            _ => self.url.clone().unwrap_or_default(),
        }
    }

    /// Build the validated descriptor for this record.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError::UnsupportedTransportKind`] for an unknown
    /// `type`, or [`McpClientError::Config`] when a required field is missing
    /// or the URL does not parse.
    pub fn descriptor(&self) -> Result<ConnectionDescriptor> {
        ConnectionDescriptor::try_from(self)
    }
}

/// Validated, immutable connection descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionDescriptor {
    /// Streamable HTTP: one POST per outbound message.
    RequestResponse {
        /// MCP endpoint.
        url: url::Url,
    },
    /// Legacy HTTP+SSE: a GET event stream plus POSTs to the announced endpoint.
    ServerPush {
        /// Event stream URL.
        url: url::Url,
    },
    /// Local child process speaking newline-delimited JSON over stdio.
    Subprocess {
        /// Executable to spawn.
        executable: PathBuf,
        /// Command-line arguments.
        args: Vec<String>,
        /// Environment applied on top of the inherited defaults.
        env: HashMap<String, String>,
        /// Working directory, if any.
        working_dir: Option<PathBuf>,
    },
}

impl TryFrom<&ConnectionConfig> for ConnectionDescriptor {
    type Error = anyhow::Error;

    fn try_from(config: &ConnectionConfig) -> Result<Self> {
        match config.kind.as_str() {
            TRANSPORT_HTTP => Ok(Self::RequestResponse {
                url: parse_url(config)?,
            }),
            TRANSPORT_SSE => Ok(Self::ServerPush {
                url: parse_url(config)?,
            }),
            TRANSPORT_CLI => {
                let path = config
                    .path
                    .as_deref()
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| {
                        McpClientError::Config("cli connection requires `path`".to_string())
                    })?;
                Ok(Self::Subprocess {
                    executable: PathBuf::from(path),
                    args: config.args.clone(),
                    env: config.env.clone(),
                    working_dir: config.cwd.clone(),
                })
            }
            other => Err(McpClientError::UnsupportedTransportKind(other.to_string()).into()),
        }
    }
}

fn parse_url(config: &ConnectionConfig) -> Result<url::Url> {
    let raw = config
        .url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| {
            McpClientError::Config(format!("{} connection requires `url`", config.kind))
        })?;
    url::Url::parse(raw)
        .map_err(|e| McpClientError::Config(format!("invalid connection url `{raw}`: {e}")).into())
}

/// How a raw token is rendered into the auth header value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialFormat {
    /// The token is sent verbatim.
    #[default]
    Raw,
    /// `Bearer <token>`.
    Bearer,
    /// `<prefix><token>`, using [`CredentialsConfig::prefix`].
    Prefix,
}

/// Direct credentials supplied in configuration.
///
/// A non-empty `key` selects static-token mode and takes precedence over any
/// managed-token capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Header carrying the credential; defaults to `Authorization`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,

    /// Static key or token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Rendering of the key into the header value.
    #[serde(default)]
    pub format: CredentialFormat,

    /// Prefix used when `format` is `prefix`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Per-phase severities for tool-call log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolLoggingConfig {
    /// Severity of the outbound request entry.
    #[serde(default = "default_info")]
    pub request_level: LogLevel,

    /// Severity of the parsed response entry.
    #[serde(default = "default_info")]
    pub response_level: LogLevel,

    /// Severity of the remote failure entry.
    #[serde(default = "default_error")]
    pub error_level: LogLevel,
}

fn default_info() -> LogLevel {
    LogLevel::Info
}

fn default_error() -> LogLevel {
    LogLevel::Error
}

impl Default for ToolLoggingConfig {
    fn default() -> Self {
        Self {
            request_level: default_info(),
            response_level: default_info(),
            error_level: default_error(),
        }
    }
}
