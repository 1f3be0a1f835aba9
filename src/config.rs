//! Configuration management for mcp-remote-client
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{McpClientError, Result};
use crate::mcp::config::{
    ConnectionConfig, CredentialsConfig, ToolLoggingConfig, TRANSPORT_CLI, TRANSPORT_HTTP,
    TRANSPORT_SSE,
};
use crate::mcp::types::Implementation;

/// Main configuration structure for mcp-remote-client
///
/// Holds the endpoint to connect to, how to authenticate, how to log tool
/// calls, and the identity announced during the MCP handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Client name sent in the handshake
    #[serde(default = "default_name")]
    pub name: String,

    /// Client version sent in the handshake
    #[serde(default = "default_version")]
    pub version: String,

    /// Remote endpoint
    pub connection: ConnectionConfig,

    /// Direct credentials
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Tool-call log severities
    #[serde(default)]
    pub logging: ToolLoggingConfig,

    /// Per-request timeout for HTTP transports in seconds
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,

    /// Deadline for each JSON-RPC request in seconds; unset waits indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_seconds: Option<u64>,
}

fn default_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_http_timeout_seconds() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            connection: ConnectionConfig::http("http://localhost:3000/mcp"),
            credentials: CredentialsConfig::default(),
            logging: ToolLoggingConfig::default(),
            http_timeout_seconds: default_http_timeout_seconds(),
            request_timeout_seconds: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    /// Parse a YAML configuration file
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError::Config`] if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| McpClientError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| McpClientError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(name) = std::env::var("MCP_CLIENT_NAME") {
            self.name = name;
        }

        if let Ok(version) = std::env::var("MCP_CLIENT_VERSION") {
            self.version = version;
        }

        if let Ok(kind) = std::env::var("MCP_CLIENT_TRANSPORT") {
            self.connection.kind = kind.to_lowercase();
        }

        if let Ok(url) = std::env::var("MCP_CLIENT_URL") {
            self.connection.url = Some(url);
        }

        if let Ok(key) = std::env::var("MCP_CLIENT_KEY") {
            self.credentials.key = Some(key);
        }

        if let Ok(header) = std::env::var("MCP_CLIENT_HEADER") {
            self.credentials.header = Some(header);
        }

        if let Ok(timeout) = std::env::var("MCP_CLIENT_HTTP_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.http_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid MCP_CLIENT_HTTP_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(timeout) = std::env::var("MCP_CLIENT_REQUEST_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.request_timeout_seconds = Some(value);
            } else {
                tracing::warn!("Invalid MCP_CLIENT_REQUEST_TIMEOUT_SECONDS: {}", timeout);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(url) = &cli.url {
            self.connection.url = Some(url.clone());
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(McpClientError::Config("name cannot be empty".to_string()).into());
        }

        let valid_kinds = [TRANSPORT_HTTP, TRANSPORT_SSE, TRANSPORT_CLI];
        if !valid_kinds.contains(&self.connection.kind.as_str()) {
            return Err(McpClientError::Config(format!(
                "Invalid connection type: {}. Must be one of: {}",
                self.connection.kind,
                valid_kinds.join(", ")
            ))
            .into());
        }

        self.connection.descriptor()?;

        if self.http_timeout_seconds == 0 {
            return Err(McpClientError::Config(
                "http_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.request_timeout_seconds == Some(0) {
            return Err(McpClientError::Config(
                "request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Identity announced in the handshake
    pub fn client_info(&self) -> Implementation {
        Implementation::new(self.name.clone(), self.version.clone())
    }

    /// Per-request HTTP timeout
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    /// Optional JSON-RPC request deadline
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::config::CredentialFormat;
    use crate::mcp::logging::LogLevel;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.version, "1.0.0");
        assert_eq!(config.connection.kind, TRANSPORT_HTTP);
        assert_eq!(config.http_timeout_seconds, 30);
        assert!(config.request_timeout_seconds.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
name: billing-system
version: 2.1.0
connection:
  type: cli
  path: /usr/local/bin/billing-mcp
  args: ["--stdio"]
  env:
    BILLING_REGION: eu
credentials:
  header: X-Api-Key
  key: secret
  format: bearer
logging:
  request_level: debug
  error_level: warn
request_timeout_seconds: 10
"#;

        let config: ClientConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "billing-system");
        assert_eq!(config.connection.kind, TRANSPORT_CLI);
        assert_eq!(config.connection.args, vec!["--stdio".to_string()]);
        assert_eq!(config.connection.env["BILLING_REGION"], "eu");
        assert_eq!(config.credentials.format, CredentialFormat::Bearer);
        assert_eq!(config.logging.request_level, LogLevel::Debug);
        assert_eq!(config.logging.response_level, LogLevel::Info);
        assert_eq!(config.logging.error_level, LogLevel::Warn);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_kind() {
        let mut config = ClientConfig::default();
        config.connection.kind = "websocket".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid connection type"));
    }

    #[test]
    fn test_config_validation_missing_url() {
        let mut config = ClientConfig::default();
        config.connection.url = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeouts() {
        let mut config = ClientConfig::default();
        config.http_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.request_timeout_seconds = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_name() {
        let mut config = ClientConfig::default();
        config.name.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_info_uses_name_and_version() {
        let config = ClientConfig {
            name: "billing-system".to_string(),
            version: "3.0.0".to_string(),
            ..Default::default()
        };
        let info = config.client_info();
        assert_eq!(info.name, "billing-system");
        assert_eq!(info.version, "3.0.0");
    }
}
