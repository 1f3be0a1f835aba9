//! mcp-remote-client - Client adapter for remote MCP tools
//!
//! This library connects application code to a remote Model Context Protocol
//! endpoint and exposes a uniform "invoke remote tool" operation with
//! structured request/response/error logging.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `mcp`: transports, authentication, connection lifecycle, and the tool
//!   invocation pipeline
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use mcp_remote_client::{ClientConfig, McpClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::from_file("config.yaml")?;
//!     config.validate()?;
//!
//!     let client = McpClient::builder(config).build();
//!     let output = client
//!         .execute_tool("echo", serde_json::Map::new(), None)
//!         .await?;
//!     println!("{output}");
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod mcp;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{McpClientError, Result};
pub use mcp::service::{FeatureProps, McpClient, McpFeature};
