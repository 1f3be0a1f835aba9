//! Command-line interface definition for mcp-remote-client
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to invoke a remote tool or a remote feature.

use clap::{Parser, Subcommand};

/// mcp-remote-client - Invoke tools on a remote MCP endpoint
///
/// Connects over Streamable HTTP, legacy SSE, or a local subprocess,
/// runs one call, prints the JSON result, and disconnects.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcp-remote-client")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the connection URL from config
    #[arg(long)]
    pub url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Invoke a remote tool and print its JSON output
    Call {
        /// Tool name
        tool: String,

        /// Tool input as a JSON object
        #[arg(short, long, default_value = "{}")]
        input: String,
    },

    /// Invoke a remote feature through the `execute_feature` tool
    Feature {
        /// Domain owning the feature
        domain: String,

        /// Feature name within the domain
        feature: String,

        /// Feature arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,

        /// Correlation id forwarded to the remote layer
        #[arg(long)]
        request_id: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
