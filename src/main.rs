//! mcp-remote-client - Invoke tools on a remote MCP endpoint
//!
#![doc = "mcp-remote-client - Invoke tools on a remote MCP endpoint"]
#![doc = "Main entry point for the mcp-remote-client command-line tool."]

use anyhow::Result;
use serde_json::{Map, Value};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mcp_remote_client::cli::{Cli, Commands};
use mcp_remote_client::config::ClientConfig;
use mcp_remote_client::error::McpClientError;
use mcp_remote_client::mcp::logging::CrossLayerProps;
use mcp_remote_client::mcp::service::{FeatureProps, McpClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = ClientConfig::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let client = McpClient::builder(config).build();

    let outcome = run(&client, cli.command).await;

    // Always release the connection or child process before exiting.
    if let Err(e) = client.disconnect().await {
        tracing::warn!("Failed to disconnect cleanly: {e:#}");
    }

    let output = outcome?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(client: &McpClient, command: Commands) -> Result<Value> {
    match command {
        Commands::Call { tool, input } => {
            tracing::info!("Invoking remote tool: {}", tool);
            let input = parse_object("--input", &input)?;
            client.execute_tool(&tool, input, None).await
        }
        Commands::Feature {
            domain,
            feature,
            args,
            request_id,
        } => {
            tracing::info!("Invoking remote feature: {}.{}", domain, feature);
            let args: Value = serde_json::from_str(&args).map_err(|e| {
                McpClientError::Config(format!("--args is not valid JSON: {}", e))
            })?;
            let ctx = request_id.map(|id| CrossLayerProps::with_id("requestId", id));
            client
                .execute_mcp_feature(&FeatureProps::new(domain, feature), args, ctx.as_ref())
                .await
        }
    }
}

fn parse_object(flag: &str, raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(McpClientError::Config(format!("{} must be a JSON object", flag)).into()),
        Err(e) => {
            Err(McpClientError::Config(format!("{} is not valid JSON: {}", flag, e)).into())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so that stdout carries only the tool output.
fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "mcp_remote_client=debug"
    } else {
        "mcp_remote_client=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
