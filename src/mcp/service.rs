//! Remote tool invocation
//!
//! [`McpClient`] is the surface application code uses to run tools on a
//! remote MCP endpoint. Each [`McpClient::execute_tool`] call:
//!
//! 1. makes sure a connection is live (connecting or reconnecting on token
//!    rotation);
//! 2. builds a [`ToolCallRecord`] with a fresh id;
//! 3. logs the request entry;
//! 4. sends `tools/call`; on failure logs the error entry and returns the
//!    original error;
//! 5. parses `content[0].text` as JSON;
//! 6. logs the response entry and returns the parsed value.
//!
//! In managed-token mode steps 1-5 run inside
//! [`OAuth2Manager::handle_401_and_retry`], so an authorization failure can
//! be retried with a refreshed token on a fresh connection.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::Instrument;

use crate::config::ClientConfig;
use crate::error::{McpClientError, Result};
use crate::mcp::auth::{AuthStrategy, OAuth2Manager, TokenFormat};
use crate::mcp::client::BoxFuture;
use crate::mcp::config::ToolLoggingConfig;
use crate::mcp::connection::ConnectionManager;
use crate::mcp::logging::{
    tool_call_span, CrossLayerProps, ToolCallLog, ToolCallLogEntry, TracingToolCallLog,
};
use crate::mcp::transport::{DefaultTransportFactory, TransportFactory};
use crate::mcp::types::{CallToolResponse, ToolCallRecord};

/// Tool every remote feature call is routed through.
pub const EXECUTE_FEATURE_TOOL: &str = "execute_feature";

/// Identifies a remote feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureProps {
    /// Domain owning the feature.
    pub domain: String,
    /// Feature name within the domain.
    pub function_name: String,
}

impl FeatureProps {
    /// Props for `function_name` in `domain`.
    pub fn new(domain: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            function_name: function_name.into(),
        }
    }
}

/// Client for one remote MCP endpoint.
///
/// # Examples
///
/// ```no_run
/// use mcp_remote_client::config::ClientConfig;
/// use mcp_remote_client::mcp::config::ConnectionConfig;
/// use mcp_remote_client::mcp::service::McpClient;
///
/// # async fn demo() -> anyhow::Result<()> {
/// let config = ClientConfig {
///     connection: ConnectionConfig::http("http://localhost:3000/mcp"),
///     ..Default::default()
/// };
/// let client = McpClient::builder(config).build();
///
/// let mut input = serde_json::Map::new();
/// input.insert("a".into(), serde_json::json!(1));
/// let output = client.execute_tool("echo", input, None).await?;
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
pub struct McpClient {
    connection: ConnectionManager,
    logging: ToolLoggingConfig,
    log: Arc<dyn ToolCallLog>,
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("connection", &self.connection)
            .field("logging", &self.logging)
            .finish_non_exhaustive()
    }
}

/// Builder for [`McpClient`].
pub struct McpClientBuilder {
    config: ClientConfig,
    oauth2: Option<Arc<dyn OAuth2Manager>>,
    factory: Option<Arc<dyn TransportFactory>>,
    log: Option<Arc<dyn ToolCallLog>>,
    token_format: Option<TokenFormat>,
}

impl McpClientBuilder {
    /// Use a managed token source. Ignored when a static key is configured.
    pub fn oauth2_manager(mut self, manager: Arc<dyn OAuth2Manager>) -> Self {
        self.oauth2 = Some(manager);
        self
    }

    /// Replace the transport factory.
    pub fn transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Replace the tool-call log sink.
    pub fn tool_call_log(mut self, log: Arc<dyn ToolCallLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Override the token rendering from configuration.
    pub fn token_format(mut self, format: TokenFormat) -> Self {
        self.token_format = Some(format);
        self
    }

    /// Build a disconnected client. Nothing is contacted until the first
    /// call.
    pub fn build(self) -> McpClient {
        let config = self.config;
        let strategy = AuthStrategy::select(&config.credentials, self.oauth2);
        let format = self
            .token_format
            .unwrap_or_else(|| TokenFormat::from_config(&config.credentials));
        let factory = self
            .factory
            .unwrap_or_else(|| Arc::new(DefaultTransportFactory::new(config.http_timeout())));

        tracing::debug!(
            kind = %config.connection.kind,
            target = %config.connection.target(),
            mode = ?strategy.mode(),
            "MCP client configured"
        );

        McpClient {
            connection: ConnectionManager::new(
                config.connection.clone(),
                config.credentials.clone(),
                format,
                strategy,
                factory,
                config.client_info(),
                config.request_timeout(),
            ),
            logging: config.logging,
            log: self.log.unwrap_or_else(|| Arc::new(TracingToolCallLog)),
        }
    }
}

impl McpClient {
    /// Start building a client from `config`.
    pub fn builder(config: ClientConfig) -> McpClientBuilder {
        McpClientBuilder {
            config,
            oauth2: None,
            factory: None,
            log: None,
            token_format: None,
        }
    }

    /// Connect now instead of on the first call.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError::ConnectionEstablishment`] if connecting
    /// fails.
    pub async fn connect(&self) -> Result<()> {
        self.connection.ensure_connected().await.map(|_| ())
    }

    /// Close the live connection, if any. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns the transport's close error.
    pub async fn disconnect(&self) -> Result<()> {
        self.connection.disconnect().await
    }

    /// Whether a live connection is held.
    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    /// Invoke `tool` with `input` and return its parsed JSON output.
    ///
    /// # Errors
    ///
    /// - [`McpClientError::ConnectionEstablishment`] if no connection could
    ///   be made; not logged as a tool error.
    /// - The original transport or JSON-RPC error if the call itself fails,
    ///   after an error entry has been logged.
    /// - [`McpClientError::MalformedResponsePayload`] if the first content
    ///   item is missing, not text, or not JSON.
    pub async fn execute_tool(
        &self,
        tool: &str,
        input: Map<String, Value>,
        ctx: Option<&CrossLayerProps>,
    ) -> Result<Value> {
        let record = ToolCallRecord::new(uuid::Uuid::new_v4().to_string(), tool, input);
        let span = tool_call_span(tool, &record.id, ctx);
        self.run(&record).instrument(span).await
    }

    /// [`execute_tool`](Self::execute_tool), deserializing the output.
    ///
    /// # Errors
    ///
    /// As [`execute_tool`](Self::execute_tool), plus
    /// [`McpClientError::MalformedResponsePayload`] if the output does not
    /// match `T`.
    pub async fn execute_tool_as<T: DeserializeOwned>(
        &self,
        tool: &str,
        input: Map<String, Value>,
        ctx: Option<&CrossLayerProps>,
    ) -> Result<T> {
        let output = self.execute_tool(tool, input, ctx).await?;
        serde_json::from_value(output).map_err(|e| {
            McpClientError::MalformedResponsePayload(format!(
                "output of `{tool}` does not match the expected shape: {e}"
            ))
            .into()
        })
    }

    /// Run a remote feature through the `execute_feature` tool.
    ///
    /// The tool input is `{domain, featureName, args, crossLayerProps}`;
    /// `crossLayerProps` is omitted when `ctx` is `None`.
    ///
    /// # Errors
    ///
    /// As [`execute_tool`](Self::execute_tool).
    pub async fn execute_mcp_feature(
        &self,
        props: &FeatureProps,
        input: Value,
        ctx: Option<&CrossLayerProps>,
    ) -> Result<Value> {
        let mut args = Map::new();
        args.insert("domain".into(), Value::String(props.domain.clone()));
        args.insert(
            "featureName".into(),
            Value::String(props.function_name.clone()),
        );
        args.insert("args".into(), input);
        if let Some(ctx) = ctx {
            args.insert("crossLayerProps".into(), serde_json::to_value(ctx)?);
        }
        self.execute_tool(EXECUTE_FEATURE_TOOL, args, ctx).await
    }

    /// Bind `props` into a reusable callable.
    pub fn create_mcp_feature(self: &Arc<Self>, props: FeatureProps) -> McpFeature {
        McpFeature {
            client: Arc::clone(self),
            props,
        }
    }

    async fn run(&self, record: &ToolCallRecord) -> Result<Value> {
        let output = match self.connection.strategy().manager() {
            Some(oauth2) => self.run_with_retry(oauth2, record).await?,
            None => self.attempt(record).await?,
        };

        self.log.record(
            self.logging.response_level,
            &ToolCallLogEntry::Response {
                tool: &record.name,
                response: &output,
            },
        );
        Ok(output)
    }

    async fn run_with_retry<'a>(
        &'a self,
        oauth2: &'a Arc<dyn OAuth2Manager>,
        record: &'a ToolCallRecord,
    ) -> Result<Value> {
        let attempt = move || Box::pin(self.attempt(record)) as BoxFuture<'_, Result<Value>>;
        oauth2.handle_401_and_retry(&attempt).await
    }

    async fn attempt(&self, record: &ToolCallRecord) -> Result<Value> {
        let session = self.connection.ensure_connected().await?;

        self.log.record(
            self.logging.request_level,
            &ToolCallLogEntry::Request {
                tool: &record.name,
                body: record,
            },
        );

        let response = match session.call_tool(record).await {
            Ok(response) => response,
            Err(e) => {
                let failure = McpClientError::RemoteCall {
                    tool: record.name.clone(),
                    cause: format!("{e:#}"),
                };
                self.log.record(
                    self.logging.error_level,
                    &ToolCallLogEntry::Error {
                        tool: &record.name,
                        error: &failure,
                    },
                );
                return Err(e);
            }
        };

        parse_output(&record.name, &response)
    }
}

/// Parse the first content item's text as JSON.
fn parse_output(tool: &str, response: &CallToolResponse) -> Result<Value> {
    let malformed = |detail: String| McpClientError::MalformedResponsePayload(detail);

    let items = response
        .content()
        .ok_or_else(|| malformed(format!("`{tool}` returned no content list")))?;
    let first = items
        .first()
        .ok_or_else(|| malformed(format!("`{tool}` returned an empty content list")))?;
    let text = first
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(format!("first content item of `{tool}` has no string text")))?;

    serde_json::from_str(text)
        .map_err(|e| malformed(format!("`{tool}` returned non-JSON text: {e}")).into())
}

/// A remote feature bound to a client.
#[derive(Debug, Clone)]
pub struct McpFeature {
    client: Arc<McpClient>,
    props: FeatureProps,
}

impl McpFeature {
    /// The bound feature.
    pub fn props(&self) -> &FeatureProps {
        &self.props
    }

    /// Run the feature with `input`.
    ///
    /// # Errors
    ///
    /// As [`McpClient::execute_mcp_feature`].
    pub async fn call(&self, input: Value, ctx: Option<&CrossLayerProps>) -> Result<Value> {
        self.client
            .execute_mcp_feature(&self.props, input, ctx)
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
