//! MCP protocol types and JSON-RPC 2.0 primitives
//!
//! Wire types for the subset of the Model Context Protocol this client
//! speaks: the `initialize` handshake, `tools/call`, and `ping`. Struct fields
//! are `camelCase` on the wire via `#[serde(rename_all = "camelCase")]`. All
//! `Option<>` fields omit their key from JSON when `None`.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Protocol version constants
// ---------------------------------------------------------------------------

/// The most recent supported MCP protocol revision.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-11-25";

/// All protocol versions that this client accepts during negotiation.
///
/// Servers built against older SDKs commonly answer with one of the earlier
/// revisions; the subset of the protocol used here is identical across them.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &[
    LATEST_PROTOCOL_VERSION,
    "2025-06-18",
    "2025-03-26",
    "2024-11-05",
];

// ---------------------------------------------------------------------------
// JSON-RPC method constants
// ---------------------------------------------------------------------------

/// Lifecycle: client sends `initialize` to open a session.
pub const METHOD_INITIALIZE: &str = "initialize";
/// Lifecycle: client sends `notifications/initialized` after the server ACKs.
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
/// Keepalive ping.
pub const METHOD_PING: &str = "ping";
/// Invoke a named tool.
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// JSON-RPC error code returned for server requests this client cannot serve.
pub const METHOD_NOT_FOUND: i64 = -32601;

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 wire types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request object.
///
/// `jsonrpc` MUST always be `"2.0"`. `id` is `None` only for notifications.
///
/// # Examples
///
/// ```
/// use mcp_remote_client::mcp::types::JsonRpcRequest;
///
/// let req = JsonRpcRequest {
///     jsonrpc: "2.0".to_string(),
///     id: Some(serde_json::json!(1)),
///     method: "ping".to_string(),
///     params: None,
/// };
/// assert_eq!(req.jsonrpc, "2.0");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version identifier; always `"2.0"`.
    pub jsonrpc: String,
    /// Request correlation identifier. Present for requests, absent for notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    /// The method name to invoke.
    pub method: String,
    /// Optional method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// A JSON-RPC 2.0 response object.
///
/// Exactly one of `result` or `error` will be present in a valid response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version identifier; always `"2.0"`.
    pub jsonrpc: String,
    /// Mirrors the `id` from the corresponding request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    /// Successful result value; mutually exclusive with `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error object; mutually exclusive with `result`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC 2.0 error object.
///
/// Implements `Display` as `"JSON-RPC error {code}: {message}"`.
///
/// # Examples
///
/// ```
/// use mcp_remote_client::mcp::types::JsonRpcError;
///
/// let e = JsonRpcError { code: -32600, message: "Invalid Request".to_string(), data: None };
/// assert_eq!(e.to_string(), "JSON-RPC error -32600: Invalid Request");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code as defined by JSON-RPC 2.0 or MCP.
    pub code: i64,
    /// Human-readable error description.
    pub message: String,
    /// Optional additional error context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// A JSON-RPC 2.0 notification (a request with no `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// Protocol version identifier; always `"2.0"`.
    pub jsonrpc: String,
    /// The notification method name.
    pub method: String,
    /// Optional notification parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Handshake types
// ---------------------------------------------------------------------------

/// Identifies a client or server implementation by name and version.
///
/// # Examples
///
/// ```
/// use mcp_remote_client::mcp::types::Implementation;
///
/// let info = Implementation::new("billing-system", "1.0.0");
/// let json = serde_json::to_string(&info).unwrap();
/// assert!(!json.contains("description"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Implementation {
    /// Short name of the implementation.
    pub name: String,
    /// Semantic version string.
    pub version: String,
    /// Optional human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Implementation {
    /// Build an implementation identity without a description.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: None,
        }
    }
}

/// Capabilities advertised by this client during `initialize`.
///
/// The client never serves roots, sampling, or elicitation, so every field is
/// normally `None` and the object serializes as `{}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {
    /// Experimental, non-standard capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<serde_json::Value>,
    /// Roots capability descriptor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<serde_json::Value>,
    /// Sampling capability descriptor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling: Option<serde_json::Value>,
}

/// Capabilities advertised by the server in its `initialize` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    /// Present when the server exposes tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<serde_json::Value>,
    /// Present when the server exposes resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<serde_json::Value>,
    /// Present when the server exposes prompts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<serde_json::Value>,
    /// Present when the server accepts `logging/setLevel`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<serde_json::Value>,
    /// Experimental, non-standard capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<serde_json::Value>,
}

/// Parameters sent by the client in the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// The protocol version the client wishes to use.
    pub protocol_version: String,
    /// Capabilities advertised by this client.
    pub capabilities: ClientCapabilities,
    /// Information identifying this client implementation.
    pub client_info: Implementation,
}

/// Response returned by the server to an `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponse {
    /// The protocol version the server has selected for this session.
    pub protocol_version: String,
    /// Capabilities advertised by this server.
    #[serde(default)]
    pub capabilities: ServerCapabilities,
    /// Information identifying this server implementation.
    pub server_info: Implementation,
    /// Optional human-readable instructions for the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

// ---------------------------------------------------------------------------
// Tool call types
// ---------------------------------------------------------------------------

/// Parameters of a `tools/call` request, also used as the logged call record.
///
/// `input` and `arguments` always carry the same object: servers differ in
/// which key they read, so both are sent.
///
/// # Examples
///
/// ```
/// use mcp_remote_client::mcp::types::ToolCallRecord;
///
/// let mut input = serde_json::Map::new();
/// input.insert("a".into(), serde_json::json!(1));
/// let record = ToolCallRecord::new("call-1", "echo", input);
/// let json = serde_json::to_value(&record).unwrap();
/// assert_eq!(json["input"], json["arguments"]);
/// assert_eq!(json["name"], "echo");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Fresh per-call correlation identifier.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Tool input.
    pub input: serde_json::Map<String, serde_json::Value>,
    /// Same object as `input`.
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

impl ToolCallRecord {
    /// Build a record, duplicating `input` into `arguments`.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: input.clone(),
            input,
        }
    }
}

/// Result of a `tools/call` request, kept as the raw JSON the server sent.
///
/// Servers are not required to tag content items with `type`, so the result
/// is never rejected at decode time. Accessors read what is there.
///
/// # Examples
///
/// ```
/// use mcp_remote_client::mcp::types::CallToolResponse;
///
/// let resp = CallToolResponse::from(serde_json::json!({
///     "content": [{ "text": "{\"a\":1}" }]
/// }));
/// assert_eq!(resp.first_text(), Some("{\"a\":1}"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallToolResponse(serde_json::Value);

impl CallToolResponse {
    /// The `content` list, if the result carries one.
    pub fn content(&self) -> Option<&[serde_json::Value]> {
        self.0.get("content")?.as_array().map(Vec::as_slice)
    }

    /// `text` of the first content item, if it is a string.
    ///
    /// The item's `type` tag is not consulted.
    pub fn first_text(&self) -> Option<&str> {
        self.content()?.first()?.get("text")?.as_str()
    }

    /// Whether the tool flagged its output as an error.
    pub fn is_error(&self) -> bool {
        self.0
            .get("isError")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Typed view of the content items; unrecognised items map to
    /// [`ToolResponseContent::Unknown`].
    pub fn contents(&self) -> Vec<ToolResponseContent> {
        self.content()
            .unwrap_or_default()
            .iter()
            .map(|item| {
                serde_json::from_value(item.clone()).unwrap_or(ToolResponseContent::Unknown)
            })
            .collect()
    }

    /// The raw result object.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for CallToolResponse {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// A single content item in a tool response.
///
/// Discriminated by the `"type"` field on the wire.
///
/// # Examples
///
/// ```
/// use mcp_remote_client::mcp::types::ToolResponseContent;
///
/// let c: ToolResponseContent =
///     serde_json::from_str(r#"{"type":"text","text":"hello"}"#).unwrap();
/// assert_eq!(c, ToolResponseContent::Text { text: "hello".to_string() });
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolResponseContent {
    /// Plain text output.
    Text {
        /// The text content.
        text: String,
    },
    /// A base64-encoded image.
    Image {
        /// Base64-encoded image bytes.
        data: String,
        /// MIME type of the image (e.g. `"image/png"`).
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// An embedded resource.
    Resource {
        /// The raw resource contents.
        resource: serde_json::Value,
    },
    /// Any content type this client does not model.
    #[serde(other)]
    Unknown,
}
