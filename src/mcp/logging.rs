//! Structured tool-call logging
//!
//! Every remote tool invocation produces up to three entries with fixed
//! shapes that downstream log parsers rely on:
//!
//! | Phase    | Message               | Fields                    |
//! |----------|-----------------------|---------------------------|
//! | request  | `MCP client request`  | `tool`, `method`, `body`  |
//! | response | `MCP client response` | `tool`, `response`        |
//! | error    | `MCP client error`    | `tool`, `error`           |
//!
//! Entries go through the [`ToolCallLog`] sink. [`TracingToolCallLog`]
//! renders them as `tracing` events whose fields carry the JSON payloads.
//! Correlation identifiers supplied by the caller travel on the
//! `executeTool` span built by [`tool_call_span`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::McpClientError;
use crate::mcp::types::ToolCallRecord;

/// Severity of one tool-call log entry.
///
/// `Silent` suppresses the entry entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Finest-grained diagnostics.
    Trace,
    /// Debug diagnostics.
    Debug,
    /// Informational.
    Info,
    /// Warning.
    Warn,
    /// Error.
    Error,
    /// Not emitted.
    Silent,
}

impl std::str::FromStr for LogLevel {
    type Err = McpClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "silent" | "off" => Ok(Self::Silent),
            other => Err(McpClientError::Config(format!("unknown log level: {other}"))),
        }
    }
}

/// Correlation identifiers propagated across application layers.
///
/// Serialized as `{"logging":{"ids":[{...}]}}` when forwarded to a remote
/// feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossLayerProps {
    /// Logging correlation data.
    #[serde(default)]
    pub logging: CorrelationLogging,
}

/// Ordered correlation id maps, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationLogging {
    /// One map per layer, e.g. `{"requestId": "..."}`.
    #[serde(default)]
    pub ids: Vec<BTreeMap<String, String>>,
}

impl CrossLayerProps {
    /// Props carrying a single correlation id.
    pub fn with_id(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut ids = BTreeMap::new();
        ids.insert(key.into(), value.into());
        Self {
            logging: CorrelationLogging { ids: vec![ids] },
        }
    }

    /// Correlation ids flattened to `key=value` pairs joined by `,`.
    pub fn correlation(&self) -> String {
        self.logging
            .ids
            .iter()
            .flat_map(|layer| layer.iter().map(|(k, v)| format!("{k}={v}")))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// One tool-call log entry.
#[derive(Debug)]
pub enum ToolCallLogEntry<'a> {
    /// Outbound call about to be sent.
    Request {
        /// Tool name.
        tool: &'a str,
        /// Full call record.
        body: &'a ToolCallRecord,
    },
    /// Parsed tool output.
    Response {
        /// Tool name.
        tool: &'a str,
        /// Parsed output.
        response: &'a Value,
    },
    /// Remote call failure.
    Error {
        /// Tool name.
        tool: &'a str,
        /// The wrapped failure.
        error: &'a McpClientError,
    },
}

impl ToolCallLogEntry<'_> {
    /// Fixed request method recorded on request entries.
    pub const REQUEST_METHOD: &'static str = "POST";

    /// Log message for this entry's phase.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Request { .. } => "MCP client request",
            Self::Response { .. } => "MCP client response",
            Self::Error { .. } => "MCP client error",
        }
    }

    /// Tool name carried by the entry.
    pub fn tool(&self) -> &str {
        match self {
            Self::Request { tool, .. } | Self::Response { tool, .. } | Self::Error { tool, .. } => {
                tool
            }
        }
    }

    /// The entry's structured payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use mcp_remote_client::mcp::logging::ToolCallLogEntry;
    ///
    /// let response = serde_json::json!({"a": 1});
    /// let entry = ToolCallLogEntry::Response { tool: "echo", response: &response };
    /// assert_eq!(
    ///     entry.to_json(),
    ///     serde_json::json!({"tool": "echo", "response": {"a": 1}})
    /// );
    /// ```
    pub fn to_json(&self) -> Value {
        match self {
            Self::Request { tool, body } => serde_json::json!({
                "tool": tool,
                "method": Self::REQUEST_METHOD,
                "body": body,
            }),
            Self::Response { tool, response } => serde_json::json!({
                "tool": tool,
                "response": response,
            }),
            Self::Error { tool, error } => serde_json::json!({
                "tool": tool,
                "error": error.to_string(),
            }),
        }
    }
}

/// Sink for tool-call log entries.
pub trait ToolCallLog: Send + Sync {
    /// Record `entry` at `level`.
    fn record(&self, level: LogLevel, entry: &ToolCallLogEntry<'_>);
}

/// [`ToolCallLog`] emitting `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingToolCallLog;

macro_rules! emit_at {
    ($level:expr, $($rest:tt)+) => {
        match $level {
            LogLevel::Trace => tracing::trace!($($rest)+),
            LogLevel::Debug => tracing::debug!($($rest)+),
            LogLevel::Info => tracing::info!($($rest)+),
            LogLevel::Warn => tracing::warn!($($rest)+),
            LogLevel::Error => tracing::error!($($rest)+),
            LogLevel::Silent => {}
        }
    };
}

impl ToolCallLog for TracingToolCallLog {
    fn record(&self, level: LogLevel, entry: &ToolCallLogEntry<'_>) {
        match entry {
            ToolCallLogEntry::Request { tool, body } => {
                let body = serde_json::to_string(body).unwrap_or_default();
                emit_at!(
                    level,
                    tool = %tool,
                    method = ToolCallLogEntry::REQUEST_METHOD,
                    body = %body,
                    "MCP client request"
                );
            }
            ToolCallLogEntry::Response { tool, response } => {
                emit_at!(level, tool = %tool, response = %response, "MCP client response");
            }
            ToolCallLogEntry::Error { tool, error } => {
                emit_at!(level, tool = %tool, error = %error, "MCP client error");
            }
        }
    }
}

/// The `executeTool` span for one invocation.
pub fn tool_call_span(tool: &str, call_id: &str, ctx: Option<&CrossLayerProps>) -> tracing::Span {
    let correlation = ctx.map(CrossLayerProps::correlation).unwrap_or_default();
    tracing::info_span!(
        "executeTool",
        tool = %tool,
        call_id = %call_id,
        correlation = %correlation
    )
}

/// [`ToolCallLog`] that keeps entries in memory for assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingToolCallLog {
    entries: std::sync::Mutex<Vec<(LogLevel, &'static str, Value)>>,
}

#[cfg(test)]
impl RecordingToolCallLog {
    /// `(level, message, payload)` for every recorded entry.
    pub fn entries(&self) -> Vec<(LogLevel, &'static str, Value)> {
        self.entries.lock().unwrap().clone()
    }

    /// Payloads recorded with `message`.
    pub fn payloads(&self, message: &str) -> Vec<Value> {
        self.entries()
            .into_iter()
            .filter(|(_, m, _)| *m == message)
            .map(|(_, _, v)| v)
            .collect()
    }
}

#[cfg(test)]
impl ToolCallLog for RecordingToolCallLog {
    fn record(&self, level: LogLevel, entry: &ToolCallLogEntry<'_>) {
        if level == LogLevel::Silent {
            return;
        }
        self.entries
            .lock()
            .unwrap()
            .push((level, entry.message(), entry.to_json()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_deserializes_lowercase() {
        let level: LogLevel = serde_yaml::from_str("warn").unwrap();
        assert_eq!(level, LogLevel::Warn);
        assert!(serde_yaml::from_str::<LogLevel>("loud").is_err());
    }

    #[test]
    fn test_log_level_from_str_accepts_aliases() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("off".parse::<LogLevel>().unwrap(), LogLevel::Silent);
        assert!("nope".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_request_entry_shape() {
        let mut input = serde_json::Map::new();
        input.insert("a".into(), serde_json::json!(1));
        let record = ToolCallRecord::new("id-1", "echo", input);
        let entry = ToolCallLogEntry::Request {
            tool: "echo",
            body: &record,
        };

        assert_eq!(entry.message(), "MCP client request");
        assert_eq!(
            entry.to_json(),
            serde_json::json!({
                "tool": "echo",
                "method": "POST",
                "body": {
                    "id": "id-1",
                    "name": "echo",
                    "input": {"a": 1},
                    "arguments": {"a": 1}
                }
            })
        );
    }

    #[test]
    fn test_error_entry_shape() {
        let error = McpClientError::RemoteCall {
            tool: "echo".into(),
            cause: "boom".into(),
        };
        let entry = ToolCallLogEntry::Error {
            tool: "echo",
            error: &error,
        };
        let json = entry.to_json();
        assert_eq!(json["tool"], "echo");
        assert_eq!(json["error"], "remote call failed: tool=echo, boom");
        assert_eq!(json.as_object().unwrap().len(), 2);
        assert_eq!(entry.tool(), "echo");
    }

    #[test]
    fn test_cross_layer_props_wire_shape() {
        let props = CrossLayerProps::with_id("requestId", "r-1");
        assert_eq!(
            serde_json::to_value(&props).unwrap(),
            serde_json::json!({"logging": {"ids": [{"requestId": "r-1"}]}})
        );
        assert_eq!(props.correlation(), "requestId=r-1");
    }

    #[test]
    fn test_recording_log_skips_silent() {
        let log = RecordingToolCallLog::default();
        let response = serde_json::json!(1);
        let entry = ToolCallLogEntry::Response {
            tool: "t",
            response: &response,
        };
        log.record(LogLevel::Silent, &entry);
        log.record(LogLevel::Debug, &entry);
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].0, LogLevel::Debug);
    }

    #[test]
    fn test_tracing_log_accepts_every_level() {
        let log = TracingToolCallLog;
        let response = serde_json::json!({"ok": true});
        let entry = ToolCallLogEntry::Response {
            tool: "t",
            response: &response,
        };
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
            LogLevel::Silent,
        ] {
            log.record(level, &entry);
        }
    }
}
