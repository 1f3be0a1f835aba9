//! MCP test server binary for integration tests
//!
//! This binary implements a minimal MCP server that communicates over
//! stdin/stdout using newline-delimited JSON (the stdio transport protocol).
//! It is used by integration tests to exercise the `cli` connection type
//! without requiring a real external MCP server.
//!
//! # Handled Methods
//!
//! - `initialize` -- responds with protocol version `2025-11-25` and the
//!   `tools` capability.
//! - `notifications/initialized` -- acknowledged silently (no response).
//! - `tools/list` -- lists the tools below.
//! - `tools/call`:
//!   - `echo` and `execute_feature` -- return the call arguments serialized
//!     as JSON text.
//!   - `bad_json` -- returns text that is not JSON.
//!   - `failing` -- returns a JSON-RPC error.
//!   - `env` -- returns the value of the `MCP_TEST_MARKER` environment
//!     variable as a JSON string.
//! - All other methods -- returns a JSON-RPC `-32601 Method not found` error.

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

const TOOLS: &[&str] = &["echo", "execute_feature", "bad_json", "failing", "env"];

fn main() {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(_) => {
                let response = make_error(&Value::Null, -32700, "Parse error");
                if writeln!(out, "{}", response).is_err() {
                    break;
                }
                let _ = out.flush();
                continue;
            }
        };

        let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
        let id = request.get("id").cloned().unwrap_or(Value::Null);

        // Notifications carry no id and get no response.
        if method.starts_with("notifications/") {
            continue;
        }

        let response = match method {
            "initialize" => handle_initialize(&id),
            "tools/list" => handle_tools_list(&id),
            "tools/call" => handle_tools_call(&id, &request),
            "ping" => json!({ "jsonrpc": "2.0", "id": id, "result": {} }),
            _ => make_error(&id, -32601, &format!("Method not found: {}", method)),
        };

        if writeln!(out, "{}", response).is_err() {
            break;
        }
        if out.flush().is_err() {
            break;
        }
    }
}

fn handle_initialize(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "protocolVersion": "2025-11-25",
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": "mcp-test-server",
                "version": "0.1.0"
            }
        }
    })
}

fn handle_tools_list(id: &Value) -> Value {
    let tools: Vec<Value> = TOOLS
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "inputSchema": { "type": "object" }
            })
        })
        .collect();
    json!({ "jsonrpc": "2.0", "id": id, "result": { "tools": tools } })
}

fn handle_tools_call(id: &Value, request: &Value) -> Value {
    let params = request.get("params").unwrap_or(&Value::Null);
    let tool_name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    let text = match tool_name {
        "echo" | "execute_feature" => arguments.to_string(),
        "bad_json" => "this is not json".to_string(),
        "env" => Value::String(std::env::var("MCP_TEST_MARKER").unwrap_or_default()).to_string(),
        "failing" => return make_error(id, -32000, "tool exploded"),
        other => return make_error(id, -32602, &format!("Unknown tool: {}", other)),
    };

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "content": [ { "type": "text", "text": text } ],
            "isError": false
        }
    })
}

fn make_error(id: &Value, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}
