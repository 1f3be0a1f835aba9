//! MCP (Model Context Protocol) client support
//!
//! This module connects to one remote MCP endpoint and invokes its tools.
//!
//! The implementation targets protocol revision **2025-11-25** and accepts
//! servers that negotiate any of the earlier revisions listed in
//! [`types::SUPPORTED_PROTOCOL_VERSIONS`].
//!
//! # Module Layout
//!
//! - `types`      -- JSON-RPC primitives and the MCP types this client uses
//! - `client`     -- Transport-backed async JSON-RPC 2.0 client
//! - `protocol`   -- Typed MCP lifecycle wrapper over `JsonRpcClient`
//! - `transport`  -- `Transport` trait, factory, and the HTTP, SSE, and stdio
//!   implementations
//! - `auth`       -- Credential material and authentication strategy
//! - `config`     -- Connection, credential, and logging configuration
//! - `connection` -- Lazy connection lifecycle with token-rotation reconnect
//! - `logging`    -- Tool-call log entries and sinks
//! - `service`    -- `McpClient`: the tool invocation pipeline

pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod logging;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod types;

pub use connection::{ConnectionManager, McpSession};
pub use logging::{CrossLayerProps, LogLevel, ToolCallLog, TracingToolCallLog};
pub use service::{FeatureProps, McpClient, McpClientBuilder, McpFeature};
