//! MCP client authentication
//!
//! Authorization applies to the HTTP and SSE transports; subprocess servers
//! receive credentials through their environment.
//!
//! # Module Layout
//!
//! - [`material`] -- auth material, token formatting, and header construction
//! - [`manager`]  -- the injected managed-token capability
//! - [`strategy`] -- per-call selection between static, managed, and plain
//!   credentials

pub mod manager;
pub mod material;
pub mod strategy;

pub use manager::{OAuth2Manager, RetryableCall};
pub use material::{auth_headers, AuthMaterial, TokenFormat, DEFAULT_AUTH_HEADER};
pub use strategy::{AuthMode, AuthStrategy, ResolvedCredential};
