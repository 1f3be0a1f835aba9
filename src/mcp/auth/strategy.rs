//! Authentication strategy selection
//!
//! Exactly one [`AuthStrategy`] is chosen per client from its configuration.
//! [`AuthStrategy::resolve`] is evaluated on every connection check and
//! yields the [`ResolvedCredential`] in effect for that call.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::mcp::auth::manager::OAuth2Manager;
use crate::mcp::auth::material::{AuthMaterial, TokenFormat};
use crate::mcp::config::CredentialsConfig;

/// Which strategy produced a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// A static key from configuration.
    StaticToken,
    /// A token from a managed capability, subject to rotation.
    ManagedToken,
    /// No static key and no managed capability.
    PlainCredential,
}

/// Per-client authentication strategy.
///
/// A non-empty static key always wins over a managed capability.
#[derive(Clone)]
pub enum AuthStrategy {
    /// Use this key verbatim for the lifetime of the client.
    StaticToken(String),
    /// Ask the manager for the current token on every call.
    ManagedToken(Arc<dyn OAuth2Manager>),
    /// Use whatever key configuration holds, possibly none.
    PlainCredential(Option<String>),
}

impl fmt::Debug for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticToken(_) => f.write_str("StaticToken(<redacted>)"),
            Self::ManagedToken(_) => f.write_str("ManagedToken(..)"),
            Self::PlainCredential(key) => f
                .debug_tuple("PlainCredential")
                .field(&key.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

impl AuthStrategy {
    /// Select the strategy for `credentials` and an optional manager.
    ///
    /// # Examples
    ///
    /// ```
    /// use mcp_remote_client::mcp::auth::{AuthMode, AuthStrategy};
    /// use mcp_remote_client::mcp::config::CredentialsConfig;
    ///
    /// let creds = CredentialsConfig { key: Some("k".into()), ..Default::default() };
    /// let strategy = AuthStrategy::select(&creds, None);
    /// assert_eq!(strategy.mode(), AuthMode::StaticToken);
    /// ```
    pub fn select(
        credentials: &CredentialsConfig,
        manager: Option<Arc<dyn OAuth2Manager>>,
    ) -> Self {
        match (credentials.key.as_deref().filter(|k| !k.is_empty()), manager) {
            (Some(key), _) => Self::StaticToken(key.to_string()),
            (None, Some(manager)) => Self::ManagedToken(manager),
            (None, None) => Self::PlainCredential(credentials.key.clone()),
        }
    }

    /// The mode this strategy resolves to.
    pub fn mode(&self) -> AuthMode {
        match self {
            Self::StaticToken(_) => AuthMode::StaticToken,
            Self::ManagedToken(_) => AuthMode::ManagedToken,
            Self::PlainCredential(_) => AuthMode::PlainCredential,
        }
    }

    /// The managed capability, only in managed-token mode.
    pub fn manager(&self) -> Option<&Arc<dyn OAuth2Manager>> {
        match self {
            Self::ManagedToken(manager) => Some(manager),
            _ => None,
        }
    }

    /// Resolve the credential in effect right now.
    ///
    /// # Errors
    ///
    /// In managed mode, returns the manager's error when no token can be
    /// obtained.
    pub async fn resolve(&self) -> Result<ResolvedCredential> {
        let (mode, token) = match self {
            Self::StaticToken(key) => (AuthMode::StaticToken, Some(key.clone())),
            Self::ManagedToken(manager) => {
                (AuthMode::ManagedToken, Some(manager.get_access_token().await?))
            }
            Self::PlainCredential(key) => (AuthMode::PlainCredential, key.clone()),
        };
        Ok(ResolvedCredential { mode, token })
    }
}

/// Credential resolved for a single connection check.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    /// Strategy that produced it.
    pub mode: AuthMode,
    /// Raw token, if any.
    pub token: Option<String>,
}

impl fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("mode", &self.mode)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ResolvedCredential {
    /// Whether this credential differs from the one a live connection was
    /// built with. Only managed tokens rotate.
    pub fn rotated(&self, last_seen: Option<&str>) -> bool {
        self.mode == AuthMode::ManagedToken && self.token.as_deref() != last_seen
    }

    /// Token to remember on the live connection.
    pub fn rotation_marker(&self) -> Option<String> {
        match self.mode {
            AuthMode::ManagedToken => self.token.clone(),
            _ => None,
        }
    }

    /// Auth material for the transport factory.
    pub fn material(&self, credentials: &CredentialsConfig, format: &TokenFormat) -> AuthMaterial {
        AuthMaterial {
            header_name: credentials.header.clone(),
            token: self.token.clone(),
            format: format.clone(),
        }
    }
}
