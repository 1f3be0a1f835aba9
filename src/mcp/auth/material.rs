//! Auth material and outbound header construction
//!
//! [`AuthMaterial`] is the resolved credential handed to the transport
//! factory. [`auth_headers`] turns it into the header map attached to every
//! HTTP request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::mcp::config::{CredentialFormat, CredentialsConfig};

/// Header used when no custom header name is configured.
pub const DEFAULT_AUTH_HEADER: &str = "Authorization";

/// Renders a raw token into the value placed in the auth header.
///
/// # Examples
///
/// ```
/// use mcp_remote_client::mcp::auth::TokenFormat;
///
/// assert_eq!(TokenFormat::Raw.apply("abc"), "abc");
/// assert_eq!(TokenFormat::Bearer.apply("abc"), "Bearer abc");
/// assert_eq!(TokenFormat::Prefix("Token ".into()).apply("abc"), "Token abc");
/// let custom = TokenFormat::custom(|t| format!("Key={t}"));
/// assert_eq!(custom.apply("abc"), "Key=abc");
/// ```
#[derive(Clone, Default)]
pub enum TokenFormat {
    /// Pass the token through unchanged.
    #[default]
    Raw,
    /// `Bearer <token>`.
    Bearer,
    /// `<prefix><token>`.
    Prefix(String),
    /// Caller-supplied formatting function.
    Custom(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl TokenFormat {
    /// Wrap a formatting closure.
    pub fn custom(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// Render `token` into a header value.
    pub fn apply(&self, token: &str) -> String {
        match self {
            Self::Raw => token.to_string(),
            Self::Bearer => format!("Bearer {token}"),
            Self::Prefix(prefix) => format!("{prefix}{token}"),
            Self::Custom(f) => f(token),
        }
    }

    /// Derive the format from configuration.
    pub fn from_config(credentials: &CredentialsConfig) -> Self {
        match credentials.format {
            CredentialFormat::Raw => Self::Raw,
            CredentialFormat::Bearer => Self::Bearer,
            CredentialFormat::Prefix => Self::Prefix(credentials.prefix.clone().unwrap_or_default()),
        }
    }
}

impl fmt::Debug for TokenFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("Raw"),
            Self::Bearer => f.write_str("Bearer"),
            Self::Prefix(p) => f.debug_tuple("Prefix").field(p).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Credential material for one transport build.
#[derive(Clone, Default)]
pub struct AuthMaterial {
    /// Header name; `None` means [`DEFAULT_AUTH_HEADER`].
    pub header_name: Option<String>,
    /// Raw token value, if any.
    pub token: Option<String>,
    /// How the token is rendered into the header value.
    pub format: TokenFormat,
}

impl AuthMaterial {
    /// Header name in effect.
    pub fn header(&self) -> &str {
        self.header_name.as_deref().unwrap_or(DEFAULT_AUTH_HEADER)
    }
}

impl fmt::Debug for AuthMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthMaterial")
            .field("header_name", &self.header_name)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("format", &self.format)
            .finish()
    }
}

/// Build the auth headers for `auth`.
///
/// Returns `{ header: format(token) }` when a non-empty token is present and
/// an empty map otherwise.
///
/// # Examples
///
/// ```
/// use mcp_remote_client::mcp::auth::{auth_headers, AuthMaterial, TokenFormat};
///
/// let auth = AuthMaterial {
///     header_name: Some("X-Api-Key".into()),
///     token: Some("k".into()),
///     format: TokenFormat::Raw,
/// };
/// let headers = auth_headers(Some(&auth));
/// assert_eq!(headers.get("X-Api-Key").map(String::as_str), Some("k"));
/// assert!(auth_headers(None).is_empty());
/// ```
pub fn auth_headers(auth: Option<&AuthMaterial>) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    if let Some(auth) = auth {
        if let Some(token) = auth.token.as_deref().filter(|t| !t.is_empty()) {
            headers.insert(auth.header().to_string(), auth.format.apply(token));
        }
    }
    headers
}
