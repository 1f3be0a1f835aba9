//! Managed-token capability
//!
//! [`OAuth2Manager`] is the seam through which an externally owned token
//! source is consumed. This crate never acquires or refreshes tokens itself;
//! it asks for the current access token before each connection check and
//! hands authorization-sensitive calls to
//! [`OAuth2Manager::handle_401_and_retry`].

use serde_json::Value;

use crate::error::Result;
use crate::mcp::client::BoxFuture;

/// An attempt that may be retried after a token refresh.
pub type RetryableCall<'a> = dyn Fn() -> BoxFuture<'a, Result<Value>> + Send + Sync + 'a;

/// Source of managed access tokens.
///
/// Implementations may cache and refresh internally. A different value from
/// [`get_access_token`](OAuth2Manager::get_access_token) than the one the
/// live connection was built with signals rotation and forces a reconnect.
///
/// # Examples
///
/// ```
/// use mcp_remote_client::error::{McpClientError, Result};
/// use mcp_remote_client::mcp::auth::{OAuth2Manager, RetryableCall};
/// use mcp_remote_client::mcp::client::BoxFuture;
/// use serde_json::Value;
///
/// struct FixedToken(String);
///
/// impl OAuth2Manager for FixedToken {
///     fn get_access_token(&self) -> BoxFuture<'_, Result<String>> {
///         Box::pin(async move { Ok(self.0.clone()) })
///     }
///
///     fn handle_401_and_retry<'a>(
///         &'a self,
///         call: &'a RetryableCall<'a>,
///     ) -> BoxFuture<'a, Result<Value>> {
///         Box::pin(async move {
///             match call().await {
///                 Err(e) if McpClientError::is_unauthorized(&e) => call().await,
///                 other => other,
///             }
///         })
///     }
/// }
/// ```
pub trait OAuth2Manager: Send + Sync {
    /// Return the access token currently in effect.
    ///
    /// # Errors
    ///
    /// Returns an error if no token can be obtained.
    fn get_access_token(&self) -> BoxFuture<'_, Result<String>>;

    /// Run `call`; on an authorization failure force a refresh and run it
    /// once more.
    ///
    /// Implementations decide what counts as an authorization failure;
    /// [`crate::error::McpClientError::is_unauthorized`] recognises the
    /// errors raised by this crate's transports.
    fn handle_401_and_retry<'a>(&'a self, call: &'a RetryableCall<'a>)
        -> BoxFuture<'a, Result<Value>>;
}

/// Managed-token doubles for tests.
#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::error::McpClientError;

    /// Serves `tokens[current]`; an authorization failure advances to the
    /// next token and retries once.
    pub struct RotatingTokens {
        tokens: Vec<String>,
        current: Mutex<usize>,
        retries: AtomicUsize,
    }

    impl RotatingTokens {
        pub fn new(tokens: &[&str]) -> Self {
            Self {
                tokens: tokens.iter().map(|t| t.to_string()).collect(),
                current: Mutex::new(0),
                retries: AtomicUsize::new(0),
            }
        }

        /// Move to the next token, as a background refresh would.
        pub fn advance(&self) {
            let mut current = self.current.lock().unwrap();
            if *current + 1 < self.tokens.len() {
                *current += 1;
            }
        }

        /// Number of retries performed after an authorization failure.
        pub fn retries(&self) -> usize {
            self.retries.load(Ordering::SeqCst)
        }
    }

    impl OAuth2Manager for RotatingTokens {
        fn get_access_token(&self) -> BoxFuture<'_, Result<String>> {
            Box::pin(async move {
                let current = *self.current.lock().unwrap();
                self.tokens
                    .get(current)
                    .cloned()
                    .ok_or_else(|| McpClientError::McpAuth("no token available".into()).into())
            })
        }

        fn handle_401_and_retry<'a>(
            &'a self,
            call: &'a RetryableCall<'a>,
        ) -> BoxFuture<'a, Result<Value>> {
            Box::pin(async move {
                match call().await {
                    Err(e) if McpClientError::is_unauthorized(&e) => {
                        self.retries.fetch_add(1, Ordering::SeqCst);
                        self.advance();
                        call().await
                    }
                    other => other,
                }
            })
        }
    }
}
