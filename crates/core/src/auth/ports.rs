//! Port interfaces for bearer-token handling
//!
//! These traits define the boundaries between the recommendation core and
//! the identity-service adapters.

use async_trait::async_trait;
use eventkit_domain::{CachedToken, Result};

/// Passive store for the single cached bearer token.
///
/// Implementations must treat a missing, empty or corrupt backing slot as
/// "no token" rather than an error. Writes are last-writer-wins.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the cached token, if any
    async fn load(&self) -> Option<CachedToken>;

    /// Replace the cached token
    async fn store(&self, token: &CachedToken) -> Result<()>;

    /// Remove the cached token
    async fn clear(&self) -> Result<()>;
}

/// Supplies bearer tokens for remote calls.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Return a token valid for at least the refresh skew.
    ///
    /// # Errors
    /// `EventKitError::Auth` when credentials are missing or rejected, or
    /// when acquisition keeps failing after the bounded retry.
    async fn access_token(&self) -> Result<String>;

    /// Drop the cached token so the next call acquires a fresh one.
    async fn invalidate(&self) -> Result<()>;
}
