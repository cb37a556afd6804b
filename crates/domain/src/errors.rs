//! Error types used throughout the recommendation core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for EventKit
///
/// The core only knows these four kinds. Transport layers map them to their
/// own status codes via [`EventKitError::kind`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum EventKitError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Remote API error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    RemoteApi { status: Option<u16>, message: String, rate_limited: bool },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of an [`EventKitError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Auth,
    RateLimited,
    RemoteApi,
    Config,
}

impl EventKitError {
    /// Remote failure that is not rate limiting.
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::RemoteApi { status, message: message.into(), rate_limited: false }
    }

    /// Remote failure raised after the rate-limit retry budget ran out.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RemoteApi { status: Some(429), message: message.into(), rate_limited: true }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Auth(_) => ErrorKind::Auth,
            Self::RemoteApi { rate_limited: true, .. } => ErrorKind::RateLimited,
            Self::RemoteApi { .. } => ErrorKind::RemoteApi,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RemoteApi { rate_limited: true, .. })
    }

    /// Whether a caller may reasonably try the same request again later.
    ///
    /// Only remote failures qualify: rate limiting, 5xx responses, and
    /// transport failures without a status. Invalid input, auth and config
    /// errors never succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RemoteApi { rate_limited: true, .. } => true,
            Self::RemoteApi { status: None, .. } => true,
            Self::RemoteApi { status: Some(code), .. } => *code >= 500,
            _ => false,
        }
    }
}

/// Result type alias for EventKit operations
pub type Result<T> = std::result::Result<T, EventKitError>;
