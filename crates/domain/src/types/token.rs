use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_TOKEN_LIFETIME_SECS;

/// Bearer token with expiry metadata, as persisted by a credential store.
///
/// Replaced wholesale on refresh, never patched.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub value: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Token issued at `acquired_at` that lives `expires_in_secs`.
    ///
    /// Lifetimes outside `1..=MAX_TOKEN_LIFETIME_SECS` are clamped into it.
    pub fn from_lifetime(
        value: impl Into<String>,
        acquired_at: DateTime<Utc>,
        expires_in_secs: i64,
    ) -> Self {
        let lifetime = Duration::seconds(expires_in_secs.clamp(1, MAX_TOKEN_LIFETIME_SECS));
        Self {
            value: value.into(),
            acquired_at,
            expires_at: acquired_at.checked_add_signed(lifetime).unwrap_or(acquired_at),
        }
    }

    /// `now < expires_at - skew`. A record too close to the calendar's
    /// lower bound to subtract the skew is never fresh.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.expires_at.checked_sub_signed(skew).is_some_and(|deadline| now < deadline)
    }
}

// Token values never reach logs.
impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("value", &"<redacted>")
            .field("acquired_at", &self.acquired_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
