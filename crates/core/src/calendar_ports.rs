//! Remote calendar port interfaces

use async_trait::async_trait;
use eventkit_domain::{DateRange, Result, Session};

/// Trait for remote calendar providers
#[async_trait]
pub trait CalendarEventProvider: Send + Sync {
    /// Fetch events for a user within a date range, already transformed
    /// into sessions in remote order.
    ///
    /// `user_id` falls back to the provider's configured default. An empty
    /// calendar is `Ok(vec![])`.
    async fn fetch_events(&self, user_id: Option<&str>, range: DateRange) -> Result<Vec<Session>>;
}
