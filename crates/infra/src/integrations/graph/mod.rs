//! Microsoft Graph calendar integration
//!
//! - [`GraphCalendarSource`]: the remote `CalendarEventProvider`
//! - [`ResponseCache`]: TTL cache of raw pages keyed by user and range
//! - [`EventTransformer`]: Graph event to `Session` mapping

pub mod cache;
pub mod client;
pub mod transform;
pub mod types;

pub use cache::{CacheStats, ResponseCache};
pub use client::{default_page_retry, GraphCalendarSource};
pub use transform::EventTransformer;
pub use types::GraphEvent;
