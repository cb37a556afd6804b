//! Runtime utilities shared across EventKit crates.
//!
//! - `resilience`: retry combinator with caller-supplied error classification
//! - `time`: clock abstraction (system and mock)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod resilience;
pub mod time;

pub use resilience::{
    policies, with_retry, BackoffStrategy, Jitter, RetryConfig, RetryDecision, RetryError,
    RetryExecutor, RetryPolicy, RetryResult,
};
pub use time::{Clock, MockClock, SystemClock};
