//! Resilience patterns for remote calls
//!
//! A single retry combinator shared by every network path. Callers classify
//! their own errors through a [`RetryPolicy`]; the executor owns the backoff
//! and attempt accounting.

pub mod retry;

pub use retry::{
    policies, with_retry, BackoffStrategy, Jitter, RetryConfig, RetryConfigBuilder,
    RetryConfigError, RetryDecision, RetryError, RetryExecutor, RetryPolicy, RetryResult,
};
