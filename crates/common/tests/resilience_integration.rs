//! Integration tests for resilience module
//!
//! Tests the retry combinator with caller-classified failures, the way the
//! token and calendar paths use it.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eventkit_common::resilience::{
    policies, with_retry, RetryConfig, RetryDecision, RetryError, RetryExecutor,
};

/// Failure shape mirroring a remote call
#[derive(Debug, Clone, PartialEq, Eq)]
enum RemoteFailure {
    Throttled(Option<u64>),
    Timeout,
    Rejected,
}

fn classify(err: &RemoteFailure, _attempt: u32) -> RetryDecision {
    match err {
        RemoteFailure::Throttled(Some(secs)) => RetryDecision::RetryAfter(Duration::from_millis(*secs)),
        RemoteFailure::Throttled(None) | RemoteFailure::Timeout => RetryDecision::Retry,
        RemoteFailure::Rejected => RetryDecision::Stop,
    }
}

fn fast(max_attempts: u32) -> RetryConfig {
    RetryConfig::builder()
        .max_attempts(max_attempts)
        .fixed_backoff(Duration::from_millis(1))
        .no_jitter()
        .build()
        .unwrap()
}

/// Validates recovery from a mix of transient failures.
///
/// # Test Steps
/// 1. Fail with a throttle carrying a delay, then a timeout
/// 2. Succeed on the third attempt
/// 3. Confirm exactly three attempts were made
#[tokio::test]
async fn test_mixed_transient_failures_recover() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);

    let result = with_retry(fast(4), policies::ClassifyRetry::new(classify), || {
        let counter = Arc::clone(&counter);
        async move {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Err(RemoteFailure::Throttled(Some(2))),
                1 => Err(RemoteFailure::Timeout),
                _ => Ok("payload"),
            }
        }
    })
    .await;

    assert_eq!(result.unwrap(), "payload");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

/// Validates that a fatal classification short-circuits the budget.
///
/// # Test Steps
/// 1. Fail with a timeout, then with a rejection
/// 2. Confirm the rejection surfaces as non-retryable after two attempts
#[tokio::test]
async fn test_fatal_failure_stops_early() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);

    let err = with_retry(fast(5), policies::ClassifyRetry::new(classify), || {
        let counter = Arc::clone(&counter);
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err::<(), _>(RemoteFailure::Timeout)
            } else {
                Err(RemoteFailure::Rejected)
            }
        }
    })
    .await
    .unwrap_err();

    assert!(matches!(err, RetryError::NonRetryable { attempts: 2, .. }));
    assert!(!err.is_exhausted());
    assert_eq!(err.into_inner(), RemoteFailure::Rejected);
}

/// Validates that persistent throttling exhausts the budget and keeps the
/// last failure for the caller to map.
///
/// # Test Steps
/// 1. Throttle every attempt without a server delay
/// 2. Confirm exactly `max_attempts` attempts and an exhausted error
#[tokio::test]
async fn test_persistent_throttle_exhausts_budget() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);
    let executor = RetryExecutor::new(fast(4), policies::ClassifyRetry::new(classify));

    let err = executor
        .execute(|| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(RemoteFailure::Throttled(None))
            }
        })
        .await
        .unwrap_err();

    assert!(err.is_exhausted());
    assert_eq!(err.attempts(), 4);
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
}
