//! Shared test helpers for `eventkit-core` integration tests.

pub mod calendar;
