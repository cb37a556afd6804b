//! Time utilities
//!
//! - **Clock abstractions**: real and mock time for testing

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
