//! Token lifecycle ports

pub mod ports;

pub use ports::*;
