//! External service integrations

pub mod graph;
