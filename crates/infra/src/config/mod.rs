//! Configuration loading
//!
//! This module provides utilities for loading the event manifest from disk
//! and remote-calendar settings from the environment.

pub mod loader;

// Re-export commonly used items
pub use loader::{graph_settings_from, load_graph_settings, load_manifest, parse_manifest};
