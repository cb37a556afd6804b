//! # EventKit Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - Credential stores (file and in-memory) and the client-credential token provider
//! - The Microsoft Graph calendar source with its response cache and event transformer
//! - HTTP client wrapper
//! - Manifest and environment configuration loading
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `eventkit-core`
//! - Depends on `eventkit-common`, `eventkit-domain` and `eventkit-core`
//! - Contains all "impure" code (filesystem, network, environment)

pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod observability;

// Re-export commonly used items
pub use auth::{ClientCredentialsTokenProvider, FileCredentialStore, InMemoryCredentialStore};
pub use config::{load_graph_settings, load_manifest};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use integrations::graph::{EventTransformer, GraphCalendarSource, ResponseCache};
pub use observability::{init_tracing, LogFormat};
