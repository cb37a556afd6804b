//! Token acquisition and caching for the remote calendar

pub mod credential_store;
pub mod token_provider;

pub use credential_store::{FileCredentialStore, InMemoryCredentialStore};
pub use token_provider::ClientCredentialsTokenProvider;
