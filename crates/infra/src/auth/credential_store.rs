//! Credential store adapters
//!
//! [`FileCredentialStore`] persists the token as JSON in a single file owned
//! by this process. [`InMemoryCredentialStore`] backs tests and short-lived
//! processes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eventkit_core::CredentialStore;
use eventkit_domain::{CachedToken, EventKitError, Result};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::errors::InfraError;

/// File-backed token cache.
///
/// Writes go to a sibling temp file and are renamed into place, so readers
/// never see a half-written record. Concurrent writers are last-writer-wins.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Option<CachedToken> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cached token");
                return None;
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to read token cache");
                return None;
            }
        };

        if contents.trim().is_empty() {
            debug!(path = %self.path.display(), "Token cache is empty");
            return None;
        }

        match serde_json::from_str::<CachedToken>(&contents) {
            Ok(token) if token.value.is_empty() || token.expires_at <= token.acquired_at => {
                warn!(path = %self.path.display(), "Ignoring implausible token cache record");
                None
            }
            Ok(token) => Some(token),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Ignoring corrupt token cache");
                None
            }
        }
    }

    async fn store(&self, token: &CachedToken) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(InfraError::from)?;
        }

        let body = serde_json::to_vec_pretty(token)
            .map_err(|e| EventKitError::Config(format!("Failed to encode token cache: {e}")))?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, body).await.map_err(InfraError::from)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&temp, perms).await.map_err(InfraError::from)?;
        }

        tokio::fs::rename(&temp, &self.path).await.map_err(InfraError::from)?;
        debug!(path = %self.path.display(), "Stored token cache");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Cleared token cache");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }
}

/// Process-local token cache.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    slot: Mutex<Option<CachedToken>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded with a token, as if a previous run had cached it.
    pub fn with_token(token: CachedToken) -> Self {
        Self { slot: Mutex::new(Some(token)) }
    }

    pub fn current(&self) -> Option<CachedToken> {
        self.slot.lock().clone()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self) -> Option<CachedToken> {
        self.slot.lock().clone()
    }

    async fn store(&self, token: &CachedToken) -> Result<()> {
        *self.slot.lock() = Some(token.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.slot.lock().take();
        Ok(())
    }
}
