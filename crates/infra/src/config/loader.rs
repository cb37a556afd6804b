//! Configuration loader
//!
//! Loads the event manifest from a file and the remote-calendar settings
//! from the environment.
//!
//! ## Manifest
//! JSON or TOML, detected by extension. When
//! `features.externalSessions.enabled` is set and the referenced file can be
//! read, its sessions replace the inline list. Relative paths resolve against
//! the manifest's directory.
//!
//! ## Environment Variables
//! A `.env` file in the working directory is loaded first when present.
//! - `GRAPH_TENANT_ID`, `GRAPH_CLIENT_ID`, `GRAPH_CLIENT_SECRET`: client
//!   credentials (absence surfaces as an auth error at first remote use)
//! - `GRAPH_DEFAULT_USER_ID`: calendar owner when a request names none
//! - `GRAPH_AUTHORITY_HOST`, `GRAPH_BASE_URL`: endpoint overrides
//! - `EVENTKIT_TOKEN_CACHE_PATH`: token cache file
//!   (default `~/.eventkit_token_cache.json`)
//! - `EVENTKIT_CACHE_TTL_SECONDS`: response cache TTL (default 300)
//! - `EVENTKIT_HTTP_TIMEOUT_SECONDS`: per-request timeout (default 10)

use std::path::{Path, PathBuf};

use eventkit_domain::constants::DEFAULT_TOKEN_CACHE_FILE;
use eventkit_domain::{EventKitError, GraphSettings, ManifestConfig, Result, Session};
use serde::Deserialize;

use crate::errors::InfraError;

/// Load, normalize and validate a manifest file.
///
/// # Errors
/// Returns `EventKitError::Config` if the file is missing, malformed, or
/// violates the manifest invariants.
pub fn load_manifest(path: &Path) -> Result<ManifestConfig> {
    if !path.exists() {
        return Err(EventKitError::Config(format!("Manifest file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "Loading manifest");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| EventKitError::Config(format!("Failed to read manifest: {e}")))?;

    let mut manifest = parse_manifest(&contents, path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    apply_external_sessions(&mut manifest, base_dir);

    let manifest = manifest.normalized();
    manifest.validate()?;
    tracing::info!(sessions = manifest.sessions.len(), "Manifest loaded");
    Ok(manifest)
}

/// Parse manifest content. Format is chosen by the path's extension.
///
/// # Errors
/// Returns `EventKitError::Config` if format is invalid or parsing fails.
pub fn parse_manifest(contents: &str, path: &Path) -> Result<ManifestConfig> {
    parse_by_extension(contents, path)
}

fn parse_by_extension<T: serde::de::DeserializeOwned>(contents: &str, path: &Path) -> Result<T> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| InfraError::from(e).into()),
        "json" => serde_json::from_str(contents)
            .map_err(|e| EventKitError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(EventKitError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// External session files hold either a bare list or `{ "sessions": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExternalSessions {
    List(Vec<Session>),
    Wrapped { sessions: Vec<Session> },
}

impl ExternalSessions {
    fn into_sessions(self) -> Vec<Session> {
        match self {
            Self::List(sessions) | Self::Wrapped { sessions } => sessions,
        }
    }
}

fn apply_external_sessions(manifest: &mut ManifestConfig, base_dir: &Path) {
    let feature = &manifest.features.external_sessions;
    if !feature.enabled {
        return;
    }
    let Some(file) = feature.file.as_ref() else {
        tracing::warn!("External sessions enabled without a file; using inline sessions");
        return;
    };
    let resolved = if file.is_absolute() { file.clone() } else { base_dir.join(file) };

    let loaded = std::fs::read_to_string(&resolved)
        .map_err(|e| EventKitError::Config(format!("Failed to read external sessions: {e}")))
        .and_then(|contents| parse_by_extension::<ExternalSessions>(&contents, &resolved));

    match loaded {
        Ok(external) => {
            let sessions = external.into_sessions();
            tracing::info!(
                path = %resolved.display(),
                count = sessions.len(),
                "Using external sessions"
            );
            manifest.sessions = sessions;
        }
        Err(err) => {
            tracing::warn!(
                path = %resolved.display(),
                error = %err,
                "External sessions unavailable; using inline sessions"
            );
        }
    }
}

/// Load remote-calendar settings from `.env` and the process environment.
///
/// # Errors
/// Returns `EventKitError::Config` when a numeric variable cannot be parsed.
/// Missing credentials are not an error here.
pub fn load_graph_settings() -> Result<GraphSettings> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }
    graph_settings_from(|key| std::env::var(key).ok())
}

/// Build settings from an arbitrary variable lookup.
///
/// # Errors
/// Returns `EventKitError::Config` when a numeric variable cannot be parsed.
pub fn graph_settings_from<F>(lookup: F) -> Result<GraphSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let non_blank = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let defaults = GraphSettings::default();

    let settings = GraphSettings {
        tenant_id: non_blank("GRAPH_TENANT_ID"),
        client_id: non_blank("GRAPH_CLIENT_ID"),
        client_secret: non_blank("GRAPH_CLIENT_SECRET"),
        default_user_id: non_blank("GRAPH_DEFAULT_USER_ID"),
        authority_host: non_blank("GRAPH_AUTHORITY_HOST").unwrap_or(defaults.authority_host),
        graph_base_url: non_blank("GRAPH_BASE_URL").unwrap_or(defaults.graph_base_url),
        token_cache_path: non_blank("EVENTKIT_TOKEN_CACHE_PATH")
            .map(PathBuf::from)
            .or_else(|| default_token_cache_path(&non_blank)),
        cache_ttl_seconds: parse_secs(non_blank("EVENTKIT_CACHE_TTL_SECONDS"), "cache TTL")?
            .unwrap_or(defaults.cache_ttl_seconds),
        request_timeout_seconds: parse_secs(
            non_blank("EVENTKIT_HTTP_TIMEOUT_SECONDS"),
            "HTTP timeout",
        )?
        .unwrap_or(defaults.request_timeout_seconds),
    };

    let missing = settings.missing_fields();
    if !missing.is_empty() {
        tracing::debug!(
            missing = ?missing,
            "Graph credentials incomplete; remote source unavailable until set"
        );
    }
    Ok(settings)
}

fn default_token_cache_path(lookup: &dyn Fn(&str) -> Option<String>) -> Option<PathBuf> {
    lookup("HOME")
        .or_else(|| lookup("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(DEFAULT_TOKEN_CACHE_FILE))
}

fn parse_secs(raw: Option<String>, what: &str) -> Result<Option<u64>> {
    raw.map(|s| s.parse::<u64>().map_err(|e| EventKitError::Config(format!("Invalid {what}: {e}"))))
        .transpose()
}
