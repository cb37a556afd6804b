//! Configuration structures
//!
//! Loading lives in `eventkit_infra::config`; this module only describes the
//! shapes and their invariants.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTHORITY_HOST, DEFAULT_GRAPH_BASE_URL, DEFAULT_TOP_N, HTTP_TIMEOUT_SECS,
    RESPONSE_CACHE_TTL_SECS,
};
use crate::errors::{EventKitError, Result};
use crate::types::{ScoringWeights, Session};

/// Event manifest: inline sessions, scoring weights and recommendation defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestConfig {
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default)]
    pub recommend: RecommendSettings,
    #[serde(default)]
    pub features: FeatureSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendSettings {
    #[serde(default = "default_top_n", alias = "max_sessions_default")]
    pub max_sessions_default: usize,
    #[serde(default, alias = "default_interests")]
    pub default_interests: Vec<String>,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

impl Default for RecommendSettings {
    fn default() -> Self {
        Self { max_sessions_default: DEFAULT_TOP_N, default_interests: Vec::new() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSettings {
    #[serde(default, alias = "external_sessions")]
    pub external_sessions: ExternalSessionsFeature,
}

/// Replace inline sessions with a list kept in a separate file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalSessionsFeature {
    #[serde(default)]
    pub enabled: bool,
    /// Relative paths resolve against the manifest's directory.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl ManifestConfig {
    /// Normalize every session (lower-case tags, synthesized ids).
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.sessions = self.sessions.into_iter().map(Session::normalized).collect();
        self
    }

    /// Checks weights and session invariants.
    ///
    /// # Errors
    /// Returns `EventKitError::Config` naming the first violation.
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;

        let mut seen = HashSet::new();
        for session in &self.sessions {
            if !session.has_valid_bounds() {
                return Err(EventKitError::Config(format!(
                    "session '{}' must end after it starts ({} -> {})",
                    session.title, session.start, session.end
                )));
            }
            if !(0.0..=1.0).contains(&session.popularity) {
                return Err(EventKitError::Config(format!(
                    "session '{}' popularity {} outside [0, 1]",
                    session.title, session.popularity
                )));
            }
            if !seen.insert(session.id.as_str()) {
                return Err(EventKitError::Config(format!("duplicate session id '{}'", session.id)));
            }
        }
        Ok(())
    }
}

/// Credentials and endpoints for the remote calendar.
///
/// Credential fields stay optional so that a manifest-only process never
/// needs them. Absence is reported as an auth error at first remote use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSettings {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    pub default_user_id: Option<String>,
    pub authority_host: String,
    pub graph_base_url: String,
    pub token_cache_path: Option<PathBuf>,
    pub cache_ttl_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            tenant_id: None,
            client_id: None,
            client_secret: None,
            default_user_id: None,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            token_cache_path: None,
            cache_ttl_seconds: RESPONSE_CACHE_TTL_SECS,
            request_timeout_seconds: HTTP_TIMEOUT_SECS,
        }
    }
}

impl GraphSettings {
    /// Names of required credential fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        let mut missing = Vec::new();
        if blank(&self.tenant_id) {
            missing.push("tenant_id");
        }
        if blank(&self.client_id) {
            missing.push("client_id");
        }
        if blank(&self.client_secret) {
            missing.push("client_secret");
        }
        missing
    }
}
