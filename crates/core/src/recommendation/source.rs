//! Candidate session sources
//!
//! The orchestrator only sees [`EventSource`]; both variants hand back the
//! same [`Session`] shape.

use std::sync::Arc;

use eventkit_domain::{DateRange, Result, Session, SourceKind};

use crate::calendar_ports::CalendarEventProvider;

/// Static sessions from the event manifest, normalized on construction.
#[derive(Debug, Clone, Default)]
pub struct ManifestSource {
    sessions: Vec<Session>,
}

impl ManifestSource {
    /// Wrap `sessions`, lower-casing their tags.
    pub fn new(sessions: Vec<Session>) -> Self {
        Self { sessions: sessions.into_iter().map(Session::normalized).collect() }
    }

    /// Sessions in manifest order.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Case-insensitive title lookup.
    pub fn find_by_title(&self, title: &str) -> Option<&Session> {
        let needle = title.trim().to_lowercase();
        self.sessions.iter().find(|s| s.title.trim().to_lowercase() == needle)
    }
}

/// Where the orchestrator reads candidates from.
#[derive(Clone)]
pub enum EventSource {
    /// Local manifest sessions.
    Manifest(ManifestSource),
    /// Sessions fetched through a calendar adapter.
    RemoteCalendar(Arc<dyn CalendarEventProvider>),
}

impl EventSource {
    /// Tag recorded on the result.
    pub const fn kind(&self) -> SourceKind {
        match self {
            Self::Manifest(_) => SourceKind::Manifest,
            Self::RemoteCalendar(_) => SourceKind::Remote,
        }
    }

    /// Candidate sessions in source order. The manifest ignores `user_id`
    /// and `range`.
    pub async fn load(&self, user_id: Option<&str>, range: DateRange) -> Result<Vec<Session>> {
        match self {
            Self::Manifest(manifest) => Ok(manifest.sessions().to_vec()),
            Self::RemoteCalendar(provider) => provider.fetch_events(user_id, range).await,
        }
    }
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manifest(m) => f.debug_tuple("Manifest").field(&m.sessions.len()).finish(),
            Self::RemoteCalendar(_) => f.write_str("RemoteCalendar"),
        }
    }
}
