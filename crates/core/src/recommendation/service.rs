//! Recommendation service - core orchestration

use std::collections::BTreeSet;
use std::sync::Arc;

use eventkit_common::time::{Clock, SystemClock};
use eventkit_domain::constants::{DEFAULT_DATE_RANGE_DAYS, MAX_TOP_N, MIN_TOP_N};
use eventkit_domain::{
    DateRange, EventKitError, Explanation, InterestSet, ManifestConfig, RecommendSettings,
    RecommendationRequest, RecommendationResult, Result, Session, SourceKind,
};
use tracing::{debug, info, instrument};

use super::conflicts::count_conflicts;
use super::scoring::ScoringEngine;
use super::source::{EventSource, ManifestSource};
use crate::calendar_ports::CalendarEventProvider;

/// Selects the event source, ranks candidates and annotates conflicts.
pub struct RecommendationService {
    manifest: EventSource,
    remote: Option<EventSource>,
    engine: ScoringEngine,
    defaults: RecommendSettings,
    clock: Arc<dyn Clock>,
}

impl RecommendationService {
    /// Build from a loaded manifest.
    ///
    /// # Errors
    /// `EventKitError::Config` when the manifest violates its invariants.
    pub fn from_manifest(config: &ManifestConfig) -> Result<Self> {
        let config = config.clone().normalized();
        config.validate()?;
        Ok(Self {
            manifest: EventSource::Manifest(ManifestSource::new(config.sessions)),
            remote: None,
            engine: ScoringEngine::new(config.weights)?,
            defaults: config.recommend,
            clock: Arc::new(SystemClock),
        })
    }

    /// Enable the remote calendar source
    pub fn with_remote(mut self, provider: Arc<dyn CalendarEventProvider>) -> Self {
        self.remote = Some(EventSource::RemoteCalendar(provider));
        self
    }

    /// Override the clock used for the default date range
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub const fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub fn manifest_sessions(&self) -> &[Session] {
        match &self.manifest {
            EventSource::Manifest(m) => m.sessions(),
            EventSource::RemoteCalendar(_) => &[],
        }
    }

    /// Rank sessions for a request.
    ///
    /// # Errors
    /// - `InvalidInput` for a top-N outside `[1, 100]` or when no interests
    ///   are given and the manifest has no defaults
    /// - `Config` when the remote source is requested but not configured
    /// - `Auth` / `RemoteApi` from the remote calendar, unchanged
    #[instrument(skip(self, request), fields(source = %request.source))]
    pub async fn recommend(&self, request: &RecommendationRequest) -> Result<RecommendationResult> {
        let top = self.resolve_top(request.top)?;
        let interests = self.resolve_interests(&request.interests)?;
        let source = self.source_for(request.source)?;

        let range = request
            .date_range
            .unwrap_or_else(|| {
                DateRange::upcoming_days(self.clock.utc_now(), DEFAULT_DATE_RANGE_DAYS)
            });
        let candidates = source.load(request.user_id.as_deref(), range).await?;
        debug!(candidates = candidates.len(), top, "scoring candidates");

        let scoring = self.engine.select(&candidates, &interests, top);
        let sessions: Vec<Session> = scoring.iter().map(|s| s.session.clone()).collect();
        let conflicts = count_conflicts(&sessions);

        info!(selected = sessions.len(), conflicts, "recommendation complete");
        Ok(RecommendationResult { sessions, scoring, conflicts, source: source.kind() })
    }

    /// Score a single manifest session in isolation.
    ///
    /// Diversity is measured against an empty selection, so it is the full
    /// diversity weight whenever the session has tags.
    ///
    /// # Errors
    /// `InvalidInput` for an unknown title or when no interests are available.
    pub fn explain(&self, title: &str, interests: &InterestSet) -> Result<Explanation> {
        let interests = self.resolve_interests(interests)?;
        let EventSource::Manifest(manifest) = &self.manifest else {
            return Err(EventKitError::Config("manifest source missing".into()));
        };
        let session = manifest
            .find_by_title(title)
            .ok_or_else(|| EventKitError::InvalidInput(format!("no session titled '{title}'")))?;

        let scored = self.engine.score(session, &interests, &BTreeSet::new());
        Ok(Explanation {
            title: scored.session.title,
            score: scored.score,
            contributions: scored.contributions,
            matched_tags: scored.matched_tags,
        })
    }

    fn resolve_top(&self, requested: Option<usize>) -> Result<usize> {
        let top = requested.unwrap_or(self.defaults.max_sessions_default);
        if !(MIN_TOP_N..=MAX_TOP_N).contains(&top) {
            return Err(EventKitError::InvalidInput(format!(
                "top must be between {MIN_TOP_N} and {MAX_TOP_N}, got {top}"
            )));
        }
        Ok(top)
    }

    fn resolve_interests(&self, requested: &InterestSet) -> Result<InterestSet> {
        if !requested.is_empty() {
            return Ok(requested.clone());
        }
        let defaults: InterestSet = self.defaults.default_interests.iter().collect();
        if defaults.is_empty() {
            return Err(EventKitError::InvalidInput(
                "at least one interest is required and no default interests are configured".into(),
            ));
        }
        debug!(count = defaults.len(), "using default interests");
        Ok(defaults)
    }

    fn source_for(&self, kind: SourceKind) -> Result<&EventSource> {
        match kind {
            SourceKind::Manifest => Ok(&self.manifest),
            SourceKind::Remote => self
                .remote
                .as_ref()
                .ok_or_else(|| {
                    EventKitError::Config("remote calendar source is not configured".into())
                }),
        }
    }
}
