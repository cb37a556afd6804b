use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::interest::InterestSet;
use super::scoring::{ScoreContributions, ScoredSession};
use super::session::Session;
use crate::errors::{EventKitError, Result};

/// Where candidate sessions come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Manifest,
    Remote,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Manifest => "manifest",
            Self::Remote => "remote",
        })
    }
}

impl FromStr for SourceKind {
    type Err = EventKitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manifest" => Ok(Self::Manifest),
            "remote" | "graph" => Ok(Self::Remote),
            other => Err(EventKitError::InvalidInput(format!(
                "unknown source '{other}' (expected 'manifest' or 'remote')"
            ))),
        }
    }
}

const MAX_RANGE_DAYS: i64 = 3660;

/// Calendar query window, `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(EventKitError::InvalidInput(format!(
                "date range end {end} must be after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// `days` whole days from `start`, at least one and at most ten years.
    pub fn days_from(start: DateTime<Utc>, days: i64) -> Self {
        let end = start
            .checked_add_signed(Duration::days(days.clamp(1, MAX_RANGE_DAYS)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { start, end }
    }

    /// Window starting at the beginning of `now`'s UTC day.
    ///
    /// Every call within the same day yields the same range, so repeated
    /// default queries share one response cache entry.
    pub fn upcoming_days(now: DateTime<Utc>, days: i64) -> Self {
        let midnight = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN));
        Self::days_from(midnight, days)
    }
}

/// Caller request handed to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub interests: InterestSet,
    /// Falls back to the manifest default when absent.
    #[serde(default)]
    pub top: Option<usize>,
    #[serde(default)]
    pub source: SourceKind,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

impl RecommendationRequest {
    pub fn new(interests: InterestSet) -> Self {
        Self { interests, ..Self::default() }
    }

    #[must_use]
    pub const fn with_top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }

    #[must_use]
    pub const fn with_source(mut self, source: SourceKind) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    #[must_use]
    pub const fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }
}

/// Ranked output. `scoring` is parallel to `sessions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub sessions: Vec<Session>,
    pub scoring: Vec<ScoredSession>,
    /// Overlapping pairs among `sessions`.
    pub conflicts: usize,
    pub source: SourceKind,
}

/// Single-session score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub title: String,
    pub score: f64,
    pub contributions: ScoreContributions,
    pub matched_tags: BTreeSet<String>,
}
