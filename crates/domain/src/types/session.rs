//! Session data model shared by every event source

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::SESSION_ID_HEX_LEN;

/// Start or end bound of a session.
///
/// Manifest sessions use a bare time of day (`"09:30"`), remote calendar
/// events carry absolute timestamps. Bounds of different kinds are not
/// comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SessionTime {
    TimeOfDay(NaiveTime),
    Absolute(DateTime<Utc>),
}

impl SessionTime {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if let Ok(t) = NaiveTime::parse_from_str(raw, "%H:%M") {
            return Ok(Self::TimeOfDay(t));
        }
        if let Ok(t) = NaiveTime::parse_from_str(raw, "%H:%M:%S") {
            return Ok(Self::TimeOfDay(t));
        }
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| Self::Absolute(dt.with_timezone(&Utc)))
            .map_err(|_| format!("unrecognised session time '{raw}' (expected HH:MM or RFC 3339)"))
    }

    pub const fn is_absolute(&self) -> bool {
        matches!(self, Self::Absolute(_))
    }
}

impl PartialOrd for SessionTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::TimeOfDay(a), Self::TimeOfDay(b)) => Some(a.cmp(b)),
            (Self::Absolute(a), Self::Absolute(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for SessionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeOfDay(t) => write!(f, "{}", t.format("%H:%M")),
            Self::Absolute(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

impl TryFrom<String> for SessionTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionTime> for String {
    fn from(value: SessionTime) -> Self {
        value.to_string()
    }
}

/// A schedulable item (talk, workshop, meeting)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique within a source. Manifest entries without one get a
    /// synthesized id, see [`session_id`].
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub start: SessionTime,
    pub end: SessionTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub popularity: f64,
}

impl Session {
    /// `end > start` with both bounds of the same kind.
    pub fn has_valid_bounds(&self) -> bool {
        matches!(self.end.partial_cmp(&self.start), Some(Ordering::Greater))
    }

    /// Half-open `[start, end)` overlap test.
    pub fn overlaps(&self, other: &Self) -> bool {
        let before =
            |a: &SessionTime, b: &SessionTime| matches!(a.partial_cmp(b), Some(Ordering::Less));
        before(&self.start, &other.end) && before(&other.start, &self.end)
    }

    /// Lower-cases and trims tags, fills a missing id.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.tags = self
            .tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if self.id.trim().is_empty() {
            self.id = session_id(&self.title, &self.start.to_string());
        }
        self
    }
}

/// Stable id for a session: blake3 of subject and start, hex-truncated.
pub fn session_id(subject: &str, start: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(subject.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(start.as_bytes());
    let mut hex = hasher.finalize().to_hex().to_string();
    hex.truncate(SESSION_ID_HEX_LEN);
    hex
}
