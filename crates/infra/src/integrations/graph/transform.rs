//! Graph event → `Session` mapping
//!
//! Malformed events are skipped with a warning; a batch never fails as a
//! whole. Tags come from a fixed keyword vocabulary matched against the
//! subject, plus the event's categories. Under-tagging is acceptable.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use eventkit_domain::constants::{
    DEFAULT_POPULARITY, POPULARITY_ATTENDEE_SATURATION, TAG_VOCABULARY,
};
use eventkit_domain::{session_id, Session, SessionTime};
use serde_json::Value;
use tracing::{debug, warn};

use super::types::{GraphDateTime, GraphEvent};

const UNTITLED: &str = "Untitled Event";
const ONLINE_TAG: &str = "online";

/// Zone names Graph uses for UTC.
const UTC_ZONES: &[&str] = &["utc", "etc/utc", "gmt", "etc/gmt", "z"];

#[derive(Debug, Clone)]
pub struct EventTransformer {
    vocabulary: BTreeSet<String>,
}

impl Default for EventTransformer {
    fn default() -> Self {
        Self::with_vocabulary(TAG_VOCABULARY.iter().copied())
    }
}

impl EventTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vocabulary<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let vocabulary = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { vocabulary }
    }

    /// Map a page of raw events, preserving order and dropping the unusable ones.
    pub fn transform_all(&self, raw: &[Value]) -> Vec<Session> {
        let sessions: Vec<Session> =
            raw.iter().filter_map(|event| self.transform(event)).collect();
        if sessions.len() < raw.len() {
            debug!(
                received = raw.len(),
                kept = sessions.len(),
                "Dropped remote events during transform"
            );
        }
        sessions
    }

    /// Map one raw event. `None` when the event is cancelled or malformed.
    pub fn transform(&self, raw: &Value) -> Option<Session> {
        let event: GraphEvent = match serde_json::from_value(raw.clone()) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "Skipping malformed remote event");
                return None;
            }
        };

        let title = event
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNTITLED)
            .to_string();

        if event.is_cancelled {
            debug!(%title, "Skipping cancelled event");
            return None;
        }

        let (Some(start), Some(end)) =
            (parse_graph_time(&event.start), parse_graph_time(&event.end))
        else {
            warn!(%title, "Skipping event with unparseable start or end");
            return None;
        };
        if end <= start {
            warn!(%title, %start, %end, "Skipping event that ends before it starts");
            return None;
        }

        let start_key = start.to_rfc3339();
        Some(Session {
            id: session_id(&title, &start_key),
            tags: self.tags_for(&title, &event),
            popularity: popularity(&event),
            location: Some(
                event
                    .location
                    .and_then(|l| l.display_name)
                    .map(|name| name.trim().to_string())
                    .unwrap_or_default(),
            ),
            start: SessionTime::Absolute(start),
            end: SessionTime::Absolute(end),
            title,
        })
    }

    fn tags_for(&self, title: &str, event: &GraphEvent) -> BTreeSet<String> {
        let lowered = title.to_lowercase();
        let mut tags: BTreeSet<String> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| self.vocabulary.contains(*word))
            .map(str::to_string)
            .collect();

        tags.extend(
            event
                .categories
                .iter()
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty()),
        );
        if event.is_online_meeting {
            tags.insert(ONLINE_TAG.to_string());
        }
        tags
    }
}

/// `min(attendees / 100, 1)`; the fixed default when Graph sent no attendees.
fn popularity(event: &GraphEvent) -> f64 {
    match event.attendees.as_deref() {
        Some(attendees) if !attendees.is_empty() => {
            (attendees.len() as f64 / POPULARITY_ATTENDEE_SATURATION).min(1.0)
        }
        _ => DEFAULT_POPULARITY,
    }
}

/// Parse a `dateTimeTimeZone` value into UTC.
///
/// Accepts RFC 3339 strings with an offset, or a naive local time paired with
/// a UTC zone name or a fixed `±HH:MM` offset. Named regional zones are not
/// resolved; requests ask Graph for UTC so they do not occur in practice.
pub(crate) fn parse_graph_time(value: &GraphDateTime) -> Option<DateTime<Utc>> {
    let raw = value.date_time.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()?;

    let zone = value.time_zone.as_deref().map(str::trim).unwrap_or("UTC");
    if zone.is_empty() || UTC_ZONES.contains(&zone.to_lowercase().as_str()) {
        return Some(Utc.from_utc_datetime(&naive));
    }

    let offset: FixedOffset = zone.parse().ok()?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(subject: &str, start: &str, end: &str) -> Value {
        json!({
            "id": "AAMk-native",
            "subject": subject,
            "start": {"dateTime": start, "timeZone": "UTC"},
            "end": {"dateTime": end, "timeZone": "UTC"},
            "location": {"displayName": "Room 101"},
            "categories": [],
        })
    }

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn maps_core_fields() {
        let transformer = EventTransformer::new();
        let session = transformer
            .transform(&event("Intro to AI Agents", "2025-03-01T09:00:00.0000000", "2025-03-01T10:00:00.0000000"))
            .unwrap();

        assert_eq!(session.title, "Intro to AI Agents");
        assert_eq!(session.start, SessionTime::Absolute(at("2025-03-01T09:00:00Z")));
        assert_eq!(session.end, SessionTime::Absolute(at("2025-03-01T10:00:00Z")));
        assert_eq!(session.location.as_deref(), Some("Room 101"));
        assert_eq!(session.tags.iter().map(String::as_str).collect::<Vec<_>>(), vec!["agents", "ai"]);
        assert_eq!(session.id.len(), 16);
        assert_ne!(session.id, "AAMk-native");
    }

    #[test]
    fn id_is_stable_for_subject_and_start() {
        let transformer = EventTransformer::new();
        let raw = event("Standup", "2025-03-01T09:00:00", "2025-03-01T09:15:00");
        let first = transformer.transform(&raw).unwrap();
        let second = transformer.transform(&raw).unwrap();
        assert_eq!(first.id, second.id);

        let moved = transformer
            .transform(&event("Standup", "2025-03-02T09:00:00", "2025-03-02T09:15:00"))
            .unwrap();
        assert_ne!(first.id, moved.id);
    }

    #[test]
    fn missing_location_becomes_empty_string() {
        let mut raw = event("Sync", "2025-03-01T09:00:00", "2025-03-01T10:00:00");
        raw.as_object_mut().unwrap().remove("location");
        let session = EventTransformer::new().transform(&raw).unwrap();
        assert_eq!(session.location.as_deref(), Some(""));
    }

    #[test]
    fn popularity_from_attendees_with_default() {
        let transformer = EventTransformer::new();
        let mut raw = event("Sync", "2025-03-01T09:00:00", "2025-03-01T10:00:00");

        let absent = transformer.transform(&raw).unwrap();
        assert!((absent.popularity - DEFAULT_POPULARITY).abs() < f64::EPSILON);

        raw["attendees"] = json!(vec![json!({"type": "required"}); 25]);
        let quarter = transformer.transform(&raw).unwrap();
        assert!((quarter.popularity - 0.25).abs() < 1e-9);

        raw["attendees"] = json!(vec![json!({"type": "required"}); 250]);
        let saturated = transformer.transform(&raw).unwrap();
        assert!((saturated.popularity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn categories_and_online_flag_add_tags() {
        let mut raw = event("Quarterly review", "2025-03-01T09:00:00", "2025-03-01T10:00:00");
        raw["categories"] = json!(["  Security ", "Red category", ""]);
        raw["isOnlineMeeting"] = json!(true);

        let session = EventTransformer::new().transform(&raw).unwrap();
        let tags: Vec<_> = session.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["online", "red category", "security"]);
    }

    #[test]
    fn vocabulary_matches_whole_words_only() {
        let session = EventTransformer::new()
            .transform(&event("Maintenance window: RAG/LLM eval", "2025-03-01T09:00:00", "2025-03-01T10:00:00"))
            .unwrap();
        // "maintenance" contains "ai" but is not the word "ai"
        let tags: Vec<_> = session.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["llm", "rag"]);
    }

    #[test]
    fn skips_cancelled_malformed_and_inverted() {
        let transformer = EventTransformer::new();
        let mut cancelled = event("Cancelled", "2025-03-01T09:00:00", "2025-03-01T10:00:00");
        cancelled["isCancelled"] = json!(true);
        let inverted = event("Backwards", "2025-03-01T10:00:00", "2025-03-01T09:00:00");
        let zero_length = event("Instant", "2025-03-01T10:00:00", "2025-03-01T10:00:00");
        let garbage_time = event("Garbage", "not a time", "2025-03-01T10:00:00");
        let no_start = json!({"subject": "No start", "end": {"dateTime": "2025-03-01T10:00:00"}});
        let good = event("Keeper", "2025-03-01T11:00:00", "2025-03-01T12:00:00");

        let sessions =
            transformer.transform_all(&[cancelled, inverted, zero_length, garbage_time, no_start, json!(42), good]);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].title, "Keeper");
    }

    #[test]
    fn missing_subject_gets_placeholder_title() {
        let mut raw = event("", "2025-03-01T09:00:00", "2025-03-01T10:00:00");
        raw.as_object_mut().unwrap().remove("subject");
        let session = EventTransformer::new().transform(&raw).unwrap();
        assert_eq!(session.title, "Untitled Event");
    }

    #[test]
    fn parses_offsets_and_zulu() {
        let zulu = GraphDateTime { date_time: "2025-03-01T09:00:00Z".into(), time_zone: None };
        assert_eq!(parse_graph_time(&zulu), Some(at("2025-03-01T09:00:00Z")));

        let offset = GraphDateTime { date_time: "2025-03-01T09:00:00".into(), time_zone: Some("+02:00".into()) };
        assert_eq!(parse_graph_time(&offset), Some(at("2025-03-01T07:00:00Z")));

        let named = GraphDateTime { date_time: "2025-03-01T09:00:00".into(), time_zone: Some("Pacific Standard Time".into()) };
        assert_eq!(parse_graph_time(&named), None);
    }
}
