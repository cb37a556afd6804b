use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use eventkit_core::CalendarEventProvider;
use eventkit_domain::{DateRange, EventKitError, Result as DomainResult, Session, SessionTime};

/// In-memory mock for `CalendarEventProvider`.
///
/// Returns a fixed list of sessions, or a fixed error, and records every
/// call so tests can assert on user ids and date ranges.
#[derive(Default)]
pub struct MockCalendarProvider {
    sessions: Vec<Session>,
    failure: Option<EventKitError>,
    calls: AtomicUsize,
    last_call: Mutex<Option<(Option<String>, DateRange)>>,
}

impl MockCalendarProvider {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self { sessions, ..Self::default() }
    }

    pub fn failing(error: EventKitError) -> Self {
        Self { failure: Some(error), ..Self::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<(Option<String>, DateRange)> {
        self.last_call.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarEventProvider for MockCalendarProvider {
    async fn fetch_events(&self, user_id: Option<&str>, range: DateRange) -> DomainResult<Vec<Session>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock().unwrap() = Some((user_id.map(str::to_string), range));
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.sessions.clone()),
        }
    }
}

/// Remote-style session with absolute bounds.
pub fn remote_session(id: &str, start: &str, end: &str, tags: &[&str], popularity: f64) -> Session {
    Session {
        id: id.into(),
        title: format!("Remote {id}"),
        start: SessionTime::parse(start).unwrap(),
        end: SessionTime::parse(end).unwrap(),
        location: Some(String::new()),
        tags: tags.iter().map(|t| (*t).to_string()).collect(),
        popularity,
    }
}
