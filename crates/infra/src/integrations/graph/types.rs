//! Microsoft Graph calendar wire types
//!
//! Only the fields the transformer reads are modelled. Pages are kept as raw
//! JSON so one malformed event cannot fail a whole page.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `calendarView` page
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarPage {
    #[serde(default)]
    pub value: Vec<Value>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

/// Calendar event as returned by `/users/{id}/calendarView`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub start: GraphDateTime,
    pub end: GraphDateTime,
    #[serde(default)]
    pub location: Option<GraphLocation>,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Absent when the caller lacks permission to read attendees.
    #[serde(default)]
    pub attendees: Option<Vec<GraphAttendee>>,
    #[serde(default)]
    pub is_cancelled: bool,
    #[serde(default)]
    pub is_online_meeting: bool,
}

/// `dateTimeTimeZone` resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDateTime {
    pub date_time: String,
    #[serde(default)]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLocation {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphAttendee {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Error body returned by Graph on 4xx/5xx
#[derive(Debug, Default, Deserialize)]
pub struct GraphErrorBody {
    #[serde(default)]
    pub error: Option<GraphErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GraphErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl GraphErrorBody {
    /// `code: message` when Graph returned a structured error.
    pub fn summary(&self) -> Option<String> {
        let detail = self.error.as_ref()?;
        match (&detail.code, &detail.message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (Some(code), None) => Some(code.clone()),
            (None, Some(message)) => Some(message.clone()),
            (None, None) => None,
        }
    }
}
