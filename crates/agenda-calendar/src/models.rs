//! Data models for the Google Calendar v3 API

use serde::{Deserialize, Serialize};

/// Email reminder one day before the event
pub const EMAIL_REMINDER_MINUTES: u32 = 24 * 60;

/// Popup reminder half an hour before the event
pub const POPUP_REMINDER_MINUTES: u32 = 30;

/// Event requested by the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Event title
    pub summary: String,
    /// Start, as a local date-time string (`2024-03-15T09:00:00`)
    pub start: String,
    /// End, same format as `start`
    pub end: String,
    /// Attendee e-mail addresses
    #[serde(default)]
    pub attendees: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl NewEvent {
    pub fn new(summary: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            start: start.into(),
            end: end.into(),
            attendees: None,
            description: None,
            location: None,
        }
    }

    pub fn with_attendees(mut self, attendees: Vec<String>) -> Self {
        self.attendees = Some(attendees);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Request body for `events.insert`
#[derive(Debug, Clone, Serialize)]
pub struct EventPayload {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<Attendee>>,
    pub reminders: Reminders,
}

impl EventPayload {
    /// Build the insert body, pinning both ends to `time_zone`
    ///
    /// Attendees are only included when at least one address is given.
    pub fn from_new_event(event: &NewEvent, time_zone: &str) -> Self {
        let attendees = event
            .attendees
            .as_ref()
            .filter(|list| !list.is_empty())
            .map(|list| {
                list.iter()
                    .map(|email| Attendee {
                        email: email.clone(),
                    })
                    .collect()
            });

        Self {
            summary: event.summary.clone(),
            location: event.location.clone(),
            description: event.description.clone(),
            start: EventDateTime::new(&event.start, time_zone),
            end: EventDateTime::new(&event.end, time_zone),
            attendees,
            reminders: Reminders::default(),
        }
    }
}

/// Date-time with an explicit zone, as sent on insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

impl EventDateTime {
    fn new(date_time: &str, time_zone: &str) -> Self {
        Self {
            date_time: date_time.to_string(),
            time_zone: time_zone.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attendee {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub use_default: bool,
    pub overrides: Vec<ReminderOverride>,
}

impl Default for Reminders {
    fn default() -> Self {
        Self {
            use_default: false,
            overrides: vec![
                ReminderOverride {
                    method: "email".to_string(),
                    minutes: EMAIL_REMINDER_MINUTES,
                },
                ReminderOverride {
                    method: "popup".to_string(),
                    minutes: POPUP_REMINDER_MINUTES,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: u32,
}

/// Response of `events.insert`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEvent {
    pub id: String,
    #[serde(default)]
    pub html_link: Option<String>,
}

/// Event as returned by `events.list`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
    #[serde(default)]
    pub attendees: Vec<RemoteAttendee>,
    #[serde(default)]
    pub html_link: Option<String>,
}

/// Start or end of a listed event; all-day events carry `date` only
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

impl EventTime {
    /// Timed event boundary
    pub fn at(date_time: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time.into()),
            ..Default::default()
        }
    }

    /// All-day event boundary
    pub fn on(date: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAttendee {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub response_status: Option<String>,
}

/// Response of `events.list`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventList {
    #[serde(default)]
    pub items: Vec<RemoteEvent>,
}
