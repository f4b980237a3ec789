//! Google Calendar v3 REST client

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use crate::error::{CalendarError, Result};
use crate::models::{CreatedEvent, EventList, EventPayload, RemoteEvent};

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Client for one calendar
pub struct GoogleCalendarClient {
    client: Client,
    base_url: String,
    calendar_id: String,
}

impl GoogleCalendarClient {
    /// Create a client for `calendar_id` (`primary` for the user's main calendar)
    pub fn new(base_url: impl Into<String>, calendar_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| CalendarError::Configuration(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("Calendar client initialized for: {}", base_url);

        Ok(Self {
            client,
            base_url,
            calendar_id: calendar_id.into(),
        })
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// `{base}/calendars/{calendar_id}/events`, with the id path-encoded
    pub fn events_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| CalendarError::Configuration(format!("invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| CalendarError::Configuration("base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(["calendars", self.calendar_id.as_str(), "events"]);
        Ok(url)
    }

    /// Insert an event
    pub async fn insert_event(&self, access_token: &str, payload: &EventPayload) -> Result<CreatedEvent> {
        let url = self.events_url()?;
        debug!("POST {}", url);

        let created: CreatedEvent = self
            .send(self.client.post(url).bearer_auth(access_token).json(payload))
            .await?;

        info!(event_id = %created.id, "Created event");
        Ok(created)
    }

    /// Upcoming single events ordered by start time
    pub async fn list_events(
        &self,
        access_token: &str,
        time_min: DateTime<Utc>,
        max_results: Option<u32>,
    ) -> Result<Vec<RemoteEvent>> {
        let url = self.events_url()?;
        debug!("GET {}", url);

        let mut query = vec![
            ("timeMin", time_min.to_rfc3339_opts(SecondsFormat::Micros, true)),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        if let Some(max) = max_results {
            query.push(("maxResults", max.to_string()));
        }

        let list: EventList = self
            .send(self.client.get(url).bearer_auth(access_token).query(&query))
            .await?;

        info!("Fetched {} events", list.items.len());
        Ok(list.items)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| CalendarError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CalendarError::HttpError(e.to_string()))?;

        if !status.is_success() {
            error!("Calendar request failed: {} - {}", status, body);
            return Err(status_error(status, body));
        }

        serde_json::from_str(&body).map_err(|e| CalendarError::ParseError(e.to_string()))
    }
}

fn status_error(status: StatusCode, body: String) -> CalendarError {
    if status == StatusCode::UNAUTHORIZED {
        return CalendarError::Authentication(body);
    }
    CalendarError::Api {
        status: status.as_u16(),
        body,
    }
}
