//! Calendar operations for one user

use std::sync::Arc;

use agenda_core::{CalendarConfig, KeyValueStore};
use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::client::GoogleCalendarClient;
use crate::error::Result;
use crate::models::{CreatedEvent, EventPayload, NewEvent, RemoteEvent};
use crate::oauth::CredentialManager;

/// Calendar operations the assistant tools rely on
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    /// Create an event in the user's calendar
    async fn create_event(&self, event: &NewEvent) -> Result<CreatedEvent>;

    /// Upcoming events from now, at most `count` when given
    async fn get_next_events(&self, count: Option<u32>) -> Result<Vec<RemoteEvent>>;
}

/// Google Calendar access on behalf of one user
pub struct CalendarService {
    user_id: String,
    time_zone: String,
    credentials: CredentialManager,
    client: GoogleCalendarClient,
}

impl CalendarService {
    pub fn new(
        user_id: impl Into<String>,
        time_zone: impl Into<String>,
        credentials: CredentialManager,
        client: GoogleCalendarClient,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            time_zone: time_zone.into(),
            credentials,
            client,
        }
    }

    /// Build from configuration, keeping credentials in `store`
    pub fn from_config(config: &CalendarConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let credentials = CredentialManager::google(store, &config.client_secrets_path)?;
        let client = GoogleCalendarClient::new(&config.base_url, &config.calendar_id)?;
        Ok(Self::new(
            &config.user_id,
            &config.timezone,
            credentials,
            client,
        ))
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

#[async_trait]
impl CalendarBackend for CalendarService {
    async fn create_event(&self, event: &NewEvent) -> Result<CreatedEvent> {
        let credential = self.credentials.acquire_credentials(&self.user_id).await?;
        let payload = EventPayload::from_new_event(event, &self.time_zone);
        let created = self
            .client
            .insert_event(credential.access_token()?, &payload)
            .await?;
        info!(
            user_id = %self.user_id,
            link = created.html_link.as_deref().unwrap_or(""),
            "Event created"
        );
        Ok(created)
    }

    async fn get_next_events(&self, count: Option<u32>) -> Result<Vec<RemoteEvent>> {
        let credential = self.credentials.acquire_credentials(&self.user_id).await?;
        info!(user_id = %self.user_id, count = ?count, "Fetching upcoming events");
        self.client
            .list_events(credential.access_token()?, Utc::now(), count)
            .await
    }
}
