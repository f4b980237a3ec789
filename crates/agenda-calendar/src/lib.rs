//! agenda-calendar: Google Calendar integration for the agenda gateway
//!
//! Provides OAuth2 credential management, a Calendar v3 client and the two
//! assistant functions built on top of them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agenda_calendar::{register_calendar_tools, CalendarService};
//! use agenda_core::{CalendarConfig, JsonFileStore, ToolManager};
//! use std::sync::Arc;
//!
//! let config = CalendarConfig::default();
//! let store = Arc::new(JsonFileStore::new(&config.token_store_path));
//! let service = Arc::new(CalendarService::from_config(&config, store)?);
//!
//! let mut tools = ToolManager::new();
//! register_calendar_tools(&mut tools, service);
//! ```

pub mod client;
pub mod error;
pub mod format;
pub mod models;
pub mod oauth;
pub mod service;
pub mod tools;

pub use client::GoogleCalendarClient;
pub use error::{CalendarError, Result};
pub use format::format_events;
pub use models::{CreatedEvent, EventPayload, EventTime, NewEvent, RemoteEvent};
pub use oauth::{ClientSecrets, ConsentFlow, Credential, CredentialManager, TokenEndpoint};
pub use service::{CalendarBackend, CalendarService};
pub use tools::{function_contract, register_calendar_tools, CreateEventTool, GetNextEventsTool};
