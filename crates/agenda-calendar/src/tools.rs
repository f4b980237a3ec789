//! Calendar functions exposed to the assistant

use std::sync::Arc;

use agenda_core::{Error, Result, Tool, ToolDefinition, ToolManager, ToolResult};
use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tracing::error;

use crate::error::CalendarError;
use crate::format::format_events;
use crate::models::NewEvent;
use crate::service::CalendarBackend;

pub const CREATE_EVENT: &str = "create_event";
pub const GET_NEXT_EVENTS: &str = "get_next_events";

const CREATE_EVENT_DESCRIPTION: &str = "Uma função que permite criar um evento no Google Calendar";
const GET_NEXT_EVENTS_DESCRIPTION: &str =
    "Uma função que permite obter os próximos eventos do Google Calendar";

/// Message returned to the assistant when the calendar call fails
fn connection_error(e: &CalendarError) -> ToolResult {
    ToolResult::error(format!("Erro ao conectar com o Google Calendar: {}", e.detail()))
}

fn create_event_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "summary": {
                "type": "string",
                "description": "O título do evento"
            },
            "start": {
                "type": "string",
                "description": "O horário de início do evento"
            },
            "end": {
                "type": "string",
                "description": "O horário de fim do evento"
            },
            "attendees": {
                "type": "array",
                "items": {
                    "type": "string"
                },
                "description": "Os participantes do evento e.g. ['email@email1.com', 'email@email2.com']. Esse parametro só vai ser preenchido caso seja explicitado algum email na mensagem, se não ele é nulo"
            },
            "description": {
                "type": "string",
                "description": "A descrição do evento"
            },
            "location": {
                "type": "string",
                "description": "O local do evento"
            }
        },
        "required": ["summary", "start", "end"]
    })
}

fn get_next_events_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "events": {
                "type": "number",
                "description": "O número de eventos a serem obtidos"
            }
        },
        "required": []
    })
}

/// Function contract advertised to the assistant
pub fn function_contract() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(CREATE_EVENT, CREATE_EVENT_DESCRIPTION, create_event_schema()),
        ToolDefinition::function(
            GET_NEXT_EVENTS,
            GET_NEXT_EVENTS_DESCRIPTION,
            get_next_events_schema(),
        ),
    ]
}

/// Register both calendar tools against `backend`
pub fn register_calendar_tools(manager: &mut ToolManager, backend: Arc<dyn CalendarBackend>) {
    manager.register(Arc::new(CreateEventTool::new(backend.clone())));
    manager.register(Arc::new(GetNextEventsTool::new(backend)));
}

/// `create_event`
pub struct CreateEventTool {
    backend: Arc<dyn CalendarBackend>,
}

impl CreateEventTool {
    pub fn new(backend: Arc<dyn CalendarBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for CreateEventTool {
    fn name(&self) -> &str {
        CREATE_EVENT
    }

    fn description(&self) -> &str {
        CREATE_EVENT_DESCRIPTION
    }

    fn input_schema(&self) -> JsonValue {
        create_event_schema()
    }

    async fn execute(&self, input: JsonValue) -> Result<ToolResult> {
        let event: NewEvent = serde_json::from_value(input)
            .map_err(|e| Error::ToolExecution(format!("Invalid create_event arguments: {}", e)))?;

        match self.backend.create_event(&event).await {
            Ok(created) => Ok(ToolResult::success(format!(
                "Evento criado com sucesso: {}",
                created.html_link.unwrap_or_default()
            ))),
            Err(e) => {
                error!("Failed to create event: {}", e);
                Ok(connection_error(&e))
            }
        }
    }
}

/// `get_next_events`
pub struct GetNextEventsTool {
    backend: Arc<dyn CalendarBackend>,
}

impl GetNextEventsTool {
    pub fn new(backend: Arc<dyn CalendarBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for GetNextEventsTool {
    fn name(&self) -> &str {
        GET_NEXT_EVENTS
    }

    fn description(&self) -> &str {
        GET_NEXT_EVENTS_DESCRIPTION
    }

    fn input_schema(&self) -> JsonValue {
        get_next_events_schema()
    }

    async fn execute(&self, input: JsonValue) -> Result<ToolResult> {
        let count = parse_count(&input)?;

        match self.backend.get_next_events(count).await {
            Ok(events) => Ok(ToolResult::success(format_events(&events))),
            Err(e) => {
                error!("Failed to fetch events: {}", e);
                Ok(connection_error(&e))
            }
        }
    }
}

/// `events` is declared as a JSON number, so `7.0` is accepted
fn parse_count(input: &JsonValue) -> Result<Option<u32>> {
    let Some(value) = input.get("events").filter(|v| !v.is_null()) else {
        return Ok(None);
    };

    let count = value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| {
            Error::ToolExecution(format!("'events' must be a non-negative integer, got {}", value))
        })?;

    Ok(Some(count))
}
