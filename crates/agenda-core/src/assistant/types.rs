//! Assistant API types (threads, runs, messages)

use serde::{Deserialize, Serialize};

use crate::tool::ToolDefinition;

/// Remote assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

/// Request body for creating an assistant
#[derive(Debug, Clone, Serialize)]
pub struct CreateAssistantRequest {
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub model: String,
    pub tools: Vec<ToolDefinition>,
}

/// Conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Run lifecycle status as reported by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    /// Any status this client does not know about
    #[serde(other)]
    Unknown,
}

/// Coarse run state used by the polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Still being processed; poll again
    Pending,
    /// Waiting for tool outputs
    ActionRequired,
    /// Terminal; polling stops
    Done,
}

impl RunStatus {
    /// Map the status onto the polling state machine
    ///
    /// Unrecognised statuses are treated as pending.
    pub fn phase(&self) -> RunPhase {
        match self {
            Self::RequiresAction => RunPhase::ActionRequired,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Expired | Self::Incomplete => {
                RunPhase::Done
            }
            Self::Queued | Self::InProgress | Self::Cancelling | Self::Unknown => {
                RunPhase::Pending
            }
        }
    }
}

/// One assistant invocation against a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub assistant_id: Option<String>,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

impl Run {
    /// Tool calls requested by a run in `requires_action`
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.required_action
            .as_ref()
            .and_then(|a| a.submit_tool_outputs.as_ref())
            .map(|s| s.tool_calls.as_slice())
            .unwrap_or(&[])
    }
}

/// Action the run is waiting for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub submit_tool_outputs: Option<SubmitToolOutputs>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<ToolCall>,
}

/// Function call requested by a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_tool_type")]
    pub kind: String,
    pub function: FunctionCall,
}

fn default_tool_type() -> String {
    "function".to_string()
}

impl ToolCall {
    /// Create a function tool call
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: default_tool_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Function name plus JSON-encoded arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// Error detail attached to a failed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Output for one tool call, submitted back to a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// Request body for creating a run
#[derive(Debug, Clone, Serialize)]
pub struct CreateRunRequest {
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Request body for posting a message
#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest {
    pub role: String,
    pub content: String,
}

/// Request body for submitting tool outputs
#[derive(Debug, Clone, Serialize)]
pub struct SubmitToolOutputsRequest {
    pub tool_outputs: Vec<ToolOutput>,
}

/// Message stored in a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContentPart>,
}

impl ThreadMessage {
    /// Text parts joined by newlines
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                MessageContentPart::Text { text } => Some(text.value.clone()),
                MessageContentPart::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Content part of a thread message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContentPart {
    Text { text: MessageText },
    /// Images, files and other parts not rendered here
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageText {
    pub value: String,
}

/// Paginated list wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
}

/// Error body returned by the remote service
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_status_phases() {
        assert_eq!(RunStatus::Queued.phase(), RunPhase::Pending);
        assert_eq!(RunStatus::InProgress.phase(), RunPhase::Pending);
        assert_eq!(RunStatus::RequiresAction.phase(), RunPhase::ActionRequired);
        assert_eq!(RunStatus::Completed.phase(), RunPhase::Done);
        assert_eq!(RunStatus::Failed.phase(), RunPhase::Done);
        assert_eq!(RunStatus::Cancelled.phase(), RunPhase::Done);
        assert_eq!(RunStatus::Cancelling.phase(), RunPhase::Pending);
    }

    #[test]
    fn test_unknown_status_is_pending() {
        let status: RunStatus = serde_json::from_value(json!("warming_up")).unwrap();
        assert_eq!(status, RunStatus::Unknown);
        assert_eq!(status.phase(), RunPhase::Pending);
    }

    #[test]
    fn test_parse_requires_action_run() {
        let run: Run = serde_json::from_value(json!({
            "id": "run_1",
            "object": "thread.run",
            "thread_id": "thread_1",
            "assistant_id": "asst_1",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_next_events", "arguments": "{\"events\": 7}"}
                    }]
                }
            }
        }))
        .unwrap();

        assert_eq!(run.status, RunStatus::RequiresAction);
        assert_eq!(run.tool_calls().len(), 1);
        assert_eq!(run.tool_calls()[0].function.name, "get_next_events");
    }

    #[test]
    fn test_run_without_action_has_no_calls() {
        let run: Run = serde_json::from_value(json!({
            "id": "run_1", "thread_id": "thread_1", "status": "queued"
        }))
        .unwrap();
        assert!(run.tool_calls().is_empty());
    }

    #[test]
    fn test_message_text_content_skips_images() {
        let message: ThreadMessage = serde_json::from_value(json!({
            "id": "msg_1",
            "role": "assistant",
            "content": [
                {"type": "image_file", "image_file": {"file_id": "f"}},
                {"type": "text", "text": {"value": "Olá", "annotations": []}}
            ]
        }))
        .unwrap();
        assert_eq!(message.text_content(), "Olá");
    }
}
