//! Scripted in-memory assistant for tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::*;
use crate::tool::ToolDefinition;
use crate::{Error, Result};

/// Replays a fixed sequence of run states and records every call
pub(crate) struct ScriptedAssistant {
    script: Mutex<VecDeque<std::result::Result<Run, String>>>,
    remote_tools: Vec<ToolDefinition>,
    retrieve_calls: Mutex<u32>,
    submissions: Mutex<Vec<Vec<ToolOutput>>>,
    runs_created: Mutex<Vec<(String, String, Option<String>)>>,
    messages_posted: Mutex<Vec<(String, String)>>,
    assistants_created: Mutex<Vec<CreateAssistantRequest>>,
    thread_messages: Vec<ThreadMessage>,
}

impl ScriptedAssistant {
    pub(crate) fn new(script: Vec<std::result::Result<Run, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            remote_tools: Vec::new(),
            retrieve_calls: Mutex::new(0),
            submissions: Mutex::new(Vec::new()),
            runs_created: Mutex::new(Vec::new()),
            messages_posted: Mutex::new(Vec::new()),
            assistants_created: Mutex::new(Vec::new()),
            thread_messages: Vec::new(),
        }
    }

    pub(crate) fn with_remote_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.remote_tools = tools;
        self
    }

    pub(crate) fn with_thread_messages(mut self, messages: Vec<ThreadMessage>) -> Self {
        self.thread_messages = messages;
        self
    }

    pub(crate) fn retrieve_calls(&self) -> u32 {
        *self.retrieve_calls.lock().unwrap()
    }

    pub(crate) fn submissions(&self) -> Vec<Vec<ToolOutput>> {
        self.submissions.lock().unwrap().clone()
    }

    pub(crate) fn runs_created(&self) -> Vec<(String, String, Option<String>)> {
        self.runs_created.lock().unwrap().clone()
    }

    pub(crate) fn messages_posted(&self) -> Vec<(String, String)> {
        self.messages_posted.lock().unwrap().clone()
    }

    pub(crate) fn created_assistants(&self) -> Vec<CreateAssistantRequest> {
        self.assistants_created.lock().unwrap().clone()
    }
}

/// Run in `status` with no required action
pub(crate) fn run(status: RunStatus) -> Run {
    Run {
        id: "run_1".to_string(),
        thread_id: "thread_1".to_string(),
        assistant_id: Some("asst_1".to_string()),
        status,
        required_action: None,
        last_error: None,
    }
}

/// Run in `requires_action` asking for `calls`
pub(crate) fn action_run(calls: Vec<ToolCall>) -> Run {
    Run {
        required_action: Some(RequiredAction {
            kind: "submit_tool_outputs".to_string(),
            submit_tool_outputs: Some(SubmitToolOutputs { tool_calls: calls }),
        }),
        ..run(RunStatus::RequiresAction)
    }
}

/// Thread message with a single text part
pub(crate) fn text_message(role: &str, text: &str) -> ThreadMessage {
    ThreadMessage {
        id: format!("msg_{}", role),
        role: role.to_string(),
        content: vec![MessageContentPart::Text {
            text: MessageText {
                value: text.to_string(),
            },
        }],
    }
}

#[async_trait]
impl AssistantApi for ScriptedAssistant {
    async fn create_assistant(&self, request: &CreateAssistantRequest) -> Result<Assistant> {
        self.assistants_created.lock().unwrap().push(request.clone());
        Ok(Assistant {
            id: "asst_created".to_string(),
            name: Some(request.name.clone()),
            model: request.model.clone(),
            tools: request.tools.clone(),
        })
    }

    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant> {
        Ok(Assistant {
            id: assistant_id.to_string(),
            name: None,
            model: "gpt-3.5-turbo-1106".to_string(),
            tools: self.remote_tools.clone(),
        })
    }

    async fn create_thread(&self) -> Result<Thread> {
        Ok(Thread {
            id: "thread_1".to_string(),
            created_at: None,
        })
    }

    async fn create_message(&self, thread_id: &str, content: &str) -> Result<ThreadMessage> {
        self.messages_posted
            .lock()
            .unwrap()
            .push((thread_id.to_string(), content.to_string()));
        Ok(text_message("user", content))
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: Option<&str>,
    ) -> Result<Run> {
        self.runs_created.lock().unwrap().push((
            thread_id.to_string(),
            assistant_id.to_string(),
            instructions.map(str::to_string),
        ));
        Ok(run(RunStatus::Queued))
    }

    async fn retrieve_run(&self, _thread_id: &str, _run_id: &str) -> Result<Run> {
        *self.retrieve_calls.lock().unwrap() += 1;
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(run)) => Ok(run),
            Some(Err(message)) => Err(Error::AssistantApi(message)),
            None => Ok(run(RunStatus::Completed)),
        }
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        _run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run> {
        self.submissions.lock().unwrap().push(outputs.to_vec());
        Ok(run(RunStatus::Queued))
    }

    async fn list_messages(&self, _thread_id: &str) -> Result<Vec<ThreadMessage>> {
        Ok(self.thread_messages.clone())
    }
}
