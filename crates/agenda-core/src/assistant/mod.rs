//! Assistant runtime API
//!
//! Thread/run/message operations against a hosted assistant service
//! (OpenAI Assistants v2 wire format).

mod bootstrap;
mod client;
mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use bootstrap::{ensure_assistant, AssistantProfile, ASSISTANT_ID_KEY};
pub use client::AssistantClient;
pub use types::*;

use async_trait::async_trait;

use crate::Result;

/// Operations the dispatcher needs from the assistant service
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Create a new assistant
    async fn create_assistant(&self, request: &CreateAssistantRequest) -> Result<Assistant>;

    /// Retrieve an existing assistant
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant>;

    /// Create an empty conversation thread
    async fn create_thread(&self) -> Result<Thread>;

    /// Append a user message to a thread
    async fn create_message(&self, thread_id: &str, content: &str) -> Result<ThreadMessage>;

    /// Start a run of `assistant_id` on a thread
    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: Option<&str>,
    ) -> Result<Run>;

    /// Fetch the current state of a run
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// Submit outputs for every tool call of a run in one batch
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run>;

    /// List the messages of a thread
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>>;
}
