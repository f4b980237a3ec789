//! Run polling loop and tool-call routing

use std::sync::Arc;

use chrono::Local;
use serde_json::{json, Value as JsonValue};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::assistant::{AssistantApi, Run, RunPhase, Thread, ToolCall, ToolOutput};
use crate::tool::{ToolManager, ToolResult};
use crate::{Error, Result};

use super::instructions::run_instructions;
use super::policy::{DispatchMode, PollPolicy, PollState, UnknownFunctionPolicy};
use super::transcript::TranscriptLine;

/// Output of one tool call, paired with the call that requested it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallResult {
    pub tool_call_id: String,
    pub function_name: String,
    pub output: String,
    pub is_error: bool,
}

impl ToolCallResult {
    fn from_tool_result(call: &ToolCall, result: ToolResult) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            function_name: call.function.name.clone(),
            output: result.output,
            is_error: result.is_error,
        }
    }

    fn error(call: &ToolCall, message: impl Into<String>) -> Self {
        Self::from_tool_result(call, ToolResult::error(message))
    }

    /// Wire form submitted back to the run
    pub fn to_output(&self) -> ToolOutput {
        ToolOutput {
            tool_call_id: self.tool_call_id.clone(),
            output: self.output.clone(),
        }
    }
}

/// What [`Dispatcher::await_actionable`] stopped on
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The run reached a terminal status
    Finished(Run),
    /// Direct mode: outputs of the requested calls, not submitted
    ToolOutputs(Vec<ToolCallResult>),
}

/// Drives runs of one assistant against the local tool registry
pub struct Dispatcher {
    api: Arc<dyn AssistantApi>,
    assistant_id: String,
    tools: Arc<ToolManager>,
    poll_policy: PollPolicy,
    unknown_function: UnknownFunctionPolicy,
}

impl Dispatcher {
    /// Create a dispatcher with the default polling and unknown-function policies
    pub fn new(
        api: Arc<dyn AssistantApi>,
        assistant_id: impl Into<String>,
        tools: Arc<ToolManager>,
    ) -> Self {
        Self {
            api,
            assistant_id: assistant_id.into(),
            tools,
            poll_policy: PollPolicy::default(),
            unknown_function: UnknownFunctionPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    pub fn with_unknown_function_policy(mut self, policy: UnknownFunctionPolicy) -> Self {
        self.unknown_function = policy;
        self
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    /// Open a new conversation thread
    pub async fn start_conversation(&self) -> Result<Thread> {
        self.api.create_thread().await
    }

    /// Post a user message and start a run on it
    pub async fn submit_message(&self, thread: &Thread, text: &str) -> Result<Run> {
        self.api.create_message(&thread.id, text).await?;
        let instructions = run_instructions(Local::now().naive_local());
        self.api
            .create_run(&thread.id, &self.assistant_id, Some(&instructions))
            .await
    }

    /// Poll `run` until it finishes or asks for tool outputs
    ///
    /// In [`DispatchMode::Conversational`] requested calls are executed,
    /// their outputs submitted in one batch and polling resumes. In
    /// [`DispatchMode::Direct`] the outputs are returned without submission.
    pub async fn await_actionable(
        &self,
        run: &Run,
        mode: DispatchMode,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<DispatchOutcome> {
        let thread_id = run.thread_id.as_str();
        let run_id = run.id.as_str();
        let mut state = PollState::new(&self.poll_policy);

        loop {
            let current = match self.api.retrieve_run(thread_id, run_id).await {
                Ok(current) => current,
                Err(e) => {
                    warn!(run_id, error = %e, "Failed to retrieve run, retrying");
                    state.wait(run_id, shutdown).await?;
                    continue;
                }
            };

            match current.status.phase() {
                RunPhase::Pending => {
                    state.wait(run_id, shutdown).await?;
                }
                RunPhase::ActionRequired => {
                    let results = self.execute_tool_calls(current.tool_calls()).await?;

                    if mode == DispatchMode::Direct {
                        info!(run_id, calls = results.len(), "Returning tool outputs without submission");
                        return Ok(DispatchOutcome::ToolOutputs(results));
                    }

                    let outputs: Vec<ToolOutput> =
                        results.iter().map(ToolCallResult::to_output).collect();
                    self.api
                        .submit_tool_outputs(thread_id, run_id, &outputs)
                        .await?;
                    info!(run_id, outputs = outputs.len(), "Submitted tool outputs");
                    state.reset();
                }
                RunPhase::Done => {
                    if let Some(last_error) = &current.last_error {
                        warn!(
                            run_id,
                            status = ?current.status,
                            message = last_error.message.as_deref().unwrap_or(""),
                            "Run ended with an error"
                        );
                    } else {
                        info!(run_id, status = ?current.status, "Run finished");
                    }
                    return Ok(DispatchOutcome::Finished(current));
                }
            }
        }
    }

    /// Execute every call in order, one result per call
    ///
    /// Bad arguments and tool failures become error results. Unknown
    /// function names follow the configured [`UnknownFunctionPolicy`].
    pub async fn execute_tool_calls(&self, calls: &[ToolCall]) -> Result<Vec<ToolCallResult>> {
        if self.unknown_function == UnknownFunctionPolicy::FailFast {
            if let Some(call) = calls.iter().find(|c| !self.tools.contains(&c.function.name)) {
                error!(function = %call.function.name, "Unknown function requested, aborting batch");
                return Err(Error::UnknownFunction(call.function.name.clone()));
            }
        }

        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            let name = call.function.name.as_str();

            if !self.tools.contains(name) {
                warn!(function = name, "Unknown function requested");
                results.push(ToolCallResult::error(
                    call,
                    Error::UnknownFunction(name.to_string()).to_string(),
                ));
                continue;
            }

            let arguments = match parse_arguments(&call.function.arguments) {
                Ok(arguments) => arguments,
                Err(e) => {
                    warn!(function = name, error = %e, "Invalid function arguments");
                    results.push(ToolCallResult::error(
                        call,
                        format!("Invalid arguments for {}: {}", name, e),
                    ));
                    continue;
                }
            };

            let result = match self.tools.execute(name, arguments).await {
                Ok(result) => result,
                Err(e) => ToolResult::error(e.to_string()),
            };

            info!(
                function = name,
                arguments = %call.function.arguments,
                output = %result.output,
                is_error = result.is_error,
                "Called custom function"
            );
            results.push(ToolCallResult::from_tool_result(call, result));
        }

        Ok(results)
    }

    /// Messages of a thread in the order the service returns them
    pub async fn render_transcript(&self, thread: &Thread) -> Result<Vec<TranscriptLine>> {
        let messages = self.api.list_messages(&thread.id).await?;
        Ok(messages.iter().map(TranscriptLine::from_message).collect())
    }

    /// Print the transcript to stdout
    pub async fn display_transcript(&self, thread: &Thread) -> Result<()> {
        println!("Displaying conversation:");
        for line in self.render_transcript(thread).await? {
            println!("{}", line);
        }
        Ok(())
    }
}

/// Decode JSON-encoded call arguments; an empty string means no arguments
fn parse_arguments(raw: &str) -> serde_json::Result<JsonValue> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw)
}
