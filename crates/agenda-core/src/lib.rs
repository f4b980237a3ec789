//! agenda-core: core library for the agenda assistant gateway
//!
//! Provides the assistant (thread/run) API client, the tool registry,
//! the run dispatcher, key-value persistence and configuration.

pub mod assistant;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod store;
pub mod tool;

pub use assistant::{AssistantApi, AssistantClient, Run, RunStatus, Thread, ToolCall, ToolOutput};
pub use config::{AssistantConfig, CalendarConfig, Config, DispatchConfig, PollingConfig, StoreBackend};
pub use dispatcher::{
    DispatchMode, DispatchOutcome, Dispatcher, PollPolicy, ToolCallResult, TranscriptLine,
    UnknownFunctionPolicy,
};
pub use error::{Error, Result};
pub use store::{JsonFileStore, KeyValueStore, MemoryKeyValueStore, SqliteStore, TextFileStore};
pub use tool::{Tool, ToolDefinition, ToolManager, ToolResult};
