//! Run dispatcher
//!
//! Drives one conversation thread: posts messages, starts runs, polls them
//! and routes requested function calls to the [`ToolManager`](crate::ToolManager).

mod engine;
mod instructions;
mod policy;
mod transcript;

pub use engine::{DispatchOutcome, Dispatcher, ToolCallResult};
pub use instructions::run_instructions;
pub use policy::{DispatchMode, PollPolicy, UnknownFunctionPolicy};
pub use transcript::TranscriptLine;
