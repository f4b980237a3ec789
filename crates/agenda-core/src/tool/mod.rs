//! Tool system for assistant function calls
//!
//! Functions the assistant may request are registered here as [`Tool`]s
//! and resolved by name when a run requires action.

pub mod definition;
pub mod manager;
pub mod traits;

pub use definition::{FunctionDefinition, ToolDefinition};
pub use manager::ToolManager;
pub use traits::{Tool, ToolResult};
