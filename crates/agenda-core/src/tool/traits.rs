//! Tool trait definition

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::Result;

/// Tool execution result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    /// Output string handed back to the assistant or the caller
    pub output: String,
    /// Whether the execution resulted in an error
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: true,
        }
    }
}

/// A locally implemented function the assistant can call
#[async_trait]
pub trait Tool: Send + Sync {
    /// Function name advertised to the assistant
    fn name(&self) -> &str;

    /// Function description advertised to the assistant
    fn description(&self) -> &str;

    /// JSON schema of the function parameters
    fn input_schema(&self) -> JsonValue;

    /// Execute the function with already-decoded JSON arguments
    ///
    /// `Err` is reserved for malformed input; remote failures should be
    /// reported as [`ToolResult::error`] so they reach the assistant.
    async fn execute(&self, input: JsonValue) -> Result<ToolResult>;
}
