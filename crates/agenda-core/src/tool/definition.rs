//! Function definitions advertised to the assistant

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Tool entry in the assistant's tool list
///
/// Serialises as `{"type": "function", "function": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    /// Present for function tools; absent for built-in tools such as code_interpreter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionDefinition>,
}

/// Function name, description and parameter schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: JsonValue,
}

impl ToolDefinition {
    /// Create a function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: JsonValue,
    ) -> Self {
        Self {
            kind: "function".to_string(),
            function: Some(FunctionDefinition {
                name: name.into(),
                description: Some(description.into()),
                parameters,
            }),
        }
    }

    /// Function name, if this is a function tool
    pub fn function_name(&self) -> Option<&str> {
        self.function.as_ref().map(|f| f.name.as_str())
    }
}
