//! Tool manager for registering and executing tools

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::tool::{Tool, ToolDefinition, ToolResult};
use crate::{Error, Result};

/// Registry of locally implemented functions, keyed by function name
pub struct ToolManager {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolManager {
    /// Create a new empty tool manager
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool
    ///
    /// If a tool with the same name already exists, it will be replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Definitions of all registered tools, ordered by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition::function(t.name(), t.description(), t.input_schema()))
            .collect()
    }

    /// Execute a tool by name
    ///
    /// # Errors
    /// Returns [`Error::UnknownFunction`] if no tool has that name, or the
    /// tool's own error if the input is rejected.
    pub async fn execute(&self, name: &str, input: JsonValue) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))?;
        tool.execute(input).await
    }

    /// Check if a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if no tools are registered
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get all registered tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Check the registry against a declared function contract
    ///
    /// Every declared function must be registered with an identical
    /// parameter schema, and nothing undeclared may be registered.
    pub fn validate_against(&self, declared: &[ToolDefinition]) -> Result<()> {
        let declared_names: BTreeSet<&str> =
            declared.iter().filter_map(|d| d.function_name()).collect();
        self.validate_names(&declared_names)?;

        for def in declared {
            let Some(function) = &def.function else { continue };
            // names were validated above
            let Some(tool) = self.tools.get(&function.name) else { continue };
            if tool.input_schema() != function.parameters {
                return Err(Error::SchemaMismatch(format!(
                    "parameters of '{}' differ from the declared schema",
                    function.name
                )));
            }
        }

        Ok(())
    }

    /// Check that the registered function names are exactly `names`
    pub fn validate_names(&self, names: &BTreeSet<&str>) -> Result<()> {
        let registered: BTreeSet<&str> = self.tools.keys().map(|s| s.as_str()).collect();

        let missing: Vec<&str> = names.difference(&registered).copied().collect();
        let extra: Vec<&str> = registered.difference(names).copied().collect();

        if missing.is_empty() && extra.is_empty() {
            return Ok(());
        }

        Err(Error::SchemaMismatch(format!(
            "not implemented: {:?}, not advertised: {:?}",
            missing, extra
        )))
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}
