//! Tool system exposed to the language model
//!
//! Tools describe themselves with a JSON Schema; parameters coming back from
//! the model are validated against that schema before a tool runs.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

pub mod playstore;

pub use playstore::PlayStoreRatingTool;

/// Capability the model can call during generation
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and JSON Schema of the accepted parameters
    fn describe(&self) -> ToolDescription;

    /// One-time setup, called when the tool is registered
    async fn initialize(&mut self, _config: Option<&Value>) -> Result<(), ToolError> {
        Ok(())
    }

    /// Run the tool; `parameters` has already passed schema validation
    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Registry of tools available to one agent
pub struct ToolSystem {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolSystem {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Initialize and add a tool under the name it describes itself with
    pub async fn register(
        &mut self,
        mut tool: Box<dyn Tool>,
        config: Option<&Value>,
    ) -> Result<(), ToolError> {
        tool.initialize(config).await?;
        let name = tool.describe().name;
        if self.tools.contains_key(&name) {
            return Err(ToolError::InitializationError(format!(
                "tool '{name}' is already registered"
            )));
        }
        debug!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn describe_tool(&self, tool_name: &str) -> Option<ToolDescription> {
        self.tools.get(tool_name).map(|tool| tool.describe())
    }

    /// Descriptions of every registered tool, ordered by name
    pub fn descriptions(&self) -> Vec<ToolDescription> {
        self.tools.values().map(|tool| tool.describe()).collect()
    }

    /// Validate parameters against the tool schema, then execute
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: &Value,
    ) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;

        Self::validate_parameters(&tool.describe(), parameters)?;
        tool.execute(parameters).await
    }

    fn validate_parameters(description: &ToolDescription, parameters: &Value) -> Result<(), ToolError> {
        let validator = jsonschema::validator_for(&description.parameters)
            .map_err(|e| ToolError::SchemaError(format!("Schema compilation error: {e}")))?;

        validator.validate(parameters).map_err(|errors| {
            let error_messages: Vec<String> = errors
                .map(|e| format!("At '{}': {}", e.instance_path, e))
                .collect();
            ToolError::ValidationError(error_messages.join("; "))
        })
    }

    pub fn list_tools(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Tool initialization failed: {0}")]
    InitializationError(String),
    #[error("Parameter validation failed: {0}")]
    ValidationError(String),
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn describe(&self) -> ToolDescription {
            ToolDescription {
                name: "echo".to_string(),
                description: "Echo the input".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                }),
            }
        }

        async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
            Ok(parameters["text"].clone())
        }
    }

    #[tokio::test]
    async fn test_tool_system_creation() {
        let tool_system = ToolSystem::new();
        assert!(tool_system.is_empty());
        assert!(tool_system.descriptions().is_empty());
    }

    #[tokio::test]
    async fn test_register_and_execute() {
        let mut tool_system = ToolSystem::new();
        tool_system.register(Box::new(EchoTool), None).await.unwrap();

        assert_eq!(tool_system.list_tools(), vec!["echo".to_string()]);
        let result = tool_system
            .execute_tool("echo", &json!({"text": "hi"}))
            .await
            .unwrap();
        assert_eq!(result, json!("hi"));
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let mut tool_system = ToolSystem::new();
        tool_system.register(Box::new(EchoTool), None).await.unwrap();
        let result = tool_system.register(Box::new(EchoTool), None).await;
        assert!(matches!(result, Err(ToolError::InitializationError(_))));
    }

    #[tokio::test]
    async fn test_invalid_parameters_rejected() {
        let mut tool_system = ToolSystem::new();
        tool_system.register(Box::new(EchoTool), None).await.unwrap();

        let result = tool_system.execute_tool("echo", &json!({"text": 5})).await;
        assert!(matches!(result, Err(ToolError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_tool_execution_unknown_tool() {
        let tool_system = ToolSystem::new();
        let result = tool_system.execute_tool("unknown", &json!({})).await;
        assert!(matches!(result, Err(ToolError::UnknownTool(_))));
    }
}
