// Copyright 2025 SpecHub (https://github.com/spechub)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! MCP tool registry with JSON schema validation.

use async_trait::async_trait;
use dashmap::DashMap;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::mcp::protocol::Tool;

/// Trait for MCP tools.
#[async_trait]
pub trait McpTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;

    async fn execute(&self, params: Value) -> Result<Value, ToolError>;
}

/// Registry for MCP tools.
pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn McpTool>>,
    validators: DashMap<String, JSONSchema>,
    order: parking_lot::Mutex<Vec<String>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
            validators: DashMap::new(),
            order: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn register(&self, tool: Arc<dyn McpTool>) -> Result<(), RegistrationError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistrationError::DuplicateName(name));
        }

        let schema = tool.input_schema();
        let validator = JSONSchema::options()
            .compile(&schema)
            .map_err(|e| RegistrationError::Schema(e.to_string()))?;
        self.validators.insert(name.clone(), validator);
        self.tools.insert(name.clone(), tool);
        self.order.lock().push(name);
        Ok(())
    }

    /// Tool descriptors in registration order
    pub fn list(&self) -> Vec<Tool> {
        let order = self.order.lock();
        order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|entry| {
                let tool = entry.value();
                Tool {
                    name: tool.name().to_string(),
                    description: Some(tool.description().to_string()),
                    input_schema: tool.input_schema(),
                }
            })
            .collect()
    }

    pub async fn execute(&self, name: &str, params: Value) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?
            .value()
            .clone();
        let validation = {
            let validator = self
                .validators
                .get(name)
                .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
            validator.validate(&params).err().map(|errors| {
                errors.map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
            })
        };
        if let Some(message) = validation {
            return Err(ToolError::InvalidParams(message));
        }

        tool.execute(params).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),
    #[error("Invalid tool params: {0}")]
    InvalidParams(String),
    #[error("Execution error: {0}")]
    Execution(String),
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Duplicate tool name: {0}")]
    DuplicateName(String),
    #[error("Invalid schema: {0}")]
    Schema(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl McpTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn input_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"message": {"type": "string"}},
                "required": ["message"],
            })
        }

        async fn execute(&self, params: Value) -> Result<Value, ToolError> {
            Ok(json!({"echo": params["message"]}))
        }
    }

    #[tokio::test]
    async fn test_register_and_execute() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();

        let result = registry
            .execute("echo", json!({"message": "hi"}))
            .await
            .unwrap();
        assert_eq!(result, json!({"echo": "hi"}));
    }

    #[tokio::test]
    async fn test_schema_validation_rejects_bad_params() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();

        let err = registry.execute("echo", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.execute("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        assert!(matches!(
            registry.register(Arc::new(EchoTool)),
            Err(RegistrationError::DuplicateName(_))
        ));
    }
}
