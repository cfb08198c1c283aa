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

//! MCP Request Handlers
//!
//! Handles JSON-RPC 2.0 requests for the MCP protocol.

use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::mcp::protocol::*;
use crate::mcp::tool::{RegistrationError, ToolError, ToolRegistry};
use crate::mcp::tools::register_all;
use crate::proxy::ApiCaller;
use crate::registry::SpecRegistry;

/// MCP request handler with the registered tool surface
pub struct McpHandler {
    tools: ToolRegistry,
}

impl McpHandler {
    /// Create a handler with every registry tool registered
    pub fn new(
        registry: Arc<SpecRegistry>,
        caller: Arc<ApiCaller>,
    ) -> Result<Self, RegistrationError> {
        let tools = ToolRegistry::new();
        register_all(&tools, registry, caller)?;
        Ok(Self { tools })
    }

    /// Handle a JSON-RPC request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        info!(method = %request.method, "MCP request received");

        match request.method.as_str() {
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "initialize" => self.handle_initialize(request.id),
            "initialized" | "notifications/initialized" => {
                JsonRpcResponse::success(request.id, json!({}))
            }
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            _ => {
                warn!(method = %request.method, "Unknown MCP method");
                JsonRpcResponse::error(request.id, JsonRpcError::method_not_found(&request.method))
            }
        }
    }

    fn handle_initialize(&self, id: JsonRpcId) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: "spechub-registry".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
        }
    }

    fn handle_tools_list(&self, id: JsonRpcId) -> JsonRpcResponse {
        let result = ListToolsResult {
            tools: self.tools.list(),
        };
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
        }
    }

    async fn handle_tools_call(
        &self,
        id: JsonRpcId,
        params: Option<serde_json::Value>,
    ) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(format!("Invalid tools/call params: {e}")),
                    )
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("Missing tools/call params"),
                )
            }
        };

        let arguments = serde_json::Value::Object(params.arguments.into_iter().collect());
        match self.tools.execute(&params.name, arguments).await {
            Ok(value) => {
                let result = CallToolResult::json(&value);
                match serde_json::to_value(result) {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(e) => {
                        JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string()))
                    }
                }
            }
            Err(ToolError::NotFound(name)) => JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params(format!("Unknown tool: {name}")),
            ),
            Err(ToolError::InvalidParams(message)) => {
                JsonRpcResponse::error(id, JsonRpcError::invalid_params(message))
            }
            Err(ToolError::Execution(message)) => {
                // Execution problems come back in-band so the session survives
                let result = CallToolResult {
                    content: vec![ToolContent::Text { text: message }],
                    is_error: Some(true),
                };
                match serde_json::to_value(result) {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(e) => {
                        JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string()))
                    }
                }
            }
        }
    }
}
