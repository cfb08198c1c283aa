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

//! The registry's tool surface.
//!
//! Five tools over the aggregation engine. Expected conditions (unknown
//! service, upstream fetch failure, proxied-call transport failure) come back
//! as structured result payloads, not tool errors, so an agent can read and
//! recover from them.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::registry::USAGE_HINT;
use crate::mcp::tool::{McpTool, RegistrationError, ToolError, ToolRegistry};
use crate::proxy::ApiCaller;
use crate::registry::SpecRegistry;

/// Register the full tool surface
pub fn register_all(
    tools: &ToolRegistry,
    registry: Arc<SpecRegistry>,
    caller: Arc<ApiCaller>,
) -> Result<(), RegistrationError> {
    tools.register(Arc::new(ListServicesTool {
        registry: Arc::clone(&registry),
    }))?;
    tools.register(Arc::new(GetServiceSpecTool {
        registry: Arc::clone(&registry),
    }))?;
    tools.register(Arc::new(GetAllEndpointsTool {
        registry: Arc::clone(&registry),
    }))?;
    tools.register(Arc::new(SearchEndpointsTool {
        registry: Arc::clone(&registry),
    }))?;
    tools.register(Arc::new(CallApiTool { registry, caller }))?;
    Ok(())
}

fn not_found_payload(registry: &SpecRegistry, service: &str) -> Value {
    json!({
        "error": format!("Unknown service: {service}"),
        "availableServices": registry.directory().names(),
    })
}

fn required_str(params: &Value, field: &str) -> Result<String, ToolError> {
    params
        .get(field)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| ToolError::InvalidParams(format!("Missing required field: {field}")))
}

/// `list_services` - directory entries plus their spec URLs
pub struct ListServicesTool {
    registry: Arc<SpecRegistry>,
}

#[async_trait]
impl McpTool for ListServicesTool {
    fn name(&self) -> &str {
        "list_services"
    }

    fn description(&self) -> &str {
        "List every registered service with its base URL and openapi.json location"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _params: Value) -> Result<Value, ToolError> {
        let services: Vec<Value> = self
            .registry
            .directory()
            .iter()
            .map(|entry| {
                json!({
                    "name": entry.name,
                    "baseUrl": entry.base_url,
                    "specUrl": entry.spec_url(),
                })
            })
            .collect();
        Ok(json!({"services": services}))
    }
}

/// `get_service_spec` - full cached spec document for one service
pub struct GetServiceSpecTool {
    registry: Arc<SpecRegistry>,
}

#[async_trait]
impl McpTool for GetServiceSpecTool {
    fn name(&self) -> &str {
        "get_service_spec"
    }

    fn description(&self) -> &str {
        "Fetch the full OpenAPI document for one registered service"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "service": {"type": "string", "description": "Registered service name"}
            },
            "required": ["service"],
        })
    }

    async fn execute(&self, params: Value) -> Result<Value, ToolError> {
        let service = required_str(&params, "service")?;
        let Some(cached) = self.registry.get_spec(&service).await else {
            return Ok(not_found_payload(&self.registry, &service));
        };
        match &cached.document {
            Some(document) => Ok(document.clone()),
            None => Ok(json!({
                "service": service,
                "error": cached.error.clone().unwrap_or_else(|| "spec unavailable".to_string()),
            })),
        }
    }
}

/// `get_all_endpoints` - the aggregate discovery document
pub struct GetAllEndpointsTool {
    registry: Arc<SpecRegistry>,
}

#[async_trait]
impl McpTool for GetAllEndpointsTool {
    fn name(&self) -> &str {
        "get_all_endpoints"
    }

    fn description(&self) -> &str {
        "Summarize every endpoint of every registered service in one compact document"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _params: Value) -> Result<Value, ToolError> {
        let services = self.registry.aggregate_all().await;
        let services = serde_json::to_value(services)
            .map_err(|e| ToolError::Execution(e.to_string()))?;
        Ok(json!({
            "services": services,
            "usage": USAGE_HINT,
        }))
    }
}

/// `search_endpoints` - keyword search across all services
pub struct SearchEndpointsTool {
    registry: Arc<SpecRegistry>,
}

#[async_trait]
impl McpTool for SearchEndpointsTool {
    fn name(&self) -> &str {
        "search_endpoints"
    }

    fn description(&self) -> &str {
        "Search endpoint paths, summaries and body fields across all services by keyword"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Case-insensitive keyword"}
            },
            "required": ["query"],
        })
    }

    async fn execute(&self, params: Value) -> Result<Value, ToolError> {
        let query = required_str(&params, "query")?;
        let matches = self.registry.search(&query).await;
        let count = matches.len();
        let matches =
            serde_json::to_value(matches).map_err(|e| ToolError::Execution(e.to_string()))?;
        Ok(json!({
            "query": query,
            "count": count,
            "matches": matches,
        }))
    }
}

/// `call_api` - generic outbound call to a registered service.
///
/// Transport failures surface as an `error` field in the result, never as a
/// tool error, so the session stays usable for subsequent calls.
pub struct CallApiTool {
    pub(crate) registry: Arc<SpecRegistry>,
    pub(crate) caller: Arc<ApiCaller>,
}

#[async_trait]
impl McpTool for CallApiTool {
    fn name(&self) -> &str {
        "call_api"
    }

    fn description(&self) -> &str {
        "Invoke an HTTP endpoint of a registered service; body is JSON-encoded for POST/PUT/PATCH"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "service": {"type": "string", "description": "Registered service name"},
                "method": {"type": "string", "description": "HTTP method, e.g. GET or POST"},
                "path": {"type": "string", "description": "Endpoint path starting with /"},
                "body": {"description": "JSON request body for POST/PUT/PATCH"},
                "headers": {
                    "type": "object",
                    "additionalProperties": {"type": "string"},
                    "description": "Extra headers; Content-Type defaults to application/json"
                }
            },
            "required": ["service", "method", "path"],
        })
    }

    async fn execute(&self, params: Value) -> Result<Value, ToolError> {
        let service = required_str(&params, "service")?;
        let method = required_str(&params, "method")?;
        let path = required_str(&params, "path")?;

        let Some(base_url) = self
            .registry
            .directory()
            .base_url(&service)
            .map(String::from)
        else {
            return Ok(not_found_payload(&self.registry, &service));
        };

        let body = params.get("body");
        let headers: HashMap<String, String> = params
            .get("headers")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        let outcome = self
            .caller
            .call(&base_url, &method, &path, body, &headers)
            .await;
        serde_json::to_value(outcome).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::directory::ServiceDirectory;
    use crate::registry::cache::SpecCache;
    use crate::registry::fetch::{FetchError, SpecFetch};
    use std::time::Duration;

    struct StaticFetcher(Value);

    #[async_trait]
    impl SpecFetch for StaticFetcher {
        async fn fetch_spec(&self, _spec_url: &str) -> Result<Value, FetchError> {
            Ok(self.0.clone())
        }
    }

    fn test_registry() -> Arc<SpecRegistry> {
        let mut config = RegistryConfig::default();
        config
            .services
            .insert("ads".to_string(), "http://ads:8080".to_string());
        let directory = ServiceDirectory::resolve_from(&config, std::iter::empty());
        Arc::new(SpecRegistry::new(
            directory,
            SpecCache::new(Duration::from_secs(300)),
            Arc::new(StaticFetcher(json!({
                "info": {"title": "Ads"},
                "paths": {"/v1/campaigns": {"get": {"summary": "List campaigns"}}}
            }))),
        ))
    }

    #[tokio::test]
    async fn test_list_services_tool() {
        let tool = ListServicesTool {
            registry: test_registry(),
        };
        let result = tool.execute(json!({})).await.unwrap();
        assert_eq!(result["services"][0]["name"], "ads");
        assert_eq!(
            result["services"][0]["specUrl"],
            "http://ads:8080/openapi.json"
        );
    }

    #[tokio::test]
    async fn test_get_service_spec_unknown_lists_available() {
        let tool = GetServiceSpecTool {
            registry: test_registry(),
        };
        let result = tool.execute(json!({"service": "nope"})).await.unwrap();
        assert!(result["error"].as_str().unwrap().contains("nope"));
        assert_eq!(result["availableServices"][0], "ads");
    }

    #[tokio::test]
    async fn test_search_endpoints_reports_count() {
        let tool = SearchEndpointsTool {
            registry: test_registry(),
        };
        let result = tool.execute(json!({"query": "campaign"})).await.unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["query"], "campaign");
        assert_eq!(result["matches"][0]["path"], "/v1/campaigns");
    }

    #[tokio::test]
    async fn test_get_all_endpoints_carries_usage_hint() {
        let tool = GetAllEndpointsTool {
            registry: test_registry(),
        };
        let result = tool.execute(json!({})).await.unwrap();
        assert_eq!(result["usage"], USAGE_HINT);
        assert_eq!(result["services"][0]["service"], "ads");
    }

    #[tokio::test]
    async fn test_call_api_unknown_service_is_structured() {
        let tool = CallApiTool {
            registry: test_registry(),
            caller: Arc::new(ApiCaller::new(Duration::from_millis(100)).unwrap()),
        };
        let result = tool
            .execute(json!({"service": "nope", "method": "GET", "path": "/x"}))
            .await
            .unwrap();
        assert!(result["error"].as_str().unwrap().contains("nope"));
    }
}
