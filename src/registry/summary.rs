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

//! Endpoint summarizer
//!
//! Derives a flattened, agent-friendly endpoint list from an arbitrary
//! OpenAPI-shaped document. Pure and total: the document is traversed with
//! optional lookups only, so malformed or truncated specs degrade to empty
//! results instead of errors.

use serde::Serialize;
use serde_json::Value;

/// Recognized HTTP methods, in the fixed traversal order used everywhere
pub const METHODS: &[&str] = &["get", "post", "put", "patch", "delete"];

/// One non-header parameter of an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSummary {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
}

/// Compact representation of one (method, path) pair.
///
/// `parameters` and `body_fields` are omitted from serialized output when
/// empty to keep the discovery document small for a constrained consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSummary {
    pub method: String,
    pub path: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterSummary>,
    #[serde(rename = "bodyFields", skip_serializing_if = "Option::is_none")]
    pub body_fields: Option<Vec<String>>,
}

/// Result of summarizing one spec document
#[derive(Debug, Clone, Default, Serialize)]
pub struct SpecSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub endpoints: Vec<EndpointSummary>,
}

/// Derive the endpoint summary for a spec document
pub fn summarize(document: &Value) -> SpecSummary {
    let info = document.get("info");
    let title = info
        .and_then(|i| i.get("title"))
        .and_then(Value::as_str)
        .map(String::from);
    let description = info
        .and_then(|i| i.get("description"))
        .and_then(Value::as_str)
        .map(String::from);

    let mut endpoints = Vec::new();
    if let Some(paths) = document.get("paths").and_then(Value::as_object) {
        for (path, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            for method in METHODS {
                // Method keys are matched case-insensitively; anything else
                // under a path item (vendor extensions, "parameters") is
                // ignored here.
                let operation = item
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(method))
                    .map(|(_, op)| op);
                if let Some(operation) = operation {
                    endpoints.push(summarize_operation(method, path, operation));
                }
            }
        }
    }

    SpecSummary {
        title,
        description,
        endpoints,
    }
}

fn summarize_operation(method: &str, path: &str, operation: &Value) -> EndpointSummary {
    let summary = operation
        .get("summary")
        .and_then(Value::as_str)
        .or_else(|| operation.get("description").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    EndpointSummary {
        method: method.to_uppercase(),
        path: path.to_string(),
        summary,
        parameters: summarize_parameters(operation),
        body_fields: summarize_body_fields(operation),
    }
}

/// Retained parameters, header parameters excluded
fn summarize_parameters(operation: &Value) -> Vec<ParameterSummary> {
    let Some(params) = operation.get("parameters").and_then(Value::as_array) else {
        return Vec::new();
    };

    params
        .iter()
        .filter_map(|param| {
            let name = param.get("name").and_then(Value::as_str)?;
            let location = param
                .get("in")
                .and_then(Value::as_str)
                .unwrap_or("query");
            if location == "header" {
                return None;
            }
            let required = param
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let param_type = param
                .get("schema")
                .and_then(|s| s.get("type"))
                .or_else(|| param.get("type"))
                .and_then(Value::as_str)
                .map(String::from);
            Some(ParameterSummary {
                name: name.to_string(),
                location: location.to_string(),
                required,
                param_type,
            })
        })
        .collect()
}

/// Top-level property names of the JSON request-body schema, declared order
fn summarize_body_fields(operation: &Value) -> Option<Vec<String>> {
    let properties = operation
        .get("requestBody")?
        .get("content")?
        .get("application/json")?
        .get("schema")?
        .get("properties")?
        .as_object()?;
    if properties.is_empty() {
        return None;
    }
    Some(properties.keys().cloned().collect())
}
