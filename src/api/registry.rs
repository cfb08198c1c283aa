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

//! Registry REST handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::api::{ApiError, AppState};
use crate::registry::ServiceSummary;

/// Fixed usage hint attached to the aggregate discovery document
pub const USAGE_HINT: &str =
    "Use call_api with service, method, path and an optional JSON body to invoke any endpoint listed here.";

#[derive(Debug, Serialize)]
pub struct ServiceListing {
    pub name: String,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "specUrl")]
    pub spec_url: String,
}

/// GET /services - directory entries with their well-known spec URLs
pub async fn list_services(State(state): State<AppState>) -> Json<Vec<ServiceListing>> {
    let listings = state
        .registry
        .directory()
        .iter()
        .map(|entry| ServiceListing {
            spec_url: entry.spec_url(),
            name: entry.name,
            base_url: entry.base_url,
        })
        .collect();
    Json(listings)
}

/// GET /openapi - aggregated summaries for every registered service
pub async fn get_aggregate(State(state): State<AppState>) -> Json<Vec<ServiceSummary>> {
    Json(state.registry.aggregate_all().await)
}

/// GET /openapi/:service - full cached spec document for one service
pub async fn get_service_spec(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let cached = state
        .registry
        .get_spec(&service)
        .await
        .ok_or_else(|| ApiError::ServiceNotFound {
            available: state.registry.directory().names(),
            service: service.clone(),
        })?;

    match &cached.document {
        Some(document) => Ok(Json(document.clone())),
        None => Ok(Json(json!({
            "service": service,
            "error": cached.error.clone().unwrap_or_else(|| "spec unavailable".to_string()),
        }))),
    }
}

/// GET /llm-context - compact discovery document for a constrained consumer
pub async fn get_llm_context(State(state): State<AppState>) -> Json<Value> {
    let services = state.registry.aggregate_all().await;
    Json(json!({
        "services": services,
        "usage": USAGE_HINT,
    }))
}

/// POST /refresh - drop every cached spec
pub async fn refresh_all(State(state): State<AppState>) -> Json<Value> {
    info!("Refreshing all cached specs");
    state.registry.invalidate_all();
    Json(json!({"refreshed": "all"}))
}

/// POST /refresh/:service - drop one cached spec
pub async fn refresh_service(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.registry.invalidate(&service) {
        return Err(ApiError::ServiceNotFound {
            available: state.registry.directory().names(),
            service,
        });
    }
    info!(service = %service, "Refreshed cached spec");
    Ok(Json(json!({"refreshed": service})))
}

/// GET /openapi.json - the registry's own spec document.
///
/// Serves the same well-known path contract the registry imposes on the
/// services it aggregates. Unauthenticated, like theirs.
pub async fn serve_own_spec(State(state): State<AppState>) -> Json<Value> {
    let paths = json!({
        "/health": {"get": {"summary": "Liveness probe"}},
        "/services": {"get": {"summary": "List registered services"}},
        "/openapi": {"get": {"summary": "Aggregated endpoint summaries for all services"}},
        "/openapi/{service}": {"get": {
            "summary": "Full cached spec document for one service",
            "parameters": [{"name": "service", "in": "path", "required": true, "schema": {"type": "string"}}]
        }},
        "/llm-context": {"get": {"summary": "Compact discovery document for agents"}},
        "/refresh": {"post": {"summary": "Invalidate every cached spec"}},
        "/refresh/{service}": {"post": {
            "summary": "Invalidate one cached spec",
            "parameters": [{"name": "service", "in": "path", "required": true, "schema": {"type": "string"}}]
        }},
    });

    Json(json!({
        "openapi": "3.0.3",
        "info": {
            "title": "SpecHub Registry",
            "description": format!("Aggregates specs for {} registered services", state.registry.directory().len()),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": paths,
    }))
}
