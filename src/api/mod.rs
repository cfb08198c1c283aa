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

//! REST surface of the registry.

pub mod health;
pub mod registry;

pub use health::health_check;
pub use registry::{
    get_aggregate, get_llm_context, get_service_spec, list_services, refresh_all, refresh_service,
    serve_own_spec,
};

use crate::proxy::ApiCaller;
use crate::registry::SpecRegistry;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// Shared application state, injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SpecRegistry>,
    pub caller: Arc<ApiCaller>,
    pub auth_token: Option<String>,
}

/// API-level errors with structured JSON responses
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Unknown service: {service}")]
    ServiceNotFound {
        service: String,
        available: Vec<String>,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({"error": "Unauthorized"}),
            ),
            ApiError::ServiceNotFound { service, available } => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": format!("Unknown service: {service}"),
                    "availableServices": available,
                }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// REST routes, each mapping to one registry operation
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/openapi.json", get(serve_own_spec))
        .route("/services", get(list_services))
        .route("/openapi", get(get_aggregate))
        .route("/openapi/:service", get(get_service_spec))
        .route("/llm-context", get(get_llm_context))
        .route("/refresh", post(refresh_all))
        .route("/refresh/:service", post(refresh_service))
}
