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

//! MCP Server Implementation
//!
//! Session-oriented HTTP surface of the protocol bridge. A POST without a
//! session id establishes one; the id comes back in the `Mcp-Session-Id`
//! response header and addresses every subsequent exchange. The SSE route
//! attaches a push channel to an existing session only.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::mcp::handlers::McpHandler;
use crate::mcp::protocol::*;
use crate::mcp::session::SessionTable;
use crate::mcp::tool::RegistrationError;
use crate::proxy::ApiCaller;
use crate::registry::SpecRegistry;

/// Header carrying the session id on requests and responses
pub const SESSION_HEADER: &str = "mcp-session-id";

/// MCP server state
#[derive(Clone)]
pub struct McpServerState {
    pub handler: Arc<McpHandler>,
    pub sessions: Arc<SessionTable>,
}

/// MCP Server
pub struct McpServer {
    state: McpServerState,
}

impl McpServer {
    /// Create a new MCP server over the registry and proxy caller
    pub fn new(
        registry: Arc<SpecRegistry>,
        caller: Arc<ApiCaller>,
    ) -> Result<Self, RegistrationError> {
        let handler = Arc::new(McpHandler::new(registry, caller)?);
        Ok(Self {
            state: McpServerState {
                handler,
                sessions: Arc::new(SessionTable::new()),
            },
        })
    }

    /// Get the Axum router for the MCP server
    pub fn router(&self) -> Router {
        Router::new()
            .route("/mcp", post(handle_mcp_request).delete(handle_mcp_close))
            .route("/mcp/sse", get(handle_mcp_sse))
            .route("/mcp/health", get(handle_mcp_health))
            .with_state(self.state.clone())
    }
}

fn session_not_found(id: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": format!("Unknown session: {id}")})),
    )
}

fn header_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Handle MCP health check (GET /mcp/health)
async fn handle_mcp_health(State(state): State<McpServerState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "protocol_version": MCP_PROTOCOL_VERSION,
        "server_name": "spechub-registry",
        "server_version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.len(),
    }))
}

/// Handle MCP JSON-RPC request over HTTP POST.
///
/// No session header: establish a session and return its id in the response
/// header. Known id: dispatch within that session. Unknown id: not found,
/// never implicit creation.
async fn handle_mcp_request(
    State(state): State<McpServerState>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    let session = match header_session_id(&headers) {
        Some(id) => match state.sessions.get(&id) {
            Some(session) => session,
            None => {
                warn!(session_id = %id, "Request for unknown MCP session");
                return session_not_found(&id).into_response();
            }
        },
        None => state.sessions.create(),
    };

    let response = state.handler.handle_request(request).await;
    // Mirror the response onto any SSE streams attached to this session
    if let Ok(frame) = serde_json::to_string(&response) {
        session.push(frame);
    }
    ([(SESSION_HEADER, session.id.clone())], Json(response)).into_response()
}

/// Handle explicit session teardown (DELETE /mcp)
async fn handle_mcp_close(
    State(state): State<McpServerState>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let Some(id) = header_session_id(&headers) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("Missing {SESSION_HEADER} header")})),
        ));
    };
    if !state.sessions.remove(&id) {
        return Err(session_not_found(&id));
    }
    Ok(Json(json!({"closed": id})))
}

#[derive(Debug, Deserialize)]
struct SseParams {
    session: Option<String>,
}

/// Attach a server-push SSE stream to an established session.
///
/// Attaching to an unknown id is a client error, not session creation.
async fn handle_mcp_sse(
    State(state): State<McpServerState>,
    Query(params): Query<SseParams>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<Value>)> {
    let Some(id) = params.session.or_else(|| header_session_id(&headers)) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing session id"})),
        ));
    };
    let Some(session) = state.sessions.get(&id) else {
        warn!(session_id = %id, "SSE attach to unknown MCP session");
        return Err(session_not_found(&id));
    };

    info!(session_id = %session.id, "MCP SSE stream attached");
    let receiver = session.subscribe();

    let init_event = Event::default().event("session").data(session.id.clone());
    let initial = stream::once(async move { Ok(init_event) });
    let pushes = BroadcastStream::new(receiver)
        .filter_map(|frame| async move { frame.ok().map(|f| Ok(Event::default().data(f))) });

    Ok(Sse::new(initial.chain(pushes))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(30))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::directory::ServiceDirectory;
    use crate::registry::cache::SpecCache;
    use crate::registry::fetch::{FetchError, SpecFetch};
    use async_trait::async_trait;
    use axum::http::HeaderValue;

    struct EmptyFetcher;

    #[async_trait]
    impl SpecFetch for EmptyFetcher {
        async fn fetch_spec(&self, _spec_url: &str) -> Result<Value, FetchError> {
            Ok(json!({"paths": {}}))
        }
    }

    fn server() -> McpServer {
        let directory =
            ServiceDirectory::resolve_from(&RegistryConfig::default(), std::iter::empty());
        let registry = Arc::new(SpecRegistry::new(
            directory,
            SpecCache::new(Duration::from_secs(300)),
            Arc::new(EmptyFetcher),
        ));
        let caller = Arc::new(ApiCaller::new(Duration::from_secs(1)).unwrap());
        McpServer::new(registry, caller).unwrap()
    }

    #[tokio::test]
    async fn test_session_responses_are_mirrored_to_attached_stream() {
        let server = server();
        let state = server.state.clone();
        let session = state.sessions.create();
        let mut rx = session.subscribe();

        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_str(&session.id).unwrap());
        let request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: "ping".to_string(),
            params: None,
            id: JsonRpcId::Number(7),
        };
        handle_mcp_request(State(state), headers, Json(request)).await;

        let frame = rx.recv().await.unwrap();
        let mirrored: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(mirrored["id"], 7);
        assert!(mirrored["result"].is_object());
    }
}
