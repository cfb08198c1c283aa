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

// Session lifecycle and tool dispatch tests for the MCP bridge.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use spechub_server::api::AppState;
use spechub_server::build_router;
use spechub_server::config::RegistryConfig;
use spechub_server::directory::ServiceDirectory;
use spechub_server::mcp::SESSION_HEADER;
use spechub_server::proxy::ApiCaller;
use spechub_server::registry::cache::SpecCache;
use spechub_server::registry::fetch::{FetchError, SpecFetch};
use spechub_server::registry::SpecRegistry;

struct CannedFetcher;

#[async_trait]
impl SpecFetch for CannedFetcher {
    async fn fetch_spec(&self, _spec_url: &str) -> Result<Value, FetchError> {
        Ok(json!({
            "info": {"title": "Ads API"},
            "paths": {"/v1/campaigns": {"get": {"summary": "List campaigns"}}}
        }))
    }
}

fn app() -> Router {
    let mut config = RegistryConfig::default();
    config
        .services
        .insert("ads".to_string(), "http://ads:8080".to_string());
    let directory = ServiceDirectory::resolve_from(&config, std::iter::empty());

    let state = AppState {
        registry: Arc::new(SpecRegistry::new(
            directory,
            SpecCache::new(Duration::from_secs(300)),
            Arc::new(CannedFetcher),
        )),
        caller: Arc::new(ApiCaller::new(Duration::from_secs(1)).unwrap()),
        auth_token: None,
    };
    build_router(state).unwrap()
}

fn rpc(method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params})
}

fn mcp_post(payload: &Value, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(id) = session {
        builder = builder.header(SESSION_HEADER, id);
    }
    builder
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn session_id(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(SESSION_HEADER)
        .expect("session header")
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_first_contact_establishes_session() {
    let app = app();
    let response = app
        .clone()
        .oneshot(mcp_post(&rpc("initialize", json!({})), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let id = session_id(&response);
    let body = body_json(response).await;
    assert_eq!(body["result"]["serverInfo"]["name"], "spechub-registry");

    // The id addresses subsequent calls
    let response = app
        .oneshot(mcp_post(&rpc("ping", json!({})), Some(&id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(session_id(&response), id);
}

#[tokio::test]
async fn test_two_fresh_contacts_get_distinct_ids() {
    let app = app();
    let first = app
        .clone()
        .oneshot(mcp_post(&rpc("ping", json!({})), None))
        .await
        .unwrap();
    let second = app
        .oneshot(mcp_post(&rpc("ping", json!({})), None))
        .await
        .unwrap();
    assert_ne!(session_id(&first), session_id(&second));
}

#[tokio::test]
async fn test_unknown_session_id_is_not_found() {
    let response = app()
        .oneshot(mcp_post(&rpc("ping", json!({})), Some("no-such-session")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("no-such-session"));
}

#[tokio::test]
async fn test_close_tears_session_down() {
    let app = app();
    let response = app
        .clone()
        .oneshot(mcp_post(&rpc("ping", json!({})), None))
        .await
        .unwrap();
    let id = session_id(&response);

    let close = Request::builder()
        .method("DELETE")
        .uri("/mcp")
        .header(SESSION_HEADER, &id)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(close).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The id no longer resolves
    let response = app
        .oneshot(mcp_post(&rpc("ping", json!({})), Some(&id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sse_attach_requires_existing_session() {
    let app = app();
    let request = Request::builder()
        .uri("/mcp/sse?session=not-real")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Attach to a real session succeeds
    let response = app
        .clone()
        .oneshot(mcp_post(&rpc("ping", json!({})), None))
        .await
        .unwrap();
    let id = session_id(&response);
    let request = Request::builder()
        .uri(format!("/mcp/sse?session={id}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
}

#[tokio::test]
async fn test_tools_call_round_trip() {
    let response = app()
        .oneshot(mcp_post(
            &rpc(
                "tools/call",
                json!({"name": "search_endpoints", "arguments": {"query": "campaign"}}),
            ),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    let payload: Value = serde_json::from_str(text).unwrap();
    assert_eq!(payload["count"], 1);
    assert_eq!(payload["matches"][0]["service"], "ads");
    assert_eq!(payload["matches"][0]["path"], "/v1/campaigns");
}

#[tokio::test]
async fn test_call_api_transport_failure_keeps_session_usable() {
    let app = app();
    let response = app
        .clone()
        .oneshot(mcp_post(
            &rpc(
                "tools/call",
                json!({
                    "name": "call_api",
                    // ads base URL is unroutable from tests; expect a structured error
                    "arguments": {"service": "ads", "method": "GET", "path": "/v1/campaigns"}
                }),
            ),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let id = session_id(&response);
    let body = body_json(response).await;
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    let payload: Value = serde_json::from_str(text).unwrap();
    assert!(payload["error"].is_string());

    // Session still answers after the failed proxy call
    let response = app
        .oneshot(mcp_post(&rpc("ping", json!({})), Some(&id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["error"].is_null());
}
