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

pub mod api;
pub mod auth;
pub mod config;
pub mod directory;
pub mod mcp;
pub mod proxy;
pub mod registry;

use anyhow::Result;
use axum::{middleware as axum_middleware, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use config::ServerConfig;
use directory::ServiceDirectory;
use mcp::McpServer;
use proxy::ApiCaller;
use registry::cache::SpecCache;
use registry::fetch::HttpSpecFetcher;
use registry::SpecRegistry;

/// Assemble the application state from configuration
pub fn build_state(config: &ServerConfig) -> Result<AppState> {
    let directory = ServiceDirectory::resolve(&config.registry);
    if directory.is_empty() {
        tracing::warn!("No services registered; the registry will serve empty results");
    } else {
        tracing::info!(services = directory.len(), "Service directory resolved");
    }

    let cache = SpecCache::new(Duration::from_secs(config.registry.spec_ttl_secs));
    let fetcher = Arc::new(HttpSpecFetcher::new(Duration::from_secs(
        config.registry.fetch_timeout_secs,
    ))?);
    let registry = Arc::new(SpecRegistry::new(directory, cache, fetcher));
    let caller = Arc::new(ApiCaller::new(Duration::from_secs(
        config.registry.call_timeout_secs,
    ))?);

    Ok(AppState {
        registry,
        caller,
        auth_token: config.auth.token.clone(),
    })
}

/// Build the full router (REST surface + MCP bridge) behind the auth gate
pub fn build_router(state: AppState) -> Result<Router> {
    let mcp = McpServer::new(Arc::clone(&state.registry), Arc::clone(&state.caller))?;
    let router = api::api_router()
        .with_state(state.clone())
        .merge(mcp.router())
        .layer(axum_middleware::from_fn_with_state(
            state,
            auth::auth_middleware,
        ));
    Ok(router)
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spechub_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SpecHub Server");
    config.validate()?;

    let state = build_state(&config)?;
    let mut app = build_router(state)?.layer(TraceLayer::new_for_http());

    if config.server.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr).await?;
    tracing::info!(addr = %config.server.listen_addr, "HTTP server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
