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

//! Shared-secret auth gate.
//!
//! A predicate over inbound request credentials. The health-check path and
//! the registry's own spec path stay open; everything else requires the
//! configured token via `X-Registry-Token` or `Authorization: Bearer`.
//! Without a configured token the gate is disabled entirely.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::api::{ApiError, AppState};

/// Dedicated credential header
pub const TOKEN_HEADER: &str = "x-registry-token";

/// Paths reachable without credentials
const OPEN_PATHS: &[&str] = &["/health", "/openapi.json"];

/// Pure gate predicate: allow or reject a (path, headers) pair
pub fn allow(token: Option<&str>, path: &str, headers: &HeaderMap) -> bool {
    let Some(expected) = token else {
        return true;
    };
    if OPEN_PATHS.contains(&path) {
        return true;
    }

    if let Some(value) = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        if value == expected {
            return true;
        }
    }
    if let Some(value) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(bearer) = value.strip_prefix("Bearer ") {
            if bearer == expected {
                return true;
            }
        }
    }
    false
}

/// Axum middleware wrapping the gate predicate
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_string();
    if !allow(state.auth_token.as_deref(), &path, request.headers()) {
        warn!(%path, "Rejected unauthenticated request");
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_disabled_without_configured_token() {
        assert!(allow(None, "/services", &headers(&[])));
    }

    #[test]
    fn test_open_paths_bypass_gate() {
        assert!(allow(Some("s"), "/health", &headers(&[])));
        assert!(allow(Some("s"), "/openapi.json", &headers(&[])));
        assert!(!allow(Some("s"), "/services", &headers(&[])));
    }

    #[test]
    fn test_token_header_and_bearer_accepted() {
        assert!(allow(
            Some("s3cret"),
            "/services",
            &headers(&[("x-registry-token", "s3cret")])
        ));
        assert!(allow(
            Some("s3cret"),
            "/services",
            &headers(&[("authorization", "Bearer s3cret")])
        ));
        assert!(!allow(
            Some("s3cret"),
            "/services",
            &headers(&[("authorization", "Bearer wrong")])
        ));
    }
}
