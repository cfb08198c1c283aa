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

//! Generic outbound-call primitive.
//!
//! Forwards an HTTP request to a registered service on a caller's behalf.
//! The call never raises: transport failures come back as a structured
//! `error` outcome so one bad upstream cannot break the caller's session.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Methods that carry a JSON-encoded request body
const BODY_METHODS: &[Method] = &[Method::POST, Method::PUT, Method::PATCH];

/// Outcome of a proxied call. Either the upstream response or a transport
/// error, never a panic or propagated failure.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CallOutcome {
    Completed {
        status: u16,
        ok: bool,
        data: Value,
    },
    Failed {
        error: String,
    },
}

/// Proxy caller with its own (longer) timeout, separate from spec fetching
pub struct ApiCaller {
    client: reqwest::Client,
}

impl ApiCaller {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Issue `method` to `{base_url}{path}`.
    ///
    /// A `Content-Type: application/json` header is applied by default;
    /// caller-supplied headers may override or extend it. `body` is sent only
    /// for POST/PUT/PATCH.
    pub async fn call(
        &self,
        base_url: &str,
        method: &str,
        path: &str,
        body: Option<&Value>,
        headers: &HashMap<String, String>,
    ) -> CallOutcome {
        let method = match Method::from_bytes(method.to_uppercase().as_bytes()) {
            Ok(m) => m,
            Err(_) => {
                return CallOutcome::Failed {
                    error: format!("Unsupported HTTP method: {method}"),
                }
            }
        };

        let url = format!("{base_url}{path}");
        debug!(%method, %url, "Proxying API call");

        // insert (not append) so caller headers replace the default
        let mut header_map = HeaderMap::new();
        header_map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in headers {
            let name = match HeaderName::from_bytes(name.as_bytes()) {
                Ok(n) => n,
                Err(_) => {
                    return CallOutcome::Failed {
                        error: format!("Invalid header name: {name}"),
                    }
                }
            };
            let value = match HeaderValue::from_str(value) {
                Ok(v) => v,
                Err(_) => {
                    return CallOutcome::Failed {
                        error: format!("Invalid value for header {name}"),
                    }
                }
            };
            header_map.insert(name, value);
        }

        let mut request = self.client.request(method.clone(), &url).headers(header_map);
        if let Some(body) = body {
            if BODY_METHODS.contains(&method) {
                request = request.json(body);
            }
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                return CallOutcome::Failed {
                    error: format!("Request to {url} failed: {e}"),
                }
            }
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        // JSON when possible, raw text otherwise
        let data = serde_json::from_str(&text).unwrap_or(Value::String(text));

        CallOutcome::Completed {
            status: status.as_u16(),
            ok: status.is_success(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Accept one connection, capture the raw request head, answer 200
    async fn capture_one_request(listener: tokio::net::TcpListener) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut captured = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            captured.extend_from_slice(&buf[..n]);
            if n == 0 || captured.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\ncontent-type: application/json\r\n\r\n{}")
            .await
            .unwrap();
        String::from_utf8_lossy(&captured).to_string()
    }

    fn header_values(request: &str, name: &str) -> Vec<String> {
        request
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once(':')?;
                if key.eq_ignore_ascii_case(name) {
                    Some(value.trim().to_string())
                } else {
                    None
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn test_caller_header_replaces_default_content_type() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let capture = tokio::spawn(capture_one_request(listener));

        let caller = ApiCaller::new(Duration::from_secs(2)).unwrap();
        let headers = HashMap::from([("Content-Type".to_string(), "text/plain".to_string())]);
        let outcome = caller
            .call(&format!("http://{addr}"), "GET", "/v1/ping", None, &headers)
            .await;
        match outcome {
            CallOutcome::Completed { status, .. } => assert_eq!(status, 200),
            CallOutcome::Failed { error } => panic!("call failed: {error}"),
        }

        // Exactly one Content-Type reaches the upstream: the caller's
        let request = capture.await.unwrap();
        assert_eq!(
            header_values(&request, "content-type"),
            vec!["text/plain".to_string()]
        );
    }

    #[tokio::test]
    async fn test_default_content_type_applies_without_override() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let capture = tokio::spawn(capture_one_request(listener));

        let caller = ApiCaller::new(Duration::from_secs(2)).unwrap();
        caller
            .call(&format!("http://{addr}"), "GET", "/v1/ping", None, &HashMap::new())
            .await;

        let request = capture.await.unwrap();
        assert_eq!(
            header_values(&request, "content-type"),
            vec!["application/json".to_string()]
        );
    }

    #[tokio::test]
    async fn test_invalid_caller_header_is_structured_failure() {
        let caller = ApiCaller::new(Duration::from_secs(1)).unwrap();
        let headers = HashMap::from([("bad name".to_string(), "x".to_string())]);
        let outcome = caller
            .call("http://192.0.2.1:9", "GET", "/x", None, &headers)
            .await;
        match outcome {
            CallOutcome::Failed { error } => assert!(error.contains("header name")),
            CallOutcome::Completed { .. } => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_returns_error_outcome() {
        let caller = ApiCaller::new(Duration::from_millis(200)).unwrap();
        // Reserved TEST-NET-1 address: connection cannot succeed
        let outcome = caller
            .call(
                "http://192.0.2.1:9",
                "GET",
                "/v1/ping",
                None,
                &HashMap::new(),
            )
            .await;
        match outcome {
            CallOutcome::Failed { error } => assert!(error.contains("/v1/ping")),
            CallOutcome::Completed { .. } => panic!("expected transport failure"),
        }
    }

    #[tokio::test]
    async fn test_invalid_method_rejected_without_request() {
        let caller = ApiCaller::new(Duration::from_secs(1)).unwrap();
        let outcome = caller
            .call(
                "http://192.0.2.1:9",
                "NOT A METHOD",
                "/x",
                Some(&json!({})),
                &HashMap::new(),
            )
            .await;
        match outcome {
            CallOutcome::Failed { error } => assert!(error.contains("Unsupported")),
            CallOutcome::Completed { .. } => panic!("expected failure"),
        }
    }
}
