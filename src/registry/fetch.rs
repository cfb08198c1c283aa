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

//! Spec fetcher
//!
//! Retrieves a service's spec document from its well-known location. Failures
//! are typed and returned, never thrown across the registry boundary. The
//! trait seam exists so the cache and facade can be tested with a double.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Typed spec-fetch failure
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("Invalid JSON from {url}: {message}")]
    Json { url: String, message: String },
}

/// Fetches one spec document from a fully formed spec URL
#[async_trait]
pub trait SpecFetch: Send + Sync {
    async fn fetch_spec(&self, spec_url: &str) -> Result<Value, FetchError>;
}

/// Production fetcher backed by a shared reqwest client
pub struct HttpSpecFetcher {
    client: reqwest::Client,
}

impl HttpSpecFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SpecFetch for HttpSpecFetcher {
    async fn fetch_spec(&self, spec_url: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(spec_url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: spec_url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: spec_url.to_string(),
            });
        }

        response.json().await.map_err(|e| FetchError::Json {
            url: spec_url.to_string(),
            message: e.to_string(),
        })
    }
}
