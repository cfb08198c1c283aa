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

//! Registry/aggregation engine
//!
//! Ties the service directory, spec cache, and fetcher together and exposes
//! the aggregate discovery operations. A failure fetching one service never
//! blocks or fails operations concerning the others.

pub mod cache;
pub mod fetch;
pub mod search;
pub mod summary;

use crate::directory::ServiceDirectory;
use cache::{CachedSpec, SpecCache};
use fetch::SpecFetch;
use search::SearchMatch;
use serde::Serialize;
use std::sync::Arc;
use summary::{summarize, EndpointSummary};
use tracing::debug;

/// Per-service slice of the aggregate discovery document
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSummary {
    pub service: String,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub endpoints: Vec<EndpointSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The registry facade: directory + cache + fetcher
pub struct SpecRegistry {
    directory: ServiceDirectory,
    cache: SpecCache,
    fetcher: Arc<dyn SpecFetch>,
}

impl SpecRegistry {
    pub fn new(directory: ServiceDirectory, cache: SpecCache, fetcher: Arc<dyn SpecFetch>) -> Self {
        Self {
            directory,
            cache,
            fetcher,
        }
    }

    pub fn directory(&self) -> &ServiceDirectory {
        &self.directory
    }

    /// Cached spec for one service, fetching if the cache entry is missing or
    /// expired. Returns `None` for unknown service names.
    ///
    /// A cached failure within the TTL window is returned as-is, so a broken
    /// service is not retried on every request.
    pub async fn get_spec(&self, name: &str) -> Option<Arc<CachedSpec>> {
        let base_url = self.directory.base_url(name)?.to_string();
        Some(self.get_or_fetch(name, &base_url).await)
    }

    async fn get_or_fetch(&self, name: &str, base_url: &str) -> Arc<CachedSpec> {
        if let Some(entry) = self.cache.get_fresh(name) {
            return entry;
        }

        let spec_url = format!("{base_url}/openapi.json");
        debug!(service = %name, url = %spec_url, "Fetching spec");
        let outcome = match self.fetcher.fetch_spec(&spec_url).await {
            Ok(document) => CachedSpec::success(document),
            Err(e) => CachedSpec::failure(e.to_string()),
        };
        self.cache.insert(name, outcome)
    }

    /// Summarize every registered service, fan-out issued concurrently.
    ///
    /// Always returns one entry per directory entry in directory order, and
    /// only completes once every service has resolved. Failing services get
    /// an `error` field and empty `endpoints`.
    pub async fn aggregate_all(&self) -> Vec<ServiceSummary> {
        let futures: Vec<_> = self
            .directory
            .iter()
            .map(|entry| async move {
                let cached = self.get_or_fetch(&entry.name, &entry.base_url).await;
                self.summarize_entry(entry.name, entry.base_url, &cached)
            })
            .collect();

        // join_all preserves input order regardless of completion order
        futures::future::join_all(futures).await
    }

    fn summarize_entry(
        &self,
        service: String,
        base_url: String,
        cached: &CachedSpec,
    ) -> ServiceSummary {
        match &cached.document {
            Some(document) => {
                let spec = summarize(document);
                ServiceSummary {
                    service,
                    base_url,
                    title: spec.title,
                    description: spec.description,
                    endpoints: spec.endpoints,
                    error: None,
                }
            }
            None => ServiceSummary {
                service,
                base_url,
                title: None,
                description: None,
                endpoints: Vec::new(),
                error: Some(
                    cached
                        .error
                        .clone()
                        .unwrap_or_else(|| "spec unavailable".to_string()),
                ),
            },
        }
    }

    /// Keyword search over every service's summarized endpoints
    pub async fn search(&self, keyword: &str) -> Vec<SearchMatch> {
        let summaries = self.aggregate_all().await;
        search::search_summaries(&summaries, keyword)
    }

    /// Force a live fetch on the next lookup for one service.
    /// Returns false for unknown names.
    pub fn invalidate(&self, name: &str) -> bool {
        if self.directory.base_url(name).is_none() {
            return false;
        }
        self.cache.invalidate(name);
        true
    }

    /// Force live fetches for every service
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}
