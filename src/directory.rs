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

//! Service directory
//!
//! Resolves the set of registered services (name -> base URL) from static
//! configuration and environment variables. Purely local: no network access
//! happens here.

use crate::config::RegistryConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Aggregate environment variable: `name1=url1,name2=url2`
pub const SERVICES_VAR: &str = "SPECHUB_SERVICES";

/// Suffixes recognized on individually named service variables
const NAME_SUFFIXES: &[&str] = &["_SERVICE_URL", "_WORKER_URL"];

/// One registered service. Immutable for process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEntry {
    pub name: String,
    pub base_url: String,
}

impl ServiceEntry {
    /// Well-known location of this service's spec document
    pub fn spec_url(&self) -> String {
        format!("{}/openapi.json", self.base_url)
    }
}

/// Resolved mapping from service name to base URL.
///
/// Iteration order is the directory order every aggregation and search result
/// follows, so it is kept deterministic (sorted by name).
#[derive(Debug, Clone, Default)]
pub struct ServiceDirectory {
    entries: BTreeMap<String, String>,
}

impl ServiceDirectory {
    /// Resolve the directory from configuration plus the process environment
    pub fn resolve(config: &RegistryConfig) -> Self {
        Self::resolve_from(config, std::env::vars())
    }

    /// Resolve from configuration and an explicit environment snapshot.
    ///
    /// Merge order: configured services, then the aggregate variable, then
    /// individually named variables. Later sources overwrite earlier ones for
    /// the same derived name.
    pub fn resolve_from(
        config: &RegistryConfig,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut entries = BTreeMap::new();

        for (name, url) in &config.services {
            insert_checked(&mut entries, normalize_name(name), url.clone());
        }

        let mut aggregate = None;
        let mut named = Vec::new();
        for (key, value) in env {
            if key == SERVICES_VAR {
                aggregate = Some(value);
            } else if let Some(name) = derive_name(&key) {
                named.push((name, value));
            }
        }

        if let Some(list) = aggregate {
            for pair in list.split(',') {
                let pair = pair.trim();
                if pair.is_empty() {
                    continue;
                }
                match pair.split_once('=') {
                    Some((name, url)) if !name.trim().is_empty() => {
                        insert_checked(
                            &mut entries,
                            normalize_name(name.trim()),
                            url.trim().to_string(),
                        );
                    }
                    _ => warn!(entry = %pair, "Ignoring malformed service list entry"),
                }
            }
        }

        for (name, url) in named {
            insert_checked(&mut entries, name, url);
        }

        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Base URL for one service, if registered
    pub fn base_url(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// All registered names, in directory order
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Iterate entries in directory order
    pub fn iter(&self) -> impl Iterator<Item = ServiceEntry> + '_ {
        self.entries.iter().map(|(name, url)| ServiceEntry {
            name: name.clone(),
            base_url: url.clone(),
        })
    }
}

/// Drop candidates whose URL has no http(s) scheme; never fatal
fn insert_checked(entries: &mut BTreeMap<String, String>, name: String, url: String) {
    if url.starts_with("http://") || url.starts_with("https://") {
        entries.insert(name, url);
    } else {
        warn!(service = %name, url = %url, "Dropping service with non-HTTP base URL");
    }
}

/// Lowercase and hyphen-normalize a service name token
fn normalize_name(token: &str) -> String {
    token.to_lowercase().replace('_', "-")
}

/// Derive a service name from a `<NAME>_SERVICE_URL` / `<NAME>_WORKER_URL` key
fn derive_name(key: &str) -> Option<String> {
    for suffix in NAME_SUFFIXES {
        if let Some(token) = key.strip_suffix(suffix) {
            if !token.is_empty() {
                return Some(normalize_name(token));
            }
        }
    }
    None
}
