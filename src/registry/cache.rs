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

//! Spec cache with TTL and explicit invalidation.
//!
//! One entry per service name, mutated in place on every fetch. Failed
//! fetches are cached exactly like successful ones, so a flapping service is
//! not hammered inside the TTL window.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cached copy of one service's spec fetch outcome.
///
/// Invariant: exactly one of `document` / `error` is populated after a
/// completed fetch attempt.
#[derive(Debug, Clone)]
pub struct CachedSpec {
    pub document: Option<Value>,
    pub error: Option<String>,
    pub fetched_at: Instant,
}

impl CachedSpec {
    pub fn success(document: Value) -> Self {
        Self {
            document: Some(document),
            error: None,
            fetched_at: Instant::now(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            document: None,
            error: Some(message.into()),
            fetched_at: Instant::now(),
        }
    }
}

/// Process-wide spec cache, injected into the registry rather than ambient
pub struct SpecCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Arc<CachedSpec>>>,
}

impl SpecCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached entry if it is still within the TTL window.
    ///
    /// Cached errors count: a fresh failure entry suppresses refetching.
    pub fn get_fresh(&self, name: &str) -> Option<Arc<CachedSpec>> {
        let entries = self.entries.read();
        let entry = entries.get(name)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(Arc::clone(entry))
        } else {
            None
        }
    }

    /// Record a fetch outcome. Last writer wins under concurrent fetches.
    pub fn insert(&self, name: &str, entry: CachedSpec) -> Arc<CachedSpec> {
        let entry = Arc::new(entry);
        self.entries
            .write()
            .insert(name.to_string(), Arc::clone(&entry));
        entry
    }

    /// Drop one entry so the next lookup performs a live fetch
    pub fn invalidate(&self, name: &str) -> bool {
        self.entries.write().remove(name).is_some()
    }

    /// Drop every entry
    pub fn invalidate_all(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
