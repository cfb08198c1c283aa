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

//! Session identity and lifecycle.
//!
//! Sessions are created on first contact without an id, looked up by id on
//! subsequent contacts, and destroyed only by an explicit close or process
//! shutdown. Ids are random UUIDs so a session cannot be hijacked by
//! guessing. No idle eviction is performed.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::info;

/// Capacity of the per-session push channel
const PUSH_CHANNEL_CAPACITY: usize = 64;

/// One established session and its server-push channel
pub struct McpSession {
    pub id: String,
    pub created_at: Instant,
    push: broadcast::Sender<String>,
}

impl McpSession {
    fn new() -> Self {
        let (push, _) = broadcast::channel(PUSH_CHANNEL_CAPACITY);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Instant::now(),
            push,
        }
    }

    /// Attach a receiver for server-push frames
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.push.subscribe()
    }

    /// Push a serialized frame to any attached streams
    pub fn push(&self, frame: String) {
        // No receivers attached is fine; frames are fire-and-forget
        let _ = self.push.send(frame);
    }
}

/// Process-wide session table, keyed by session id
#[derive(Default)]
pub struct SessionTable {
    sessions: DashMap<String, Arc<McpSession>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Establish a new session with a fresh random id
    pub fn create(&self) -> Arc<McpSession> {
        let session = Arc::new(McpSession::new());
        self.sessions
            .insert(session.id.clone(), Arc::clone(&session));
        info!(session_id = %session.id, "MCP session established");
        session
    }

    /// Look up an established session
    pub fn get(&self, id: &str) -> Option<Arc<McpSession>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Tear a session down. Returns false when the id is unknown.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            info!(session_id = %id, "MCP session closed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_get_distinct_random_ids() {
        let table = SessionTable::new();
        let a = table.create();
        let b = table.create();
        assert_ne!(a.id, b.id);
        assert_eq!(table.len(), 2);
        // UUID v4 shape
        assert_eq!(a.id.len(), 36);
    }

    #[test]
    fn test_lookup_and_teardown() {
        let table = SessionTable::new();
        let session = table.create();
        assert!(table.get(&session.id).is_some());
        assert!(table.remove(&session.id));
        assert!(table.get(&session.id).is_none());
        assert!(!table.remove(&session.id));
    }

    #[tokio::test]
    async fn test_push_reaches_subscriber() {
        let table = SessionTable::new();
        let session = table.create();
        let mut rx = session.subscribe();
        session.push("frame".to_string());
        assert_eq!(rx.recv().await.unwrap(), "frame");
    }

    #[test]
    fn test_push_without_subscribers_is_harmless() {
        let session = SessionTable::new().create();
        session.push("dropped".to_string());
    }
}
