//! Producer connection tracking.
//!
//! The registry only feeds the health endpoint and disconnect logs; message
//! handling never reads it, so connections stay independent of each other.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Unique producer connection identifier.
pub type ConnectionId = Uuid;

/// State for a single producer connection.
pub struct ConnectionState {
    /// Unique connection identifier.
    pub id: ConnectionId,
    /// Timestamp (ms) when the producer connected.
    pub connected_at: i64,
    /// Timestamp (ms) of the last frame of any kind.
    last_seen: AtomicI64,
    /// Text frames received.
    messages: AtomicU64,
}

impl ConnectionState {
    pub fn new() -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: Uuid::new_v4(),
            connected_at: now,
            last_seen: AtomicI64::new(now),
            messages: AtomicU64::new(0),
        }
    }

    /// Mark activity on the connection.
    pub fn touch(&self) {
        self.last_seen
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Count one text frame.
    pub fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    pub fn message_count(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    pub fn last_seen(&self) -> i64 {
        self.last_seen.load(Ordering::Relaxed)
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock-free registry of live producer connections.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Arc<ConnectionState>>,
    /// Text frames received across all connections, including closed ones.
    total_messages: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            total_messages: AtomicU64::new(0),
        }
    }

    /// Register a new connection.
    pub fn register(&self, connection: Arc<ConnectionState>) -> ConnectionId {
        let id = connection.id;
        self.connections.insert(id, connection);
        debug!("Connection {} registered", id);
        id
    }

    /// Remove a connection, returning its final state.
    pub fn unregister(&self, id: &ConnectionId) -> Option<Arc<ConnectionState>> {
        let removed = self.connections.remove(id).map(|(_, state)| state);
        if removed.is_some() {
            debug!("Connection {} unregistered", id);
        }
        removed
    }

    /// Count one text frame on `connection`.
    pub fn record_message(&self, connection: &ConnectionState) {
        connection.record_message();
        self.total_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn total_messages(&self) -> u64 {
        self.total_messages.load(Ordering::Relaxed)
    }

    /// Connections silent for longer than `max_idle_ms`.
    pub fn idle_connections(&self, max_idle_ms: i64) -> Vec<ConnectionId> {
        let now = Utc::now().timestamp_millis();
        let idle: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|entry| now - entry.value().last_seen() > max_idle_ms)
            .map(|entry| *entry.key())
            .collect();
        if !idle.is_empty() {
            debug!(
                "{} producer connection(s) idle for over {}ms",
                idle.len(),
                max_idle_ms
            );
        }
        idle
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_unregister() {
        let registry = ConnectionRegistry::new();
        let first = registry.register(Arc::new(ConnectionState::new()));
        let second = registry.register(Arc::new(ConnectionState::new()));
        assert_ne!(first, second);
        assert_eq!(registry.connection_count(), 2);

        assert!(registry.unregister(&first).is_some());
        assert!(registry.unregister(&first).is_none());
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.unregister(&second).map(|c| c.id), Some(second));
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_message_counts_survive_disconnect() {
        let registry = ConnectionRegistry::new();
        let connection = Arc::new(ConnectionState::new());
        let id = registry.register(connection.clone());

        registry.record_message(&connection);
        registry.record_message(&connection);
        assert_eq!(connection.message_count(), 2);

        let closed = registry.unregister(&id).unwrap();
        assert_eq!(closed.message_count(), 2);
        assert_eq!(registry.total_messages(), 2);
    }

    #[test]
    fn test_idle_connections() {
        let registry = ConnectionRegistry::new();
        let connection = Arc::new(ConnectionState::new());
        let id = registry.register(connection.clone());

        assert!(registry.idle_connections(60_000).is_empty());
        connection.last_seen.store(0, Ordering::Relaxed);
        assert_eq!(registry.idle_connections(60_000), vec![id]);
    }
}
