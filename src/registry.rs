//! Connection registry
//!
//! Shared mapping of live sessions to usernames. Sessions are registered
//! provisionally at accept time and named once authentication succeeds.
//! The registry owns no sockets; eviction is delivered through a per-entry
//! channel that the session's read loop selects on, so a blocked user's
//! in-flight read resolves as loop termination.
//!
//! The internal lock is held only for O(1) scans and mutations, never
//! across any I/O.

use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::debug;

use crate::types::SessionId;

/// Notice text delivered to an evicted session before its connection closes
pub const EVICTION_NOTICE: &str = "You have been blocked by the administrator. Disconnecting...";

#[derive(Debug)]
struct ConnectionEntry {
    id: SessionId,
    username: Option<String>,
    evict: mpsc::Sender<String>,
}

/// Registry of active connections
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: Mutex<Vec<ConnectionEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provisional entry for a freshly accepted connection
    ///
    /// Returns the receiving end of the entry's evict channel; the session
    /// keeps it and observes eviction through it.
    pub fn register(&self, id: SessionId) -> mpsc::Receiver<String> {
        let (evict_tx, evict_rx) = mpsc::channel(1);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(ConnectionEntry {
            id,
            username: None,
            evict: evict_tx,
        });
        evict_rx
    }

    /// Attach the authenticated username to an existing entry
    pub fn set_username(&self, id: SessionId, username: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
            entry.username = Some(username.to_string());
        }
    }

    /// Remove the entry for `id`
    ///
    /// Idempotent: a session evicted by an administrator is already gone by
    /// the time its own teardown runs. Removal order is irrelevant, so the
    /// entry is swap-removed.
    pub fn unregister(&self, id: SessionId) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.iter().position(|e| e.id == id) {
            Some(index) => {
                entries.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Point-in-time snapshot of authenticated sessions
    ///
    /// Entries may become stale immediately after this returns.
    pub fn list(&self) -> Vec<(String, SessionId)> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .filter_map(|e| e.username.clone().map(|name| (name, e.id)))
            .collect()
    }

    /// Total number of entries, provisional ones included
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Force-terminate every live session authenticated as `username`
    ///
    /// Each matching entry receives the eviction notice and is removed from
    /// the registry. Returns the number of sessions evicted. The notice send
    /// is non-blocking; a session whose channel is already full is being
    /// evicted anyway.
    pub fn evict(&self, username: &str) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut evicted = 0;
        let mut index = 0;
        while index < entries.len() {
            if entries[index].username.as_deref() == Some(username) {
                let entry = entries.swap_remove(index);
                let _ = entry.evict.try_send(EVICTION_NOTICE.to_string());
                debug!("Evicted session {} ({})", entry.id, username);
                evicted += 1;
            } else {
                index += 1;
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_unregister() {
        let registry = ConnectionRegistry::new();
        let id = SessionId::new();
        let _rx = registry.register(id);

        assert_eq!(registry.len(), 1);
        assert!(registry.unregister(id));
        assert!(registry.is_empty());
        // Second removal is a no-op
        assert!(!registry.unregister(id));
    }

    #[tokio::test]
    async fn test_list_shows_only_authenticated() {
        let registry = ConnectionRegistry::new();
        let provisional = SessionId::new();
        let named = SessionId::new();
        let _rx1 = registry.register(provisional);
        let _rx2 = registry.register(named);
        registry.set_username(named, "simple");

        let snapshot = registry.list();
        assert_eq!(snapshot, vec![("simple".to_string(), named)]);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_evict_sends_notice_and_removes() {
        let registry = ConnectionRegistry::new();
        let id = SessionId::new();
        let mut rx = registry.register(id);
        registry.set_username(id, "simple");

        assert_eq!(registry.evict("simple"), 1);
        assert!(registry.is_empty());
        assert_eq!(rx.recv().await.unwrap(), EVICTION_NOTICE);
    }

    #[tokio::test]
    async fn test_evict_unknown_user_is_noop() {
        let registry = ConnectionRegistry::new();
        let id = SessionId::new();
        let _rx = registry.register(id);
        registry.set_username(id, "simple");

        assert_eq!(registry.evict("nobody"), 0);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_evict_all_matching_sessions() {
        let registry = ConnectionRegistry::new();
        let a = SessionId::new();
        let b = SessionId::new();
        let keep = SessionId::new();
        let _rx_a = registry.register(a);
        let _rx_b = registry.register(b);
        let _rx_keep = registry.register(keep);
        registry.set_username(a, "simple");
        registry.set_username(b, "simple");
        registry.set_username(keep, "remote");

        assert_eq!(registry.evict("simple"), 2);
        assert_eq!(registry.list(), vec![("remote".to_string(), keep)]);
    }
}
