//! Block list
//!
//! Shared set of usernames forbidden from authenticating. The reserved
//! administrator name can never be inserted. Pure set operations; evicting
//! live sessions of a freshly blocked user is coordinated one level up so
//! this lock is never held together with the registry's.

use std::collections::HashSet;
use std::sync::Mutex;

/// The reserved administrator username; never blockable
pub const ADMIN_USERNAME: &str = "admin";

/// Set of blocked usernames
#[derive(Debug, Default)]
pub struct BlockList {
    blocked: Mutex<HashSet<String>>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `username` is currently blocked
    pub fn is_blocked(&self, username: &str) -> bool {
        self.blocked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(username)
    }

    /// Add `username` to the block list
    ///
    /// Returns whether the set changed. Blocking the administrator name or
    /// an already-blocked user is a no-op.
    pub fn insert(&self, username: &str) -> bool {
        if username == ADMIN_USERNAME {
            return false;
        }
        self.blocked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(username.to_string())
    }

    /// Remove `username` from the block list
    ///
    /// Returns whether the set changed; unblocking a non-blocked user is a
    /// no-op.
    pub fn remove(&self, username: &str) -> bool {
        self.blocked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(username)
    }

    /// Number of blocked usernames
    pub fn len(&self) -> usize {
        self.blocked.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_and_unblock() {
        let list = BlockList::new();
        assert!(!list.is_blocked("simple"));

        assert!(list.insert("simple"));
        assert!(list.is_blocked("simple"));
        assert_eq!(list.len(), 1);

        assert!(list.remove("simple"));
        assert!(!list.is_blocked("simple"));
        assert!(list.is_empty());
    }

    #[test]
    fn test_block_is_idempotent() {
        let list = BlockList::new();
        assert!(list.insert("simple"));
        assert!(!list.insert("simple"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_unblock_non_blocked_is_noop() {
        let list = BlockList::new();
        assert!(!list.remove("simple"));
        assert!(list.is_empty());
    }

    #[test]
    fn test_admin_can_never_be_blocked() {
        let list = BlockList::new();
        assert!(!list.insert(ADMIN_USERNAME));
        assert!(!list.is_blocked(ADMIN_USERNAME));
        assert!(list.is_empty());
    }
}
