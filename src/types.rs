//! Basic type definitions for the metadata server
//!
//! Provides newtype wrappers and enums for type safety:
//! - `SessionId`: UUID-based unique session identifier
//! - `Role`: the command set a user is entitled to

use uuid::Uuid;

/// Unique session identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe session identification.
/// Implements Hash and Eq for use as registry keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User role, fixing the available command set
///
/// Resolved from the username after authentication. `Unknown` is kept as an
/// explicit variant so an unrecognized role can still be greeted and closed
/// instead of being treated as an authentication failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Full access: file management plus user administration
    Admin,
    /// Ordinary user: upload/extract/search
    Simple,
    /// Remote user: greeting only, no command loop
    Remote,
    /// Authenticated but with no recognized command set
    Unknown,
}

impl Role {
    /// Resolve the role for a username
    pub fn for_username(username: &str) -> Self {
        match username {
            "admin" => Role::Admin,
            "simple" => Role::Simple,
            "remote" => Role::Remote,
            _ => Role::Unknown,
        }
    }

    /// Role name as used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Simple => "simple",
            Role::Remote => "remote",
            Role::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_unique() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_role_resolution() {
        assert_eq!(Role::for_username("admin"), Role::Admin);
        assert_eq!(Role::for_username("simple"), Role::Simple);
        assert_eq!(Role::for_username("remote"), Role::Remote);
        assert_eq!(Role::for_username("someone"), Role::Unknown);
    }

    #[test]
    fn test_role_names() {
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::Unknown.to_string(), "unknown");
    }
}
