//! Authentication
//!
//! The credential check is behind a trait so the fixed three-account table
//! is a default implementation rather than a structural assumption. No rate
//! limiting or lockout exists here; callers report a failure once and close.

use crate::types::Role;

/// Pluggable credential validator
///
/// Implementations map a `(username, password)` pair to a role, or `None`
/// when the pair is not recognized.
pub trait Authenticator: Send + Sync {
    /// Validate a credential pair, returning the resolved role on success
    fn authenticate(&self, username: &str, password: &str) -> Option<Role>;
}

/// The built-in fixed credential table
///
/// Exactly three identities: `admin`, `simple` and `remote`, each with a
/// fixed password. Credential hardening is intentionally out of scope.
#[derive(Debug, Default)]
pub struct StaticCredentials;

/// The fixed account table
const ACCOUNTS: &[(&str, &str)] = &[
    ("admin", "adminpass"),
    ("simple", "simplepass"),
    ("remote", "remotepass"),
];

impl Authenticator for StaticCredentials {
    fn authenticate(&self, username: &str, password: &str) -> Option<Role> {
        ACCOUNTS
            .iter()
            .find(|(user, pass)| *user == username && *pass == password)
            .map(|(user, _)| Role::for_username(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_credentials() {
        let auth = StaticCredentials;
        assert_eq!(auth.authenticate("admin", "adminpass"), Some(Role::Admin));
        assert_eq!(auth.authenticate("simple", "simplepass"), Some(Role::Simple));
        assert_eq!(auth.authenticate("remote", "remotepass"), Some(Role::Remote));
    }

    #[test]
    fn test_invalid_credentials() {
        let auth = StaticCredentials;
        assert_eq!(auth.authenticate("admin", "wrong"), None);
        assert_eq!(auth.authenticate("nobody", "adminpass"), None);
        assert_eq!(auth.authenticate("", ""), None);
    }

    #[test]
    fn test_credentials_are_case_sensitive() {
        let auth = StaticCredentials;
        assert_eq!(auth.authenticate("Admin", "adminpass"), None);
    }
}
