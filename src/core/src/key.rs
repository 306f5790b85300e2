//! Role key naming: `users:<identity>:roles`
//!
//! The layout is shared with every other tool that reads or writes the
//! configuration store, so it must not change.

use std::fmt;

const KEY_PREFIX: &str = "users";
const KEY_SUFFIX: &str = "roles";

/// Key filter that matches every role assignment in the store
pub const ROLE_KEY_FILTER: &str = "users:*";

/// Lowercase and trim a user identity
pub fn normalize_identity(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// Store key for one user's role assignment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleKey {
    identity: String,
}

impl RoleKey {
    /// Build the key for a user identity. Returns `None` for blank identities.
    pub fn for_identity(identity: &str) -> Option<Self> {
        let identity = normalize_identity(identity);
        if identity.is_empty() {
            return None;
        }
        Some(Self { identity })
    }

    /// Parse a key read back from the store.
    ///
    /// Only keys with exactly three `:`-separated segments of the form
    /// `users:<identity>:roles` are role keys; anything else yields `None`.
    pub fn parse(key: &str) -> Option<Self> {
        let parts: Vec<&str> = key.split(':').collect();
        match parts.as_slice() {
            [KEY_PREFIX, identity, KEY_SUFFIX] if !identity.is_empty() => Some(Self {
                identity: (*identity).to_string(),
            }),
            _ => None,
        }
    }

    /// The identity embedded in the key
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", KEY_PREFIX, self.identity, KEY_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_key_is_lowercased() {
        let key = RoleKey::for_identity("A@X.com").unwrap();
        assert_eq!(key.to_string(), "users:a@x.com:roles");
        assert_eq!(key.identity(), "a@x.com");
    }

    #[test]
    fn test_blank_identity_has_no_key() {
        assert!(RoleKey::for_identity("").is_none());
        assert!(RoleKey::for_identity("   ").is_none());
    }

    #[test]
    fn test_parse_requires_three_segments() {
        assert_eq!(
            RoleKey::parse("users:b@x.com:roles").unwrap().identity(),
            "b@x.com"
        );
        assert!(RoleKey::parse("users:b@x.com").is_none());
        assert!(RoleKey::parse("users:b@x.com:roles:extra").is_none());
        assert!(RoleKey::parse("groups:b@x.com:roles").is_none());
        assert!(RoleKey::parse("users::roles").is_none());
        assert!(RoleKey::parse("users:b@x.com:settings").is_none());
    }

    proptest! {
        #[test]
        fn prop_display_parse_agree(identity in "[a-z0-9._%+-]{1,20}@[a-z0-9-]{1,10}\\.[a-z]{2,4}") {
            let key = RoleKey::for_identity(&identity).unwrap();
            let parsed = RoleKey::parse(&key.to_string()).unwrap();
            prop_assert_eq!(parsed, key);
        }

        #[test]
        fn prop_case_insensitive(identity in "[A-Za-z]{1,12}@[A-Za-z]{1,8}\\.com") {
            let upper = RoleKey::for_identity(&identity.to_uppercase()).unwrap();
            let lower = RoleKey::for_identity(&identity.to_lowercase()).unwrap();
            prop_assert_eq!(upper, lower);
        }
    }
}
