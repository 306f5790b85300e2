//! # Rolegate Core
//!
//! Shared types, traits, and error handling for the rolegate crates.
//! Holds the role key naming convention, the stored role value codec and the
//! [`RoleStore`] abstraction that both the request-time resolver and the
//! batch reconciler talk to.

pub mod clock;
pub mod codec;
pub mod error;
pub mod key;
pub mod mocks;
pub mod store;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{decode_roles, encode_roles, ROLE_CONTENT_TYPE};
pub use error::{Result, StoreError};
pub use key::{normalize_identity, RoleKey, ROLE_KEY_FILTER};
pub use store::{InMemoryRoleStore, RoleStore, StoredValue};

/// Normalized user identity (lowercased e-mail / preferred username)
pub type UserId = String;

/// Role name as stored in a role list (e.g. `Admin`, `Member`)
pub type RoleName = String;
