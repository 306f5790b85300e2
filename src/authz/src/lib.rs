//! # Rolegate Authorization
//!
//! Request-time role lookup for the web application.
//!
//! ## Features
//!
//! - **TTL role cache** in front of the remote role store
//! - **Read-through resolver** that degrades to "no roles" instead of failing
//! - **Auth gate** abstraction with a reverse-proxy header implementation
//! - **Access view** decision (login / no roles / admin / member / limited)
//! - **HTTP router** exposing access, refresh, health and cache metrics
//!
//! ## Example
//!
//! ```rust
//! use rolegate_authz::{CacheConfig, RoleCache, RoleResolver};
//! use rolegate_core::InMemoryRoleStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(InMemoryRoleStore::new());
//!     let cache = Arc::new(RoleCache::new(CacheConfig::default()));
//!     let resolver = RoleResolver::new(store, cache);
//!
//!     let roles = resolver.resolve("alice@example.com", false).await;
//!     assert!(roles.is_empty());
//! }
//! ```

pub mod access;
pub mod cache;
pub mod gate;
pub mod http;
pub mod resolver;

// Re-export commonly used types
pub use access::{decide, AccessDecision, AccessView, ADMIN_ROLE, MEMBER_ROLE};
pub use cache::{CacheConfig, CacheStats, RoleCache, DEFAULT_CACHE_TTL};
pub use gate::{AuthGate, GateConfig, Identity, ProxyHeaderGate};
pub use http::{router, AppState};
pub use resolver::RoleResolver;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
