//! Read-through role resolution
//!
//! Lookups go cache first, then the remote store. Store failures never reach
//! the caller: they are logged and the user is treated as having no roles.
//! Failed lookups are not cached, so the next request tries the store again.

use crate::cache::RoleCache;
use rolegate_core::{decode_roles, normalize_identity, RoleKey, RoleStore};
use std::sync::Arc;
use tracing::{debug, error};

/// Resolves a user's roles through the [`RoleCache`]
pub struct RoleResolver {
    store: Arc<dyn RoleStore>,
    cache: Arc<RoleCache>,
}

impl RoleResolver {
    pub fn new(store: Arc<dyn RoleStore>, cache: Arc<RoleCache>) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &Arc<RoleCache> {
        &self.cache
    }

    /// Roles assigned to `identity`.
    ///
    /// Blank identities resolve to no roles without touching the store.
    /// With `force_refresh` the cache is bypassed and then repopulated.
    pub async fn resolve(&self, identity: &str, force_refresh: bool) -> Vec<String> {
        let Some(key) = RoleKey::for_identity(identity) else {
            return Vec::new();
        };
        let identity = normalize_identity(identity);

        if !force_refresh {
            if let Some(roles) = self.cache.get(&identity) {
                return roles;
            }
        }

        let roles = match self.store.get(&key.to_string()).await {
            Ok(Some(stored)) => decode_roles(&stored.value),
            Ok(None) => {
                // Normal for users who were never assigned a role
                debug!("No role assignment for {}", identity);
                Vec::new()
            }
            Err(e) => {
                error!("Error reading roles for {} from the role store: {}", identity, e);
                return Vec::new();
            }
        };

        self.cache.put(&identity, roles.clone());
        roles
    }

    pub async fn has_any_role(&self, identity: &str) -> bool {
        !self.resolve(identity, false).await.is_empty()
    }

    pub async fn has_role(&self, identity: &str, role: &str) -> bool {
        self.resolve(identity, false).await.iter().any(|r| r == role)
    }

    /// Drop the cached entry for `identity` and fetch it again
    pub async fn refresh(&self, identity: &str) -> Vec<String> {
        self.cache.invalidate(Some(identity));
        self.resolve(identity, true).await
    }

    /// See [`RoleCache::invalidate`]
    pub fn clear_cache(&self, identity: Option<&str>) -> bool {
        self.cache.invalidate(identity)
    }
}
