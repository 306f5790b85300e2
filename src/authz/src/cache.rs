//! TTL cache for resolved role lists
//!
//! One entry per normalized identity. Entries are never evicted for space;
//! the user population is small and bounded. An expired entry is reported as
//! a miss and stays in the map until the follow-up lookup overwrites it.

use parking_lot::Mutex;
use rolegate_core::{normalize_identity, Clock, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default time-to-live for cached role lists
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live shared by every entry
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedRoles {
    roles: Vec<String>,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CachedRoles>,
    hits: u64,
    misses: u64,
    expirations: u64,
}

/// Per-process role cache
pub struct RoleCache {
    inner: Mutex<Inner>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl RoleCache {
    /// Create a cache driven by the system clock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            config,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Cached roles for `identity`, if present and not yet expired
    pub fn get(&self, identity: &str) -> Option<Vec<String>> {
        let key = normalize_identity(identity);
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let cached = match inner.entries.get(&key) {
            Some(entry) if now < entry.expires_at => Some(entry.roles.clone()),
            Some(_) => {
                inner.expirations += 1;
                None
            }
            None => None,
        };

        match cached {
            Some(roles) => {
                inner.hits += 1;
                Some(roles)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Store `roles` for `identity`, replacing any previous entry
    pub fn put(&self, identity: &str, roles: Vec<String>) {
        let key = normalize_identity(identity);
        let expires_at = self.clock.now() + self.config.ttl;
        self.inner
            .lock()
            .entries
            .insert(key, CachedRoles { roles, expires_at });
    }

    /// Drop one identity (`Some`) or everything (`None`).
    ///
    /// Returns whether the identity had an entry; clearing everything always
    /// returns `true`.
    pub fn invalidate(&self, identity: Option<&str>) -> bool {
        let mut inner = self.inner.lock();
        match identity {
            Some(identity) => inner.entries.remove(&normalize_identity(identity)).is_some(),
            None => {
                inner.entries.clear();
                true
            }
        }
    }

    /// Number of entries held, expired ones included
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            expirations: inner.expirations,
            entries: inner.entries.len(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
