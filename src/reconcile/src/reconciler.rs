//! Batch reconciliation of role assignments

use crate::error::{ReconcileError, ReconcileFailure};
use crate::input::DesiredStateEntry;
use crate::metrics::ReconciliationMetrics;
use rolegate_core::{
    encode_roles, normalize_identity, RoleKey, RoleStore, StoreError, ROLE_CONTENT_TYPE,
    ROLE_KEY_FILTER,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Users processed per batch
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Attempts at listing existing role keys before giving up
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Fixed pause between listing attempts
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Retry policy for listing existing keys
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}

/// Options for one reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Delete assignments for users missing from the desired state
    pub remove_missing: bool,

    pub batch_size: usize,

    pub retry: RetryPolicy,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            remove_missing: false,
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

impl ReconcileOptions {
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.batch_size == 0 {
            return Err(ReconcileError::InvalidOptions(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    succeeded: usize,
    failed: usize,
}

/// Applies a desired state to a role store
pub struct Reconciler {
    store: Arc<dyn RoleStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        Self { store }
    }

    /// Run one reconciliation.
    ///
    /// Per-entry failures are counted in the returned metrics. Only run-level
    /// failures (invalid options, listing failures) return an error, which
    /// carries the metrics gathered up to that point.
    pub async fn reconcile(
        &self,
        desired: &[DesiredStateEntry],
        options: &ReconcileOptions,
    ) -> Result<ReconciliationMetrics, ReconcileFailure> {
        let started = Instant::now();
        let mut metrics = ReconciliationMetrics::new(desired.len());

        let result = self.run(desired, options, &mut metrics).await;
        metrics.execution_time_seconds = round_centis(started.elapsed());

        match result {
            Ok(()) => Ok(metrics),
            Err(error) => {
                error!("{}", error);
                Err(ReconcileFailure { error, metrics })
            }
        }
    }

    async fn run(
        &self,
        desired: &[DesiredStateEntry],
        options: &ReconcileOptions,
        metrics: &mut ReconciliationMetrics,
    ) -> Result<(), ReconcileError> {
        options.validate()?;

        // Listed before any write so that the removal pass sees the prior state
        let existing_keys = if options.remove_missing {
            self.list_existing_keys(&options.retry).await?
        } else {
            Vec::new()
        };

        for (index, batch) in desired.chunks(options.batch_size).enumerate() {
            let start = index * options.batch_size;
            info!(
                "Processing batch {}-{} of {} users",
                start + 1,
                start + batch.len(),
                desired.len()
            );

            let tally = self.apply_batch(batch).await;
            metrics.successful_updates += tally.succeeded;
            metrics.failed_updates += tally.failed;
        }

        if options.remove_missing {
            let current: HashSet<String> = desired
                .iter()
                .map(|entry| normalize_identity(&entry.name))
                .filter(|name| !name.is_empty())
                .collect();

            let tally = self.remove_obsolete(&existing_keys, &current).await;
            metrics.successful_removals += tally.succeeded;
            metrics.failed_removals += tally.failed;
        }

        Ok(())
    }

    /// List every role key, retrying transient failures with a fixed delay
    async fn list_existing_keys(&self, retry: &RetryPolicy) -> Result<Vec<String>, ReconcileError> {
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            info!("Fetching existing role configuration keys");
            match self.store.list(ROLE_KEY_FILTER).await {
                Ok(keys) => {
                    info!("Found {} existing role configuration keys", keys.len());
                    return Ok(keys);
                }
                Err(e) if e.is_transient() => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        return Err(ReconcileError::ListingExhausted {
                            attempts: attempt,
                            source: e,
                        });
                    }
                    warn!(
                        "Network error listing keys (attempt {}/{}): {}",
                        attempt, max_attempts, e
                    );
                    tokio::time::sleep(retry.delay).await;
                }
                Err(e) if e.is_unauthorized() => {
                    return Err(ReconcileError::Authentication(e.to_string()));
                }
                Err(e) => return Err(ReconcileError::Listing(e)),
            }
        }
    }

    async fn apply_batch(&self, batch: &[DesiredStateEntry]) -> Tally {
        let mut tally = Tally::default();

        for entry in batch {
            if !entry.is_actionable() {
                info!("Skipping invalid user entry: {:?}", entry);
                continue;
            }
            let Some(key) = RoleKey::for_identity(&entry.name) else {
                continue;
            };
            let key = key.to_string();
            let value = encode_roles(&[entry.role.as_str()]);

            match self.upsert(&key, &value).await {
                Ok(()) => {
                    tally.succeeded += 1;
                    info!("Set {} to [{}]", key, entry.role);
                }
                Err(e) => {
                    tally.failed += 1;
                    error!("Failed to set roles for {}: {}", entry.name, e);
                }
            }
        }

        tally
    }

    /// Overwrite an existing assignment or create a new one
    async fn upsert(&self, key: &str, value: &str) -> rolegate_core::Result<()> {
        if self.store.get(key).await?.is_some() {
            debug!("Updating existing role for {}", key);
            return self.store.set(key, value, ROLE_CONTENT_TYPE).await;
        }

        debug!("Creating new role entry for {}", key);
        match self.store.add(key, value, ROLE_CONTENT_TYPE).await {
            // Created by someone else since the read
            Err(StoreError::AlreadyExists(_)) => self.store.set(key, value, ROLE_CONTENT_TYPE).await,
            other => other,
        }
    }

    async fn remove_obsolete(&self, existing_keys: &[String], current: &HashSet<String>) -> Tally {
        let mut tally = Tally::default();

        for key in existing_keys {
            let Some(role_key) = RoleKey::parse(key) else {
                continue;
            };
            if current.contains(role_key.identity()) {
                continue;
            }

            info!("Removing {} as user is no longer in the list", key);
            match self.store.delete(key).await {
                Ok(true) => tally.succeeded += 1,
                Ok(false) | Err(StoreError::NotFound(_)) => {
                    info!("Key {} not found, already deleted", key);
                    tally.succeeded += 1;
                }
                Err(e) => {
                    error!("Failed to remove {}: {}", key, e);
                    tally.failed += 1;
                }
            }
        }

        tally
    }
}

fn round_centis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}
