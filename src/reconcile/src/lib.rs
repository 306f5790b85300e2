//! # Rolegate Reconcile
//!
//! Brings the role assignments held in the remote role store in line with a
//! desired-state file: one `{ "name", "role" }` record per user.
//!
//! Entries are upserted in sequential batches. A failing entry is counted
//! and skipped, never aborting the run. With `remove_missing`, assignments
//! for users absent from the file are deleted afterwards; the existing keys
//! are listed up front, with a bounded retry on transient failures.
//!
//! ## Example
//!
//! ```rust
//! use rolegate_core::InMemoryRoleStore;
//! use rolegate_reconcile::{DesiredStateEntry, ReconcileOptions, Reconciler};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let reconciler = Reconciler::new(Arc::new(InMemoryRoleStore::new()));
//!     let desired = vec![DesiredStateEntry::new("alice@example.com", "Admin")];
//!
//!     let metrics = reconciler
//!         .reconcile(&desired, &ReconcileOptions::default())
//!         .await
//!         .unwrap();
//!     assert_eq!(metrics.successful_updates, 1);
//! }
//! ```

pub mod error;
pub mod exit;
pub mod input;
pub mod metrics;
pub mod reconciler;

// Re-export commonly used types
pub use error::{InputError, ReconcileError, ReconcileFailure};
pub use input::{load_desired_state, parse_desired_state, DesiredStateEntry};
pub use metrics::ReconciliationMetrics;
pub use reconciler::{
    ReconcileOptions, Reconciler, RetryPolicy, DEFAULT_BATCH_SIZE, MAX_RETRY_ATTEMPTS, RETRY_DELAY,
};
