//! Error types for reconciliation runs

use crate::metrics::ReconciliationMetrics;
use rolegate_core::StoreError;
use thiserror::Error;

/// Failure to load the desired-state file
#[derive(Debug, Error)]
pub enum InputError {
    #[error("User file not found: {0}")]
    NotFound(String),

    #[error("Invalid JSON in user file {path}: {message}")]
    InvalidJson { path: String, message: String },

    #[error("Failed to read user file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Run-level failure: the run stops, per-entry failures are not errors
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Failed to list role keys after {attempts} attempts: {source}")]
    ListingExhausted {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("Error listing role keys: {0}")]
    Listing(#[source] StoreError),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ReconcileError {
    /// Classify a failure to construct or probe the store client
    pub fn from_connect(err: StoreError) -> Self {
        match err {
            StoreError::Configuration(msg) => ReconcileError::Configuration(msg),
            other => ReconcileError::Authentication(other.to_string()),
        }
    }
}

/// A run that aborted, with the metrics gathered until it did
#[derive(Debug, Error)]
#[error("Role assignment failed: {error}")]
pub struct ReconcileFailure {
    #[source]
    pub error: ReconcileError,
    pub metrics: ReconciliationMetrics,
}
