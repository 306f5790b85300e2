//! Error types for role store access
//!
//! Every [`RoleStore`](crate::store::RoleStore) implementation reports
//! failures through [`StoreError`] so that callers can tell "the key is not
//! there" apart from "the store could not be reached".

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Role store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key does not exist
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Create-only write hit an existing key
    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    /// Credentials missing, expired or rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Connectivity problem or throttling; safe to retry
    #[error("Transient error: {0}")]
    Transient(String),

    /// Unexpected HTTP status from the store
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Store settings are missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Create a not found error
    pub fn not_found<S: Into<String>>(key: S) -> Self {
        StoreError::NotFound(key.into())
    }

    /// Create an unauthorized error
    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        StoreError::Unauthorized(msg.into())
    }

    /// Create a transient error
    pub fn transient<S: Into<String>>(msg: S) -> Self {
        StoreError::Transient(msg.into())
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        StoreError::Configuration(msg.into())
    }

    /// Classify an HTTP status code returned by the store
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => StoreError::Unauthorized(message),
            404 => StoreError::NotFound(message),
            412 => StoreError::AlreadyExists(message),
            429 | 500..=599 => StoreError::Transient(format!("HTTP {}: {}", status, message)),
            _ => StoreError::Http { status, message },
        }
    }

    /// Whether the operation may succeed if simply retried
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StoreError::Unauthorized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(StoreError::from_status(401, "no token").is_unauthorized());
        assert!(StoreError::from_status(403, "forbidden").is_unauthorized());
        assert!(StoreError::from_status(404, "users:a:roles").is_not_found());
        assert!(matches!(
            StoreError::from_status(412, "users:a:roles"),
            StoreError::AlreadyExists(_)
        ));
        assert!(StoreError::from_status(429, "slow down").is_transient());
        assert!(StoreError::from_status(503, "unavailable").is_transient());
        assert!(matches!(
            StoreError::from_status(400, "bad key"),
            StoreError::Http { status: 400, .. }
        ));
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::not_found("users:a@x.com:roles");
        assert_eq!(err.to_string(), "Key not found: users:a@x.com:roles");

        let err = StoreError::Http { status: 400, message: "bad".to_string() };
        assert_eq!(err.to_string(), "HTTP 400: bad");
    }
}
