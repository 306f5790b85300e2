//! Credential errors

use rolegate_core::StoreError;
use thiserror::Error;

/// Token acquisition failure
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    /// The credential does not apply to this environment; try the next one
    #[error("{credential} unavailable: {message}")]
    Unavailable {
        credential: &'static str,
        message: String,
    },

    /// The credential applies but the token request was rejected
    #[error("{credential} authentication failed: {message}")]
    Authentication {
        credential: &'static str,
        message: String,
    },

    /// Every credential in the chain was unavailable
    #[error("No credential could provide a token: {}", .0.join("; "))]
    ChainExhausted(Vec<String>),
}

impl CredentialError {
    pub fn unavailable(credential: &'static str, message: impl Into<String>) -> Self {
        CredentialError::Unavailable {
            credential,
            message: message.into(),
        }
    }

    pub fn authentication(credential: &'static str, message: impl Into<String>) -> Self {
        CredentialError::Authentication {
            credential,
            message: message.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, CredentialError::Unavailable { .. })
    }
}

impl From<CredentialError> for StoreError {
    fn from(err: CredentialError) -> Self {
        StoreError::Unauthorized(err.to_string())
    }
}
