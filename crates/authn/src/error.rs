//! Authentication error types.
//!
//! This module defines errors that can occur while authenticating an
//! identity against a realm and recording the resulting session.

use realmkeep_storage::{CacheError, StorageError};
use thiserror::Error;

/// Authentication errors.
///
/// An unknown identity and a wrong secret both surface as
/// [`AuthenticationFailed`](Self::AuthenticationFailed); nothing in this
/// type distinguishes the two.
///
/// # Non-exhaustive
///
/// Variants for new failure kinds may appear in minor releases, so match
/// expressions over this type need a wildcard arm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The presented secret did not validate.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Credential store or authentication storage failure.
    ///
    /// Wraps the original [`StorageError`] to preserve the full error source
    /// chain for debugging and structured logging.
    #[error("Credential storage unavailable: {0}")]
    StorageUnavailable(
        /// The underlying storage error.
        #[source]
        StorageError,
    ),

    /// The session cache is full of sessions still inside their protection
    /// window.
    #[error("Session capacity exhausted: {0}")]
    SessionCapacityExhausted(
        /// The underlying cache error.
        #[source]
        CacheError,
    ),
}

impl AuthError {
    /// Whether retrying the same request later may succeed.
    ///
    /// Failed authentication is final; storage outages and a full session
    /// cache are transient conditions.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_) | Self::SessionCapacityExhausted(_))
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::StorageUnavailable(err)
    }
}

impl From<CacheError> for AuthError {
    fn from(err: CacheError) -> Self {
        AuthError::SessionCapacityExhausted(err)
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
