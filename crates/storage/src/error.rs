//! Storage, cache and configuration error types.
//!
//! This module defines the error types that can occur while talking to a
//! credential or session store, while admitting entries into a
//! [`HybridCache`](crate::cache::HybridCache), and while validating
//! configuration.
//!
//! # Error Types
//!
//! - [`StorageError`] - failures of an external store (credentials, sessions)
//! - [`CacheError`] - the cache could not admit an entry
//! - [`ConfigError`] - a configuration value was rejected at construction
//!
//! # Example
//!
//! ```
//! use realmkeep_storage::{StorageError, StorageResult};
//!
//! fn insert(key: &str, exists: bool) -> StorageResult<()> {
//!     if exists {
//!         return Err(StorageError::conflict(key));
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading from or writing to an external store.
///
/// Store implementations map their internal failures to these variants.
/// Errors preserve their source chain via the `#[source]` attribute.
///
/// # Non-exhaustive
///
/// Variants for new failure kinds may appear in minor releases, so match
/// expressions over this type need a wildcard arm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// A record with the same key already exists.
    #[error("Conflict: {key}")]
    Conflict {
        /// The conflicting key.
        key: String,
    },

    /// Connection or network error.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// The underlying error that caused this connection failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Serialization or deserialization error.
    ///
    /// Also raised when a stored secret cannot be decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
        /// The underlying error that caused serialization to fail.
        #[source]
        source: Option<BoxError>,
    },

    /// Internal store error that does not fit another category.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
        /// The underlying error that caused this internal failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Operation timed out.
    #[error("Operation timeout")]
    Timeout,
}

impl StorageError {
    /// Creates a new `Conflict` error for the given key.
    #[must_use]
    pub fn conflict(key: impl Into<String>) -> Self {
        Self::Conflict { key: key.into() }
    }

    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Connection` error with a message and source error.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Serialization` error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a new `Serialization` error with a message and source error.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `Internal` error with a message and source error.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Returns `true` for failures that are likely to clear on retry
    /// (connection problems and timeouts).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout)
    }
}

/// Errors raised by [`HybridCache`](crate::cache::HybridCache) when an entry
/// cannot be admitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CacheError {
    /// Every resident entry is inside its `min_live` protection window, so
    /// admitting another entry would exceed the hard capacity.
    #[error("Cache capacity exhausted: {capacity} entries are protected from eviction")]
    CapacityExhausted {
        /// The configured hard capacity.
        capacity: usize,
    },
}

/// Errors raised when a configuration value is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A numeric field fell below its allowed minimum.
    #[error("{field} must be at least {min} (got {value})")]
    BelowMinimum {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value, rendered for display.
        value: String,
        /// The minimum accepted value, rendered for display.
        min: String,
    },

    /// Two fields violate a required relation.
    #[error("{field} {relation} (got {value})")]
    InvalidRelation {
        /// Name of the offending field.
        field: &'static str,
        /// The relation that must hold, e.g. `"must be less than capacity (10)"`.
        relation: String,
        /// The rejected value, rendered for display.
        value: String,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_storage_error_display() {
        assert_eq!(
            StorageError::conflict("realm:1/user:bob").to_string(),
            "Conflict: realm:1/user:bob"
        );
        assert_eq!(StorageError::timeout().to_string(), "Operation timeout");
        assert_eq!(
            StorageError::connection("refused").to_string(),
            "Connection error: refused"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(StorageError::connection("refused").is_transient());
        assert!(StorageError::timeout().is_transient());
        assert!(!StorageError::internal("boom").is_transient());
        assert!(!StorageError::serialization("bad phc").is_transient());
        assert!(!StorageError::conflict("k").is_transient());
    }

    #[test]
    fn test_source_chain_preserved() {
        let inner = StorageError::timeout();
        let err = StorageError::connection_with_source("pool exhausted", inner);
        let source = err.source().expect("source exists");
        assert_eq!(source.to_string(), "Operation timeout");
    }

    #[test]
    fn test_cache_error_display() {
        let err = CacheError::CapacityExhausted { capacity: 64 };
        assert_eq!(
            err.to_string(),
            "Cache capacity exhausted: 64 entries are protected from eviction"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::BelowMinimum {
            field: "capacity",
            value: "0".to_owned(),
            min: "1".to_owned(),
        };
        assert_eq!(err.to_string(), "capacity must be at least 1 (got 0)");

        let err = ConfigError::InvalidRelation {
            field: "trim_target",
            relation: "must be less than capacity (10)".to_owned(),
            value: "10".to_owned(),
        };
        assert_eq!(err.to_string(), "trim_target must be less than capacity (10) (got 10)");
    }
}
