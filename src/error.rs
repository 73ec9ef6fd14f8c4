//! Error types for the cache adapter
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::cache::StatementKind;

/// Boxed error raised by a store session, carried through unchanged.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// == Cache Error Enum ==
/// Unified error type for the cache adapter.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A required argument was missing or empty
    #[error("Invalid argument: {0} must be provided")]
    InvalidArgument(&'static str),

    /// An expiration value falls outside the accepted range
    #[error("Argument out of range: {field}: {message}")]
    OutOfRange {
        field: &'static str,
        message: String,
    },

    /// A statement could not be prepared while constructing the cache
    #[error("Failed to prepare {statement} statement")]
    Preparation {
        statement: StatementKind,
        #[source]
        source: BoxError,
    },

    /// The store failed to execute a statement
    #[error(transparent)]
    Store(BoxError),

    /// A returned row did not carry the expected column
    #[error("Unexpected result: column '{column}' is missing or not a blob")]
    UnexpectedColumn { column: &'static str },

    /// The operation was cancelled before reaching the store
    #[error("Operation was cancelled")]
    Cancelled,

    /// The runtime backing the blocking API could not be started
    #[error("Failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// No cache implementation has been registered
    #[error("No distributed cache has been registered")]
    NotRegistered,
}

impl CacheError {
    /// Wraps a session error raised during execution.
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CacheError::Store(Box::new(err))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache adapter.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_store_error_is_transparent() {
        let err = CacheError::store(io::Error::new(io::ErrorKind::TimedOut, "read timeout"));
        assert_eq!(err.to_string(), "read timeout");
    }

    #[test]
    fn test_preparation_error_keeps_source() {
        let err = CacheError::Preparation {
            statement: StatementKind::Insert,
            source: Box::new(io::Error::new(io::ErrorKind::NotFound, "unconfigured table")),
        };
        assert_eq!(err.to_string(), "Failed to prepare insert statement");
        assert_eq!(err.source().unwrap().to_string(), "unconfigured table");
    }

    #[test]
    fn test_out_of_range_names_field() {
        let err = CacheError::OutOfRange {
            field: "absolute_expiration",
            message: "The absolute expiration value must be in the future.".to_string(),
        };
        assert!(err.to_string().contains("absolute_expiration"));
    }
}
