//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
///
/// Errors split into two classes. Fatal errors ([`StoreError::is_fatal`])
/// mean the store can no longer be used at all. Every other error is a
/// rejection of one operation and leaves the store usable.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Another process holds the store's lock.
    #[error("store locked: another process has exclusive access")]
    Locked,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Persisted state could not be read or written.
    #[error("corrupted store state: {0}")]
    Corrupted(String),

    /// The store refused the operation.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The collection already exists.
    #[error("collection already exists: {0}")]
    NamespaceExists(String),

    /// The collection does not exist.
    #[error("collection not found: {0}")]
    NamespaceNotFound(String),

    /// An index definition conflicts with an existing index.
    #[error("index conflict on {collection}: {message}")]
    IndexConflict {
        /// Collection name.
        collection: String,
        /// Description of the conflict.
        message: String,
    },

    /// A unique index would be violated.
    #[error("duplicate key in {collection} for index {index}")]
    DuplicateKey {
        /// Collection name.
        collection: String,
        /// Index name.
        index: String,
    },

    /// A document failed its collection's validator.
    #[error("document failed validation in {collection}: {message}")]
    ValidationFailed {
        /// Collection name.
        collection: String,
        /// Joined violations.
        message: String,
    },
}

impl StoreError {
    /// Creates a rejection error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Creates an index conflict error.
    pub fn index_conflict(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IndexConflict {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Returns true if the store is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_)
                | StoreError::Locked
                | StoreError::Io(_)
                | StoreError::Corrupted(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors() {
        assert!(StoreError::unavailable("connection refused").is_fatal());
        assert!(StoreError::Locked.is_fatal());
        assert!(StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk")).is_fatal());
        assert!(!StoreError::rejected("not authorized").is_fatal());
        assert!(!StoreError::NamespaceExists("games".into()).is_fatal());
        assert!(!StoreError::index_conflict("games", "spec differs").is_fatal());
    }

    #[test]
    fn error_display() {
        let err = StoreError::DuplicateKey {
            collection: "players".into(),
            index: "ux_players_username".into(),
        };
        assert_eq!(
            err.to_string(),
            "duplicate key in players for index ux_players_username"
        );
    }
}
