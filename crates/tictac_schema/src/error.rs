//! Error types for schema declarations and the data model.

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised by declaration checks and data model operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Index key specification is malformed.
    #[error("invalid key spec: {message}")]
    InvalidKeySpec {
        /// Description of the problem.
        message: String,
    },

    /// Index options contradict each other or the key spec.
    #[error("conflicting index options: {message}")]
    ConflictingOptions {
        /// Description of the conflict.
        message: String,
    },

    /// A validator rule is malformed.
    #[error("invalid rule at {path}: {message}")]
    InvalidRule {
        /// Path of the offending rule inside the validator tree.
        path: String,
        /// Description of the problem.
        message: String,
    },

    /// The same collection is declared twice.
    #[error("collection declared more than once: {name}")]
    DuplicateCollection {
        /// Collection name.
        name: String,
    },

    /// Two indexes on one collection resolve to the same name.
    #[error("index {name} declared more than once on {collection}")]
    DuplicateIndex {
        /// Collection name.
        collection: String,
        /// Resolved index name.
        name: String,
    },

    /// Username does not satisfy the length rule.
    #[error("invalid username {username:?}: must be 3 to 64 characters")]
    InvalidUsername {
        /// The rejected username.
        username: String,
    },

    /// Email does not have a `local@domain` shape.
    #[error("invalid email {email:?}")]
    InvalidEmail {
        /// The rejected email.
        email: String,
    },

    /// Both seats carry the same label.
    #[error("both seats are held by {label:?}")]
    SameSeatLabels {
        /// The repeated label.
        label: String,
    },

    /// A move breaks the rules of play.
    #[error("illegal move: {message}")]
    IllegalMove {
        /// Description of the violation.
        message: String,
    },

    /// A stored game contradicts its own move list.
    #[error("inconsistent game: {message}")]
    InconsistentGame {
        /// Description of the inconsistency.
        message: String,
    },

    /// A score record disagrees with the completed games.
    #[error("score for {user} records {recorded} results but {expected} completed games")]
    InconsistentScore {
        /// Aggregation key.
        user: String,
        /// `wins + losses + draws` on the record.
        recorded: u64,
        /// Completed games the user took part in.
        expected: u64,
    },
}

impl SchemaError {
    /// Creates an invalid key spec error.
    pub fn invalid_key_spec(message: impl Into<String>) -> Self {
        Self::InvalidKeySpec {
            message: message.into(),
        }
    }

    /// Creates a conflicting options error.
    pub fn conflicting_options(message: impl Into<String>) -> Self {
        Self::ConflictingOptions {
            message: message.into(),
        }
    }

    /// Creates an invalid rule error.
    pub fn invalid_rule(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an illegal move error.
    pub fn illegal_move(message: impl Into<String>) -> Self {
        Self::IllegalMove {
            message: message.into(),
        }
    }

    /// Creates an inconsistent game error.
    pub fn inconsistent_game(message: impl Into<String>) -> Self {
        Self::InconsistentGame {
            message: message.into(),
        }
    }

    /// Returns true if this error describes a malformed declaration.
    ///
    /// Declaration errors are caught before any store call is made.
    pub fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidKeySpec { .. }
                | Self::ConflictingOptions { .. }
                | Self::InvalidRule { .. }
                | Self::DuplicateCollection { .. }
                | Self::DuplicateIndex { .. }
        )
    }
}
