//! Error types for reconciliation.

use crate::report::Target;
use thiserror::Error;
use tictac_store::StoreError;

/// Result type for reconciliation.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors that end a reconciliation pass.
///
/// Per-item failures are not errors: they are recorded in the report.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The store became unusable.
    #[error("lost the store while reconciling {target}: {source}")]
    Connectivity {
        /// Item being reconciled when the store failed.
        target: Target,
        /// The store's error.
        #[source]
        source: StoreError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_display_names_target() {
        let err = ReconcileError::Connectivity {
            target: Target::collection("games"),
            source: StoreError::unavailable("connection refused"),
        };
        assert_eq!(
            err.to_string(),
            "lost the store while reconciling collection games: \
             store unavailable: connection refused"
        );
    }
}
