//! # Store Error Types
//!
//! Error types for unit-of-work operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  StoreError (this module)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CoreError::Store / CoreError::CommitFailed ← engine classification    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  API layer renders a user-facing message                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use cafe_core::CoreError;

/// Ledger store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found for an update/delete that requires it to exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Insert collided with an existing id.
    #[error("Duplicate {entity}: {id} already exists")]
    Duplicate { entity: String, id: String },

    /// The unit of work could not be committed.
    #[error("Commit failed: {0}")]
    CommitFailed(String),

    /// Internal store failure.
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Duplicate error.
    pub fn duplicate(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::Duplicate {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Store failures surface to engine callers as `CoreError`.
///
/// Commit failures keep their own variant so batch settlement can
/// report the all-or-nothing outcome precisely; everything else is a
/// generic store error.
impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CommitFailed(msg) => CoreError::CommitFailed(msg),
            other => CoreError::Store(other.to_string()),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_failure_maps_to_commit_failed() {
        let core: CoreError = StoreError::CommitFailed("disk full".to_string()).into();
        assert!(matches!(core, CoreError::CommitFailed(_)));
    }

    #[test]
    fn test_other_store_errors_map_to_store() {
        let core: CoreError = StoreError::not_found("Sale", "s-1").into();
        assert!(matches!(core, CoreError::Store(_)));
        assert_eq!(core.to_string(), "Store error: Sale not found: s-1");
    }
}
