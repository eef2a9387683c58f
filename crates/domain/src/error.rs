//! Domain error types.

use store::StoreError;
use thiserror::Error;

/// Errors that can occur during inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// No record matches an identity-based lookup.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The request itself is malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation violates a lifecycle precondition.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A concurrent writer kept winning a race for the same row.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A uniqueness invariant has already been broken in storage.
    #[error("Consistency violation: {0}")]
    Consistency(String),

    /// The persistence layer failed.
    #[error("Storage error: {0}")]
    Storage(#[source] StoreError),
}

impl InventoryError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        InventoryError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true for failures the caller can act on (bad input, wrong state,
    /// missing record, lost race).
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            InventoryError::Consistency(_) | InventoryError::Storage(_)
        )
    }
}

impl From<StoreError> for InventoryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UnknownColumn { .. } => InventoryError::InvalidArgument(e.to_string()),
            StoreError::AmbiguousMatch { .. } => InventoryError::Consistency(e.to_string()),
            StoreError::UniqueViolation { .. } => InventoryError::Conflict(e.to_string()),
            other => InventoryError::Storage(other),
        }
    }
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
