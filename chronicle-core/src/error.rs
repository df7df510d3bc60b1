//! Error types for store operations.
//!
//! Uses thiserror for ergonomic error definition. Dangling references are
//! not errors: lookups return `None` and callers show a fallback label.

use crate::id::EntityId;
use crate::record::CollectionName;
use thiserror::Error;

/// Errors from reading or writing the persisted document.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported document version {found} (newest known is {supported})")]
    UnsupportedVersion { supported: u32, found: u32 },
}

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required field is missing or malformed.
    #[error("Invalid {collection}: field '{field}' {reason}")]
    Validation {
        collection: CollectionName,
        field: &'static str,
        reason: String,
    },

    /// Removal blocked by a record that still references the target.
    #[error("Cannot remove {id} from {collection}: still referenced by {child}.{field}")]
    Referenced {
        collection: CollectionName,
        id: EntityId,
        child: CollectionName,
        field: &'static str,
    },

    /// No record with this id exists in the collection.
    #[error("No record {id} in {collection}")]
    NotFound {
        collection: CollectionName,
        id: EntityId,
    },

    /// The persisted document could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistError),
}

/// Coarse error category for the UI boundary to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Persistence,
}

impl StoreError {
    /// Shorthand for a missing required field.
    pub fn missing(collection: CollectionName, field: &'static str) -> Self {
        StoreError::Validation {
            collection,
            field,
            reason: "is required".to_string(),
        }
    }

    /// Shorthand for a malformed field.
    pub fn invalid(
        collection: CollectionName,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        StoreError::Validation {
            collection,
            field,
            reason: reason.into(),
        }
    }

    /// Get the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation { .. } | StoreError::Referenced { .. } => ErrorKind::Validation,
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// A short message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Persistence(_) => "Changes may not be saved.".to_string(),
            other => other.to_string(),
        }
    }
}
