//! Error types for the PetPal core library.
//!
//! Business-rule outcomes (`AlreadyExists`, `NoRecord`, `PreconditionFailed`,
//! `NameTooLong`, ...) live in the same enum as real failures so callers can
//! match on a single type, but [`PetpalError::is_rejection`] tells them apart.

use thiserror::Error;

use crate::actions::Rejection;
use crate::types::OwnerId;

/// Errors raised by a [`RecordStore`](crate::store::RecordStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store refuses writes.
    #[error("Store is read-only")]
    ReadOnly,
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Top-level error type for all PetPal operations.
#[derive(Error, Debug)]
pub enum PetpalError {
    /// The owner already has a pet.
    #[error("Owner {0} already has a pet")]
    AlreadyExists(OwnerId),

    /// The owner has no pet.
    #[error("Owner {0} has no pet")]
    NoRecord(OwnerId),

    /// The action's gameplay requirement was not met.
    #[error("Action rejected: {0}")]
    PreconditionFailed(Rejection),

    /// A new pet name exceeds the configured maximum length.
    #[error("Name too long: {len} characters (limit: {max})")]
    NameTooLong {
        /// Length of the rejected name, in characters.
        len: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// A new pet name is empty after trimming.
    #[error("Name must not be empty")]
    EmptyName,

    /// An action name that does not map to any known action.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The record store failed. Propagated unmodified.
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An internal invariant was violated.
    #[error("Internal consistency error: {0}")]
    Internal(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PetpalError {
    /// Whether this is an expected business outcome rather than a failure.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists(_)
                | Self::NoRecord(_)
                | Self::PreconditionFailed(_)
                | Self::NameTooLong { .. }
                | Self::EmptyName
                | Self::UnknownAction(_)
        )
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, PetpalError>;

/// Result type alias for store backends.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
