//! Error types for the Worldkeeper core.

use thiserror::Error;

/// Errors surfaced by store handlers and the `WorldKeeper` facade.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldError {
    /// A world, status, engine or participant record is missing
    #[error("Invalid {kind} ID: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The operation cannot proceed yet (e.g. encounter participants absent)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Command name or arguments do not match any known input shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Join/leave attempted without an identity
    #[error("You must be logged in to join the world.")]
    NotLoggedIn,

    /// Underlying sled failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Record (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Transaction conflict; sled retries the handler, callers never see it
    #[error("Transaction conflict")]
    Conflict,
}

impl WorldError {
    /// Creates a not-found error.
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Creates a precondition error.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Creates an invalid-input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<sled::Error> for WorldError {
    fn from(e: sled::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for WorldError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<sled::transaction::UnabortableTransactionError> for WorldError {
    fn from(e: sled::transaction::UnabortableTransactionError) -> Self {
        match e {
            sled::transaction::UnabortableTransactionError::Conflict => Self::Conflict,
            sled::transaction::UnabortableTransactionError::Storage(e) => Self::Storage(e.to_string()),
        }
    }
}

pub type WorldResult<T> = Result<T, WorldError>;
