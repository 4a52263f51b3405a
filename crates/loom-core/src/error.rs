//! Domain error types.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// What a conflicting write collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// The voter already has a vote recorded on this proposal or oracle.
    AlreadyVoted,
    /// An open proposal of the same type already exists for the target.
    DuplicateOpenProposal,
    /// The decision was resolved before this write landed.
    AlreadyResolved,
}

impl ConflictKind {
    /// Machine-readable name of the conflict.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyVoted => "already_voted",
            Self::DuplicateOpenProposal => "duplicate_open_proposal",
            Self::AlreadyResolved => "already_resolved",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::AlreadyVoted => "you have already voted on this",
            Self::DuplicateOpenProposal => "a proposal of this type is already pending",
            Self::AlreadyResolved => "this decision has already been resolved",
        };
        f.write_str(message)
    }
}

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An entity was not found in the game.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity that was looked up.
        entity: &'static str,
        /// The identifier that was looked up.
        id: Uuid,
    },

    /// A uniqueness or resolution conflict detected by the store.
    #[error("conflict: {0}")]
    Conflict(ConflictKind),

    /// Input that can never be valid.
    #[error("validation error: {0}")]
    Validation(String),

    /// The operation is valid in general but not in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The acting user may not perform this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Shorthand for [`DomainError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Shorthand for [`DomainError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for [`DomainError::InvalidState`].
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Shorthand for [`DomainError::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}
