//! Domain error model.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every failure the accounting engine can raise is one of these variants. The
/// HTTP layer owns the mapping to status codes; nothing here knows about
/// transports.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced wallet or user does not exist (or is soft-deleted).
    #[error("{0} not found")]
    NotFound(String),

    /// The write would duplicate an existing record, or lost an optimistic
    /// concurrency race.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The target is in a state that does not permit the operation
    /// (e.g. a blocked wallet).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A debit exceeds the available balance.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientFunds { available: Decimal, requested: Decimal },

    /// Malformed or out-of-range input (non-positive amount, missing id).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An identifier failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The caller is known but not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The caller could not be identified.
    #[error("unauthorized")]
    Unauthorized,

    /// The backing store failed for reasons unrelated to the request.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn insufficient_funds(available: Decimal, requested: Decimal) -> Self {
        Self::InsufficientFunds {
            available,
            requested,
        }
    }
}
