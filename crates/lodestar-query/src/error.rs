//! Error types for proxy building, assembly and execution.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors raised by a session while executing rendered Cypher.
///
/// The proxy layer never inspects these; they are handed back to the caller
/// unchanged inside [`QueryError::Session`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors from building or running a query proxy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Malformed filter, count, exists or includes argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Association lookup failed or the operation needs an association proxy.
    #[error("Invalid association: {0}")]
    InvalidAssociation(String),

    /// An entity belongs to a different model than the association targets.
    #[error("Model mismatch: expected {expected}, found {found}")]
    ModelMismatch { expected: String, found: String },

    /// The session returned rows that do not have the expected shape.
    #[error("Unexpected result: {0}")]
    UnexpectedResult(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl QueryError {
    /// Shorthand for [`QueryError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Shorthand for [`QueryError::InvalidAssociation`].
    pub fn invalid_association(message: impl Into<String>) -> Self {
        Self::InvalidAssociation(message.into())
    }
}
