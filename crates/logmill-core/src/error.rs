//! Error types for logmill-core.

use thiserror::Error;

/// Errors surfaced by the analytics and ingestion operations.
#[derive(Debug, Error)]
pub enum Error {
    // Request validation
    #[error("invalid identifier: {value:?}")]
    InvalidIdentifier { value: String },

    #[error("unsupported filter operator: {operator:?}")]
    UnsupportedOperator { operator: String },

    #[error("operator `{operator}` on field `{field}` {reason}")]
    InvalidOperand {
        field: String,
        operator: String,
        reason: String,
    },

    #[error("app {app_id} does not exist for the requesting owner")]
    AppNotOwned { app_id: String },

    // Store / runtime
    #[error("log store failure")]
    Infrastructure(#[source] StoreError),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Cancelled => Error::Cancelled,
            other => Error::Infrastructure(other),
        }
    }
}

/// Errors raised by a [`LogStore`](crate::store::LogStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("log store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("log store rejected the request: {reason}")]
    Rejected { reason: String },

    #[error("log store request cancelled")]
    Cancelled,
}

impl StoreError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// A single raw line that could not be parsed in the requested format.
///
/// Never fatal: ingestion keeps the raw text and stores the record with no
/// structured data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed {format} input: {reason}")]
    Malformed { format: &'static str, reason: String },

    #[error("line does not match the {format} grammar")]
    NoMatch { format: &'static str },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
