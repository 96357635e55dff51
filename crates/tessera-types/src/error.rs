use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid blob identifier: {0:?}")]
    InvalidBlobId(String),

    #[error("unknown content kind code: {0}")]
    UnknownContentKind(i64),

    #[error("unknown layout policy: {0:?}")]
    UnknownLayoutPolicy(String),
}
