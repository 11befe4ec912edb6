use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid oid {value:?}: {reason}")]
    InvalidOid { value: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}
