use std::path::PathBuf;

use thiserror::Error;

use nt_pack::{DecodeStage, PackError};
use nt_wal::WalError;

#[derive(Debug, Error)]
pub enum OpsError {
    #[error("repository not registered: {0}")]
    RepositoryNotRegistered(String),

    #[error("malformed log {}:{line}: {reason}", .path.display())]
    MalformedLog {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("decode error ({stage}): {reason}")]
    Decode { stage: DecodeStage, reason: String },

    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("pack error: {0}")]
    Pack(PackError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Task(String),
}

impl From<WalError> for OpsError {
    fn from(err: WalError) -> Self {
        match err {
            WalError::Io(e) => Self::Filesystem(e),
            WalError::MalformedRecord { path, line, reason } => {
                Self::MalformedLog { path, line, reason }
            }
            WalError::Serialization(reason) => Self::Serialization(reason),
            partial @ WalError::PartialWrite { .. } => {
                Self::Filesystem(std::io::Error::other(partial.to_string()))
            }
        }
    }
}

impl From<PackError> for OpsError {
    fn from(err: PackError) -> Self {
        match err {
            PackError::Io(e) => Self::Filesystem(e),
            PackError::Decode { stage, reason } => Self::Decode { stage, reason },
            other => Self::Pack(other),
        }
    }
}

pub type OpsResult<T> = Result<T, OpsError>;
