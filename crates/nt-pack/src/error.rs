use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage at which decoding an object failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeStage {
    Base64,
    Decompress,
    Parse,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Base64 => "base64",
            Self::Decompress => "decompress",
            Self::Parse => "parse",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PackError {
    #[error("decode failed ({stage}): {reason}")]
    Decode { stage: DecodeStage, reason: String },

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("pack file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("corrupt pack {}: {reason}", .path.display())]
    CorruptPack { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PackResult<T> = Result<T, PackError>;
