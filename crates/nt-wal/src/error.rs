use std::io;
use std::path::PathBuf;

/// Errors produced by the write-ahead log.
#[derive(Debug, thiserror::Error)]
pub enum WalError {
    /// I/O error while reading, writing or renaming a segment.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// An operation could not be serialized to a WAL line.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A failed append could not be rolled back; the segment may end with a
    /// partial line.
    #[error("append to {} failed ({source}) and truncation failed ({truncate}); log may hold a partial line", .path.display())]
    PartialWrite {
        path: PathBuf,
        source: io::Error,
        truncate: io::Error,
    },

    /// A pending line does not parse as an operation.
    #[error("malformed WAL record at {}:{line}: {reason}", .path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// Convenience alias used throughout the WAL crate.
pub type Result<T> = std::result::Result<T, WalError>;
