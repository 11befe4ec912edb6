//! Write-ahead log for NoteWriter operations.
//!
//! Each repository keeps one active segment (`wal.json`) that receives
//! appends, plus zero or more rotated segments (`wal.<N>.json`) closed once
//! the active segment grew past the configured size. Every segment is JSON
//! lines: one [`nt_types::Operation`] per line.

pub mod error;
pub mod segment;
pub mod wal;

pub use error::{Result, WalError};
pub use segment::{SegmentKind, WalSegment, ACTIVE_FILE};
pub use wal::{SyncMode, WalConfig, WriteAheadLog, DEFAULT_MAX_WAL_SIZE};
