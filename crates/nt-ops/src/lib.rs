//! Operation log manager for NoteWriter.
//!
//! Records user-initiated mutations (flashcard reviews, reminder
//! completions, annotations) in a per-repository write-ahead log and
//! compacts them on demand into immutable pack files for an external
//! synchronization tool.
//!
//! On-disk layout under each repository root:
//!
//! ```text
//! .nt/operations/
//!   wal/wal.json          active log, one JSON operation per line
//!   wal/wal.<N>.json      rotated logs, oldest first by N
//!   <xx>/<oid>.pack       pack files, xx = first two chars of oid
//! ```

pub mod compactor;
pub mod config;
pub mod error;
pub mod manager;
pub mod registry;

pub use compactor::{Compactor, FlushReport, PackSummary};
pub use config::OpsConfig;
pub use error::{OpsError, OpsResult};
pub use manager::OperationsManager;
pub use registry::{Repository, RepositoryRegistry};

// Re-export key types
pub use nt_pack::{ObjectData, PackReader, PackStore};
pub use nt_types::{Oid, Operation, RepositoryRef};
