//! Foundation types for NoteWriter operations.
//!
//! Every other `nt-*` crate depends on `nt-types`. It defines the identifiers
//! and records that flow through the operation log and pack storage.
//!
//! # Key Types
//!
//! - [`Oid`]: 40-character lowercase hex object identifier
//! - [`Operation`]: a single user-initiated mutation awaiting synchronization
//! - [`RepositoryRef`]: slug and root path of a note repository

pub mod error;
pub mod oid;
pub mod operation;
pub mod repository;

pub use error::TypeError;
pub use oid::Oid;
pub use operation::Operation;
pub use repository::{normalize_path, RepositoryRef, OPERATIONS_DIR, WAL_DIR};
