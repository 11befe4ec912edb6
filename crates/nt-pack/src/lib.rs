//! Pack file format for NoteWriter operations.
//!
//! Compacted operations are stored as immutable JSON documents whose entries
//! carry each object compressed with zstd and encoded as base64 text.
//!
//! # Architecture
//!
//! - **ObjectData**: `base64(zstd(json(value)))` codec for a single object
//! - **PackWriter**: builds a [`PackFile`] from operations, in order
//! - **PackStore**: content-addressed layout `<xx>/<oid>.pack`, atomic writes
//! - **PackReader**: parses a pack from disk and decodes its operations

pub mod codec;
pub mod entry;
pub mod error;
pub mod reader;
pub mod store;
pub mod writer;

pub use codec::{decode, encode, ObjectData};
pub use entry::{PackObject, PackObjectKind};
pub use error::{DecodeStage, PackError, PackResult};
pub use reader::PackReader;
pub use store::{PackStore, PACK_EXTENSION};
pub use writer::{PackFile, PackWriter};
