use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nt_types::operation::iso8601;
use nt_types::{Oid, Operation};

use crate::codec::ObjectData;
use crate::error::PackResult;

/// Kind of object stored in a pack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackObjectKind {
    Operation,
}

/// One entry of a pack file.
///
/// `data` holds the full object, encoded with [`ObjectData`]. The remaining
/// fields are plain-text metadata so a pack can be skimmed without decoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackObject {
    pub oid: Oid,
    pub kind: PackObjectKind,
    #[serde(with = "iso8601")]
    pub ctime: DateTime<Utc>,
    pub description: String,
    pub data: String,
}

impl PackObject {
    /// Encode an operation as a pack entry.
    pub fn from_operation(op: &Operation, codec: &ObjectData) -> PackResult<Self> {
        Ok(Self {
            oid: op.oid.clone(),
            kind: PackObjectKind::Operation,
            ctime: op.timestamp,
            description: op.description(),
            data: codec.encode(op)?,
        })
    }

    /// Decode the entry's payload back into an operation.
    pub fn decode_operation(&self) -> PackResult<Operation> {
        ObjectData::new().decode(&self.data)
    }
}
