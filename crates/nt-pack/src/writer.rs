use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use nt_types::operation::iso8601;
use nt_types::{Oid, Operation};

use crate::codec::ObjectData;
use crate::entry::PackObject;
use crate::error::{PackError, PackResult};

/// An immutable batch of encoded objects.
///
/// Serialized as a pretty-printed JSON document:
///
/// ```text
/// { "oid": "…", "ctime": "…", "objects": [ { "kind": "operation", "data": "…", … } ] }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackFile {
    pub oid: Oid,
    #[serde(with = "iso8601")]
    pub ctime: DateTime<Utc>,
    pub objects: Vec<PackObject>,
}

impl PackFile {
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn to_bytes(&self) -> PackResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| PackError::Serialization(e.to_string()))
    }
}

/// Builds a pack file from operations, preserving insertion order.
pub struct PackWriter {
    codec: ObjectData,
    objects: Vec<PackObject>,
}

impl PackWriter {
    pub fn new(codec: ObjectData) -> Self {
        Self {
            codec,
            objects: Vec::new(),
        }
    }

    /// Encode and queue an operation.
    pub fn add_operation(&mut self, op: &Operation) -> PackResult<()> {
        self.objects.push(PackObject::from_operation(op, &self.codec)?);
        Ok(())
    }

    /// Number of objects queued.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Seal the pack under a freshly generated oid.
    pub fn finish(self) -> PackFile {
        self.finish_with_oid(Oid::generate())
    }

    /// Seal the pack under the given oid.
    pub fn finish_with_oid(self, oid: Oid) -> PackFile {
        PackFile {
            oid,
            ctime: Utc::now().trunc_subsecs(3),
            objects: self.objects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn ops(n: usize) -> Vec<Operation> {
        (0..n)
            .map(|i| Operation::new(format!("note-{i}"), "review-flashcard", json!({ "i": i })))
            .collect()
    }

    #[test]
    fn preserves_order() {
        let ops = ops(5);
        let mut writer = PackWriter::new(ObjectData::new());
        for op in &ops {
            writer.add_operation(op).unwrap();
        }
        assert_eq!(writer.len(), 5);

        let pack = writer.finish();
        let decoded: Vec<Operation> = pack
            .objects
            .iter()
            .map(|o| o.decode_operation().unwrap())
            .collect();
        assert_eq!(decoded, ops);
    }

    #[test]
    fn empty_writer() {
        let writer = PackWriter::new(ObjectData::new());
        assert!(writer.is_empty());
        assert_eq!(writer.finish().object_count(), 0);
    }

    #[test]
    fn document_shape() {
        let mut writer = PackWriter::new(ObjectData::new());
        for op in &ops(2) {
            writer.add_operation(op).unwrap();
        }
        let oid = Oid::from_content("pack");
        let pack = writer.finish_with_oid(oid.clone());
        let doc: Value = serde_json::from_slice(&pack.to_bytes().unwrap()).unwrap();

        assert_eq!(doc["oid"], json!(oid.as_str()));
        let objects = doc["objects"].as_array().unwrap();
        assert_eq!(objects.len(), 2);
        for object in objects {
            assert_eq!(object["kind"], json!("operation"));
            assert!(object["data"].is_string());
        }
    }
}
