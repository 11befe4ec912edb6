use std::path::{Path, PathBuf};

use nt_types::Operation;

use crate::error::{PackError, PackResult};
use crate::writer::PackFile;

/// Reads a pack file from disk and decodes its objects.
pub struct PackReader {
    path: PathBuf,
    pack: PackFile,
}

impl PackReader {
    /// Open a pack file. The file stem must match the pack's own oid.
    pub fn open(path: &Path) -> PackResult<Self> {
        let bytes = std::fs::read(path)?;
        let reader = Self::from_bytes(path, &bytes)?;

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if stem != reader.pack.oid.as_str() {
            return Err(PackError::CorruptPack {
                path: path.to_path_buf(),
                reason: format!("file name does not match pack oid {}", reader.pack.oid),
            });
        }
        Ok(reader)
    }

    /// Parse a pack document already in memory.
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> PackResult<Self> {
        let pack: PackFile = serde_json::from_slice(bytes).map_err(|e| PackError::CorruptPack {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            pack,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pack(&self) -> &PackFile {
        &self.pack
    }

    pub fn object_count(&self) -> usize {
        self.pack.object_count()
    }

    /// Decode every object, in pack order.
    pub fn operations(&self) -> PackResult<Vec<Operation>> {
        self.pack
            .objects
            .iter()
            .map(|object| object.decode_operation())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_json() {
        let err = PackReader::from_bytes(Path::new("x.pack"), b"objects: []").err().unwrap();
        assert!(matches!(err, PackError::CorruptPack { .. }));
    }

    #[test]
    fn rejects_missing_objects() {
        let doc = br#"{"oid":"0123456789abcdef0123456789abcdef01234567","ctime":"2024-01-01T00:00:00.000Z"}"#;
        assert!(PackReader::from_bytes(Path::new("x.pack"), doc).is_err());
    }

    #[test]
    fn open_checks_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ffffffffffffffffffffffffffffffffffffffff.pack");
        let doc = br#"{"oid":"0123456789abcdef0123456789abcdef01234567","ctime":"2024-01-01T00:00:00.000Z","objects":[]}"#;
        std::fs::write(&path, doc).unwrap();

        let err = PackReader::open(&path).err().unwrap();
        assert!(matches!(err, PackError::CorruptPack { .. }));
    }
}
