use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use nt_types::Oid;

use crate::error::{PackError, PackResult};
use crate::reader::PackReader;
use crate::writer::PackFile;

/// File extension of pack files.
pub const PACK_EXTENSION: &str = "pack";

/// Content-addressed pack directory: `<root>/<oid[0..2]>/<oid>.pack`.
#[derive(Clone, Debug)]
pub struct PackStore {
    root: PathBuf,
}

impl PackStore {
    /// `root` is the repository's operations directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a pack with this oid lives at.
    pub fn pack_path(&self, oid: &Oid) -> PathBuf {
        self.root
            .join(oid.prefix())
            .join(format!("{oid}.{PACK_EXTENSION}"))
    }

    /// Durably write a pack. Never overwrites an existing pack.
    ///
    /// The document is written to a temporary file in the target directory,
    /// synced, then linked into place so readers never see a partial pack.
    pub fn write(&self, pack: &PackFile) -> PackResult<PathBuf> {
        let path = self.pack_path(&pack.oid);
        if path.exists() {
            return Err(PackError::AlreadyExists(path));
        }
        let dir = path
            .parent()
            .ok_or_else(|| PackError::Serialization(format!("no parent for {}", path.display())))?;
        std::fs::create_dir_all(dir)?;

        let bytes = pack.to_bytes()?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == ErrorKind::AlreadyExists {
                PackError::AlreadyExists(path.clone())
            } else {
                PackError::Io(e.error)
            }
        })?;

        debug!(oid = %pack.oid, objects = pack.object_count(), path = %path.display(), "pack written");
        Ok(path)
    }

    /// Delete a pack. Returns `true` if it existed.
    pub fn remove(&self, oid: &Oid) -> PackResult<bool> {
        match std::fs::remove_file(self.pack_path(oid)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn open(&self, oid: &Oid) -> PackResult<PackReader> {
        PackReader::open(&self.pack_path(oid))
    }

    /// All pack files under two-character directories, sorted by path.
    pub fn list(&self) -> PackResult<Vec<PathBuf>> {
        let mut packs = Vec::new();
        if !self.root.exists() {
            return Ok(packs);
        }
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let is_prefix_dir = entry.file_type()?.is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .map(|name| name.len() == 2 && name.bytes().all(|b| b.is_ascii_hexdigit()))
                    .unwrap_or(false);
            if !is_prefix_dir {
                continue;
            }
            for file in std::fs::read_dir(entry.path())? {
                let path = file?.path();
                if path.extension().map(|e| e == PACK_EXTENSION).unwrap_or(false) {
                    packs.push(path);
                }
            }
        }
        packs.sort();
        Ok(packs)
    }
}
