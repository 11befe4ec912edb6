use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;
use tracing::info;

use nt_pack::PackStore;
use nt_types::RepositoryRef;
use nt_wal::{WalConfig, WriteAheadLog};

use crate::error::{OpsError, OpsResult};

/// A registered repository with its open log and pack directory.
pub struct Repository {
    reference: RepositoryRef,
    wal: WriteAheadLog,
    packs: PackStore,
    /// Serializes appends and flushes for this repository.
    gate: Arc<Mutex<()>>,
}

impl Repository {
    fn open(reference: RepositoryRef, wal_config: WalConfig) -> OpsResult<Self> {
        let wal = WriteAheadLog::open(&reference.wal_dir(), wal_config)?;
        let packs = PackStore::new(reference.operations_dir());
        Ok(Self {
            reference,
            wal,
            packs,
            gate: Arc::new(Mutex::new(())),
        })
    }

    pub fn slug(&self) -> &str {
        &self.reference.slug
    }

    /// Normalized repository root.
    pub fn path(&self) -> &Path {
        &self.reference.path
    }

    pub fn reference(&self) -> &RepositoryRef {
        &self.reference
    }

    pub fn wal(&self) -> &WriteAheadLog {
        &self.wal
    }

    pub fn packs(&self) -> &PackStore {
        &self.packs
    }

    pub(crate) fn gate(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.gate)
    }
}

/// Maps repository slugs to their on-disk location.
///
/// Registration eagerly creates `<root>/.nt/operations/wal/` so later
/// appends and flushes can rely on the directory existing.
pub struct RepositoryRegistry {
    repositories: RwLock<HashMap<String, Arc<Repository>>>,
    wal_config: WalConfig,
}

impl RepositoryRegistry {
    pub fn new(wal_config: WalConfig) -> Self {
        Self {
            repositories: RwLock::new(HashMap::new()),
            wal_config,
        }
    }

    /// Register (or re-register) a repository. Returns its normalized root.
    ///
    /// Registering a slug again with the same path keeps the existing handle;
    /// a different path replaces it.
    pub fn register(&self, reference: &RepositoryRef) -> OpsResult<PathBuf> {
        let reference = reference.normalized();
        if let Some(existing) = self.get(&reference.slug) {
            if existing.path() == reference.path {
                return Ok(reference.path);
            }
        }

        let repository = Arc::new(Repository::open(reference.clone(), self.wal_config.clone())?);
        self.repositories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(reference.slug.clone(), repository);

        info!(slug = %reference.slug, path = %reference.path.display(), "repository registered");
        Ok(reference.path)
    }

    /// Forget a repository. Files on disk are left untouched.
    pub fn unregister(&self, slug: &str) -> Option<RepositoryRef> {
        self.repositories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(slug)
            .map(|repo| repo.reference.clone())
    }

    pub fn resolve(&self, slug: &str) -> OpsResult<Arc<Repository>> {
        self.get(slug)
            .ok_or_else(|| OpsError::RepositoryNotRegistered(slug.to_string()))
    }

    pub fn resolve_path(&self, slug: &str) -> OpsResult<PathBuf> {
        Ok(self.resolve(slug)?.path().to_path_buf())
    }

    /// Registered slugs, sorted.
    pub fn slugs(&self) -> Vec<String> {
        let map = self.repositories.read().unwrap_or_else(PoisonError::into_inner);
        let mut slugs: Vec<String> = map.keys().cloned().collect();
        slugs.sort();
        slugs
    }

    pub fn len(&self) -> usize {
        self.repositories.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, slug: &str) -> Option<Arc<Repository>> {
        self.repositories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(slug)
            .cloned()
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new(WalConfig::default())
    }
}
