use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use nt_pack::PackStore;
use nt_types::{Operation, RepositoryRef};

use crate::compactor::{Compactor, FlushReport};
use crate::config::OpsConfig;
use crate::error::{OpsError, OpsResult};
use crate::registry::{Repository, RepositoryRegistry};

/// Entry point for recording and compacting operations.
///
/// All filesystem work for a repository runs on the blocking pool while that
/// repository's gate is held. The gate guard moves into the blocking task, so
/// it is only released once the I/O has finished, even if the caller stops
/// awaiting. Different repositories never wait on each other.
pub struct OperationsManager {
    registry: RepositoryRegistry,
    compactor: Compactor,
    config: OpsConfig,
}

impl OperationsManager {
    pub fn new(config: OpsConfig) -> Self {
        Self {
            registry: RepositoryRegistry::new(config.wal_config()),
            compactor: Compactor::new(config.codec()),
            config,
        }
    }

    /// Build a manager and register every repository listed in `config`.
    pub fn from_config(config: OpsConfig) -> OpsResult<Self> {
        config.validate()?;
        let manager = Self::new(config);
        for repository in &manager.config.repositories {
            manager.registry.register(repository)?;
        }
        Ok(manager)
    }

    pub fn config(&self) -> &OpsConfig {
        &self.config
    }

    pub fn registry(&self) -> &RepositoryRegistry {
        &self.registry
    }

    /// Register a repository and create its operations directory.
    pub fn register(&self, repository: &RepositoryRef) -> OpsResult<PathBuf> {
        self.registry.register(repository)
    }

    pub fn resolve_path(&self, slug: &str) -> OpsResult<PathBuf> {
        self.registry.resolve_path(slug)
    }

    /// Pack directory of a registered repository.
    pub fn packs(&self, slug: &str) -> OpsResult<PackStore> {
        Ok(self.registry.resolve(slug)?.packs().clone())
    }

    /// Append one operation to the repository's WAL.
    pub async fn append(&self, slug: &str, op: Operation) -> OpsResult<u64> {
        let repository = self.registry.resolve(slug)?;
        let offset = run_exclusive(repository, move |repo| Ok(repo.wal().append(&op)?)).await?;
        debug!(slug, offset, "operation recorded");
        Ok(offset)
    }

    /// Compact all pending operations of a repository into pack files.
    pub async fn flush(&self, slug: &str) -> OpsResult<FlushReport> {
        let repository = self.registry.resolve(slug)?;
        let compactor = self.compactor;
        run_exclusive(repository, move |repo| compactor.flush(repo.wal(), repo.packs())).await
    }

    /// Flush every registered repository, one after another.
    ///
    /// Stops at the first failure; repositories flushed before it stay
    /// flushed.
    pub async fn flush_all(&self) -> OpsResult<Vec<(String, FlushReport)>> {
        let mut reports = Vec::new();
        for slug in self.registry.slugs() {
            let report = self.flush(&slug).await?;
            reports.push((slug, report));
        }
        Ok(reports)
    }

    /// Operations waiting in the WAL, in append order.
    pub async fn pending(&self, slug: &str) -> OpsResult<Vec<Operation>> {
        let repository = self.registry.resolve(slug)?;
        run_exclusive(repository, |repo| Ok(repo.wal().recover()?)).await
    }

    /// Number of operations waiting in the WAL.
    pub async fn pending_count(&self, slug: &str) -> OpsResult<usize> {
        let repository = self.registry.resolve(slug)?;
        run_exclusive(repository, |repo| Ok(repo.wal().pending_count()?)).await
    }
}

async fn run_exclusive<T, F>(repository: Arc<Repository>, work: F) -> OpsResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Repository) -> OpsResult<T> + Send + 'static,
{
    let guard = repository.gate().lock_owned().await;
    tokio::task::spawn_blocking(move || {
        let _guard = guard;
        work(&repository)
    })
    .await
    .map_err(|e| OpsError::Task(e.to_string()))?
}
