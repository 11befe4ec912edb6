use std::path::Path;

use serde::{Deserialize, Serialize};

use nt_pack::codec::DEFAULT_LEVEL;
use nt_pack::ObjectData;
use nt_types::RepositoryRef;
use nt_wal::{SyncMode, WalConfig, DEFAULT_MAX_WAL_SIZE};

use crate::error::{OpsError, OpsResult};

/// Settings for the operations subsystem.
///
/// ```toml
/// max_wal_size = 1048576
/// sync_mode = "every_write"
///
/// [[repositories]]
/// slug = "main"
/// path = "~/notes"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub max_wal_size: u64,
    pub sync_mode: SyncMode,
    pub compression_level: i32,
    pub repositories: Vec<RepositoryRef>,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            max_wal_size: DEFAULT_MAX_WAL_SIZE,
            sync_mode: SyncMode::default(),
            compression_level: DEFAULT_LEVEL,
            repositories: Vec::new(),
        }
    }
}

impl OpsConfig {
    pub fn from_toml_str(s: &str) -> OpsResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| OpsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> OpsResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> OpsResult<()> {
        if !(1..=22).contains(&self.compression_level) {
            return Err(OpsError::Config(format!(
                "compression_level must be within 1..=22, got {}",
                self.compression_level
            )));
        }
        let mut slugs: Vec<&str> = self.repositories.iter().map(|r| r.slug.as_str()).collect();
        slugs.sort_unstable();
        if let Some(dup) = slugs.windows(2).find(|w| w[0] == w[1]) {
            return Err(OpsError::Config(format!("duplicate repository slug: {}", dup[0])));
        }
        if let Some(empty) = self.repositories.iter().find(|r| r.slug.trim().is_empty()) {
            return Err(OpsError::Config(format!(
                "repository at {} has an empty slug",
                empty.path.display()
            )));
        }
        Ok(())
    }

    pub fn wal_config(&self) -> WalConfig {
        WalConfig {
            max_wal_size: self.max_wal_size,
            sync_mode: self.sync_mode,
        }
    }

    pub fn codec(&self) -> ObjectData {
        ObjectData::with_level(self.compression_level)
    }
}
