use std::path::PathBuf;

use tracing::{debug, info, warn};

use nt_pack::{ObjectData, PackFile, PackStore, PackWriter};
use nt_types::{Oid, Operation};
use nt_wal::{WalSegment, WriteAheadLog};

use crate::error::OpsResult;

/// One pack produced by a flush.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackSummary {
    pub oid: Oid,
    pub path: PathBuf,
    pub object_count: usize,
    /// WAL segment the objects came from.
    pub source: PathBuf,
}

/// Outcome of a flush, one entry per consumed WAL segment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub packs: Vec<PackSummary>,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    pub fn operation_count(&self) -> usize {
        self.packs.iter().map(|p| p.object_count).sum()
    }
}

/// Compacts pending WAL segments into pack files.
///
/// A flush runs in three phases:
///
/// 1. read and parse every segment; a malformed line aborts before anything
///    is written
/// 2. write one pack per non-empty segment; if a write fails, packs from this
///    flush are removed again and the logs stay as they were
/// 3. consume the segments (rotated ones deleted, the active one emptied),
///    oldest first so the active segment goes last
///
/// Phase 3 is not atomic. If consuming a segment fails, or the process dies
/// during it, the packs stay written and the segments not yet consumed are
/// packed again by the next flush. Operations may then appear in two packs;
/// none are lost.
#[derive(Clone, Copy, Debug, Default)]
pub struct Compactor {
    codec: ObjectData,
}

impl Compactor {
    pub fn new(codec: ObjectData) -> Self {
        Self { codec }
    }

    pub fn flush(&self, wal: &WriteAheadLog, packs: &PackStore) -> OpsResult<FlushReport> {
        let mut pending: Vec<(WalSegment, Vec<Operation>)> = Vec::new();
        for segment in wal.segments()? {
            let ops = wal.read_segment(&segment)?;
            if !ops.is_empty() {
                pending.push((segment, ops));
            }
        }
        if pending.is_empty() {
            debug!(dir = %wal.dir().display(), "no pending operations to flush");
            return Ok(FlushReport::default());
        }

        let mut sealed: Vec<(WalSegment, PackFile)> = Vec::with_capacity(pending.len());
        for (segment, ops) in pending {
            let mut writer = PackWriter::new(self.codec);
            for op in &ops {
                writer.add_operation(op)?;
            }
            sealed.push((segment, writer.finish()));
        }

        let mut report = FlushReport::default();
        for (segment, pack) in &sealed {
            match packs.write(pack) {
                Ok(path) => report.packs.push(PackSummary {
                    oid: pack.oid.clone(),
                    path,
                    object_count: pack.object_count(),
                    source: segment.path.clone(),
                }),
                Err(e) => {
                    rollback(packs, &report);
                    return Err(e.into());
                }
            }
        }

        for (segment, _) in &sealed {
            wal.consume(segment)?;
        }
        wal.ensure_active()?;

        info!(
            packs = report.packs.len(),
            operations = report.operation_count(),
            dir = %packs.root().display(),
            "WAL flushed to pack files"
        );
        Ok(report)
    }
}

fn rollback(packs: &PackStore, report: &FlushReport) {
    for summary in &report.packs {
        if let Err(e) = packs.remove(&summary.oid) {
            warn!(oid = %summary.oid, error = %e, "failed to remove pack during rollback");
        }
    }
    if !report.packs.is_empty() {
        warn!(removed = report.packs.len(), "flush aborted; partial packs removed");
    }
}
