use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use nt_types::Operation;

use crate::error::{Result, WalError};
use crate::segment::{SegmentKind, WalSegment};

/// Default rotation threshold: 10 MiB.
pub const DEFAULT_MAX_WAL_SIZE: u64 = 10 * 1024 * 1024;

/// Flush/sync strategy for the WAL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every append (safest, highest latency).
    EveryWrite,
    /// Rely on OS page-cache buffering.
    #[default]
    OsDefault,
}

/// Configuration for the Write-Ahead Log.
#[derive(Clone, Debug)]
pub struct WalConfig {
    /// Size at which the active segment is rotated before the next append.
    pub max_wal_size: u64,
    /// Sync/flush strategy.
    pub sync_mode: SyncMode,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            max_wal_size: DEFAULT_MAX_WAL_SIZE,
            sync_mode: SyncMode::default(),
        }
    }
}

/// Mutable state shared by appends and rotation.
struct WalState {
    /// Highest rotation sequence number handed out so far.
    last_seq: u64,
}

/// Append-only operation log for one repository.
///
/// Operations are written as JSON lines to `wal.json`. Once that file has
/// reached `max_wal_size`, the next append first renames it to
/// `wal.<N>.json` (N strictly increasing) and starts a fresh active file, so
/// a rotated segment is never empty. Reading all segments oldest-first
/// yields operations in append order.
pub struct WriteAheadLog {
    dir: PathBuf,
    state: Mutex<WalState>,
    config: WalConfig,
}

impl WriteAheadLog {
    /// Open (or create) the WAL directory and its active segment.
    pub fn open(dir: &Path, config: WalConfig) -> Result<Self> {
        fs::create_dir_all(dir)?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(crate::segment::ACTIVE_FILE))?;

        let wal = Self {
            dir: dir.to_path_buf(),
            state: Mutex::new(WalState { last_seq: 0 }),
            config,
        };
        let last_seq = wal
            .segments()?
            .iter()
            .filter_map(|s| match s.kind {
                SegmentKind::Rotated(seq) => Some(seq),
                SegmentKind::Active => None,
            })
            .max()
            .unwrap_or(0);
        wal.lock().last_seq = last_seq;

        debug!(dir = %dir.display(), last_seq, "WAL opened");
        Ok(wal)
    }

    /// Append one operation. Returns the byte offset of its line in the
    /// active segment.
    ///
    /// The line is written with a single `write_all`; on failure the segment
    /// is truncated back to its previous length so no partial line remains.
    pub fn append(&self, op: &Operation) -> Result<u64> {
        let mut line = op
            .to_line()
            .map_err(|e| WalError::Serialization(e.to_string()))?;
        line.push('\n');

        let mut state = self.lock();
        let active = self.active_path();

        let mut offset = file_len(&active)?;
        if offset > 0 && offset >= self.config.max_wal_size {
            self.rotate_locked(&mut state)?;
            offset = 0;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&active)?;
        let written = file.write_all(line.as_bytes()).and_then(|()| {
            if self.config.sync_mode == SyncMode::EveryWrite {
                file.sync_all()
            } else {
                file.flush()
            }
        });
        if let Err(e) = written {
            return Err(abandon_append(&file, &active, offset, e));
        }

        debug!(oid = %op.oid, name = %op.name, offset, "WAL append");
        Ok(offset)
    }

    /// Close the active segment now if it holds any data.
    ///
    /// Returns the rotated segment, or `None` when the active segment was
    /// empty.
    pub fn rotate(&self) -> Result<Option<WalSegment>> {
        let mut state = self.lock();
        if file_len(&self.active_path())? == 0 {
            return Ok(None);
        }
        self.rotate_locked(&mut state).map(Some)
    }

    /// Every segment on disk: rotated ones by sequence number, then the
    /// active one.
    pub fn segments(&self) -> Result<Vec<WalSegment>> {
        let mut segments = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some(kind) = name.to_str().and_then(SegmentKind::from_file_name) {
                segments.push(WalSegment::new(&self.dir, kind));
            }
        }
        segments.sort_by(|a, b| a.kind.cmp(&b.kind));
        Ok(segments)
    }

    /// Parse every non-blank line of a segment.
    ///
    /// The first line that is not a valid operation fails the whole read
    /// with [`WalError::MalformedRecord`].
    pub fn read_segment(&self, segment: &WalSegment) -> Result<Vec<Operation>> {
        let content = match fs::read_to_string(&segment.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ops = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let op = Operation::from_line(line).map_err(|e| WalError::MalformedRecord {
                path: segment.path.clone(),
                line: index + 1,
                reason: e.to_string(),
            })?;
            ops.push(op);
        }
        Ok(ops)
    }

    /// All pending operations in append order.
    pub fn recover(&self) -> Result<Vec<Operation>> {
        let mut ops = Vec::new();
        for segment in self.segments()? {
            ops.extend(self.read_segment(&segment)?);
        }
        debug!(recovered = ops.len(), "WAL recovery complete");
        Ok(ops)
    }

    /// Number of pending operations.
    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.recover()?.len())
    }

    /// Drop a segment whose operations have been compacted.
    ///
    /// Rotated segments are deleted. The active segment is truncated to empty
    /// and keeps existing, ready for new appends.
    pub fn consume(&self, segment: &WalSegment) -> Result<()> {
        let _state = self.lock();
        match segment.kind {
            SegmentKind::Active => {
                OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&segment.path)?;
                debug!(path = %segment.path.display(), "WAL active segment emptied");
            }
            SegmentKind::Rotated(_) => {
                match fs::remove_file(&segment.path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                debug!(path = %segment.path.display(), "WAL rotated segment deleted");
            }
        }
        Ok(())
    }

    /// Recreate the active segment if it has gone missing.
    pub fn ensure_active(&self) -> Result<()> {
        let _state = self.lock();
        OpenOptions::new().create(true).append(true).open(self.active_path())?;
        Ok(())
    }

    /// Path to the active segment.
    pub fn active_path(&self) -> PathBuf {
        self.dir.join(crate::segment::ACTIVE_FILE)
    }

    /// WAL directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &WalConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, WalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rotate_locked(&self, state: &mut WalState) -> Result<WalSegment> {
        // Epoch millis keep names readable; the counter keeps them ordered.
        let seq = (state.last_seq + 1).max(epoch_millis());
        let rotated = WalSegment::new(&self.dir, SegmentKind::Rotated(seq));
        let active = self.active_path();

        fs::rename(&active, &rotated.path)?;
        OpenOptions::new().create(true).append(true).open(&active)?;
        state.last_seq = seq;

        info!(from = %active.display(), to = %rotated.path.display(), "WAL rotated");
        Ok(rotated)
    }
}

/// Cut a segment back to `offset` after a failed append.
fn abandon_append(file: &File, path: &Path, offset: u64, error: io::Error) -> WalError {
    match file.set_len(offset) {
        Ok(()) => WalError::Io(error),
        Err(truncate) => {
            warn!(
                path = %path.display(),
                offset,
                error = %truncate,
                "could not truncate WAL after failed append; partial line may remain"
            );
            WalError::PartialWrite {
                path: path.to_path_buf(),
                source: error,
                truncate,
            }
        }
    }
}

fn file_len(path: &Path) -> Result<u64> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::ACTIVE_FILE;
    use chrono::{TimeZone, Utc};
    use nt_types::Oid;
    use serde_json::json;

    fn make_op(seq: u32) -> Operation {
        Operation::new(format!("note-{seq}"), "review-flashcard", json!({ "seq": seq }))
            .with_oid(Oid::from_content(&format!("op-{seq}")))
            .at(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, seq).unwrap())
    }

    fn open(dir: &Path, max_wal_size: u64) -> WriteAheadLog {
        let config = WalConfig {
            max_wal_size,
            ..WalConfig::default()
        };
        WriteAheadLog::open(dir, config).unwrap()
    }

    fn line_count(path: &Path) -> usize {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|l| !l.is_empty())
            .count()
    }

    #[test]
    fn open_creates_dir_and_active_file() {
        let dir = tempfile::tempdir().unwrap();
        let wal_dir = dir.path().join(".nt/operations/wal");
        let wal = open(&wal_dir, DEFAULT_MAX_WAL_SIZE);

        assert!(wal.active_path().exists());
        assert_eq!(fs::metadata(wal.active_path()).unwrap().len(), 0);
        assert_eq!(wal.segments().unwrap().len(), 1);
    }

    #[test]
    fn append_and_recover_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let wal = open(dir.path(), DEFAULT_MAX_WAL_SIZE);

        let ops: Vec<Operation> = (1..=3).map(make_op).collect();
        for op in &ops {
            wal.append(op).unwrap();
        }

        assert_eq!(line_count(&wal.active_path()), 3);
        assert_eq!(wal.recover().unwrap(), ops);
    }

    #[test]
    fn append_returns_increasing_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let wal = open(dir.path(), DEFAULT_MAX_WAL_SIZE);

        let off1 = wal.append(&make_op(1)).unwrap();
        let off2 = wal.append(&make_op(2)).unwrap();
        let off3 = wal.append(&make_op(3)).unwrap();

        assert_eq!(off1, 0);
        assert!(off2 > off1);
        assert!(off3 > off2);
    }

    #[test]
    fn rotation_produces_two_files_for_two_appends() {
        let dir = tempfile::tempdir().unwrap();
        let wal = open(dir.path(), 1);

        wal.append(&make_op(1)).unwrap();
        wal.append(&make_op(2)).unwrap();

        let segments = wal.segments().unwrap();
        assert_eq!(segments.len(), 2);
        assert!(matches!(segments[0].kind, SegmentKind::Rotated(_)));
        assert!(segments[1].is_active());

        let rotated_name = segments[0].path.file_name().unwrap().to_str().unwrap();
        assert!(rotated_name.starts_with("wal.") && rotated_name.ends_with(".json"));
        assert!(rotated_name[4..rotated_name.len() - 5]
            .bytes()
            .all(|b| b.is_ascii_digit()));

        assert_eq!(wal.read_segment(&segments[0]).unwrap(), vec![make_op(1)]);
        assert_eq!(wal.read_segment(&segments[1]).unwrap(), vec![make_op(2)]);
    }

    #[test]
    fn recover_preserves_order_across_rotations() {
        let dir = tempfile::tempdir().unwrap();
        let wal = open(dir.path(), 1);

        let ops: Vec<Operation> = (1..=5).map(make_op).collect();
        for op in &ops {
            wal.append(op).unwrap();
        }

        assert_eq!(wal.segments().unwrap().len(), 5);
        assert_eq!(wal.recover().unwrap(), ops);
    }

    #[test]
    fn rotation_sequence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let first_seq = {
            let wal = open(dir.path(), 1);
            wal.append(&make_op(1)).unwrap();
            match wal.rotate().unwrap().unwrap().kind {
                SegmentKind::Rotated(seq) => seq,
                SegmentKind::Active => unreachable!(),
            }
        };

        let wal = open(dir.path(), 1);
        wal.append(&make_op(2)).unwrap();
        let second = wal.rotate().unwrap().unwrap();
        assert!(matches!(second.kind, SegmentKind::Rotated(seq) if seq > first_seq));
    }

    #[test]
    fn empty_active_segment_is_never_rotated() {
        let dir = tempfile::tempdir().unwrap();
        let wal = open(dir.path(), 1);

        assert!(wal.rotate().unwrap().is_none());
        assert_eq!(wal.segments().unwrap().len(), 1);
    }

    #[test]
    fn malformed_line_is_reported_with_position() {
        let dir = tempfile::tempdir().unwrap();
        let wal = open(dir.path(), DEFAULT_MAX_WAL_SIZE);
        wal.append(&make_op(1)).unwrap();

        let mut file = OpenOptions::new().append(true).open(wal.active_path()).unwrap();
        file.write_all(b"{\"oid\": \"truncated\n").unwrap();

        let err = wal.recover().unwrap_err();
        match err {
            WalError::MalformedRecord { path, line, .. } => {
                assert_eq!(path.file_name().unwrap(), ACTIVE_FILE);
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_lines_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let wal = open(dir.path(), DEFAULT_MAX_WAL_SIZE);
        wal.append(&make_op(1)).unwrap();
        let mut file = OpenOptions::new().append(true).open(wal.active_path()).unwrap();
        file.write_all(b"\n   \n").unwrap();
        wal.append(&make_op(2)).unwrap();

        assert_eq!(wal.pending_count().unwrap(), 2);
    }

    #[test]
    fn consume_truncates_active_and_deletes_rotated() {
        let dir = tempfile::tempdir().unwrap();
        let wal = open(dir.path(), 1);
        wal.append(&make_op(1)).unwrap();
        wal.append(&make_op(2)).unwrap();

        for segment in wal.segments().unwrap() {
            wal.consume(&segment).unwrap();
        }

        let segments = wal.segments().unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].is_active());
        assert_eq!(fs::metadata(wal.active_path()).unwrap().len(), 0);
        assert!(wal.recover().unwrap().is_empty());
    }

    #[test]
    fn foreign_files_are_not_segments() {
        let dir = tempfile::tempdir().unwrap();
        let wal = open(dir.path(), DEFAULT_MAX_WAL_SIZE);
        fs::write(dir.path().join("README.md"), "x").unwrap();
        fs::create_dir(dir.path().join("wal.7.json")).unwrap();

        assert_eq!(wal.segments().unwrap().len(), 1);
    }

    #[test]
    fn failed_append_is_truncated_away() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ACTIVE_FILE);
        fs::write(&path, "complete\npart").unwrap();
        let file = OpenOptions::new().append(true).open(&path).unwrap();

        let err = abandon_append(&file, &path, 9, io::Error::other("disk full"));

        assert!(matches!(err, WalError::Io(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "complete\n");
    }

    #[test]
    fn failed_truncation_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ACTIVE_FILE);
        fs::write(&path, "complete\npart").unwrap();
        // Read-only handles cannot be truncated.
        let file = File::open(&path).unwrap();

        let err = abandon_append(&file, &path, 9, io::Error::other("disk full"));

        assert!(err.to_string().contains("partial line"), "{err}");
        match err {
            WalError::PartialWrite { path: p, source, .. } => {
                assert_eq!(p, path);
                assert_eq!(source.to_string(), "disk full");
            }
            other => panic!("expected PartialWrite, got {other:?}"),
        }
    }

    #[test]
    fn ensure_active_recreates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let wal = open(dir.path(), DEFAULT_MAX_WAL_SIZE);
        fs::remove_file(wal.active_path()).unwrap();

        wal.ensure_active().unwrap();
        assert!(wal.active_path().is_file());

        wal.append(&make_op(1)).unwrap();
        wal.ensure_active().unwrap();
        assert_eq!(line_count(&wal.active_path()), 1);
    }

    #[test]
    fn nanosecond_timestamps_are_recovered_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let wal = open(dir.path(), DEFAULT_MAX_WAL_SIZE);
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let op = make_op(1).at(ts);

        wal.append(&op).unwrap();
        assert_eq!(wal.recover().unwrap(), vec![op]);
    }

    #[test]
    fn sync_every_write_mode() {
        let dir = tempfile::tempdir().unwrap();
        let config = WalConfig {
            sync_mode: SyncMode::EveryWrite,
            ..WalConfig::default()
        };
        let wal = WriteAheadLog::open(dir.path(), config).unwrap();

        wal.append(&make_op(1)).unwrap();
        assert_eq!(wal.recover().unwrap().len(), 1);
    }
}
