use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// File name of the active segment.
pub const ACTIVE_FILE: &str = "wal.json";

/// Whether a segment still accepts appends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Active,
    /// Closed segment with its rotation sequence number.
    Rotated(u64),
}

impl SegmentKind {
    /// Parse a segment kind from a file name. Returns `None` for foreign files.
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name == ACTIVE_FILE {
            return Some(Self::Active);
        }
        let seq = name.strip_prefix("wal.")?.strip_suffix(".json")?;
        if seq.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        seq.parse().ok().map(Self::Rotated)
    }

    /// File name for this kind.
    pub fn file_name(&self) -> String {
        match self {
            Self::Active => ACTIVE_FILE.to_string(),
            Self::Rotated(seq) => format!("wal.{seq}.json"),
        }
    }
}

// Rotated segments are older than the active one and ordered by sequence.
impl Ord for SegmentKind {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Rotated(a), Self::Rotated(b)) => a.cmp(b),
            (Self::Rotated(_), Self::Active) => Ordering::Less,
            (Self::Active, Self::Rotated(_)) => Ordering::Greater,
            (Self::Active, Self::Active) => Ordering::Equal,
        }
    }
}

impl PartialOrd for SegmentKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One WAL file on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalSegment {
    pub path: PathBuf,
    pub kind: SegmentKind,
}

impl WalSegment {
    pub fn new(dir: &Path, kind: SegmentKind) -> Self {
        Self {
            path: dir.join(kind.file_name()),
            kind,
        }
    }

    pub fn is_active(&self) -> bool {
        self.kind == SegmentKind::Active
    }
}
