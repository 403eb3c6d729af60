//! Result of one bounded traversal.

use std::path::PathBuf;
use std::time::Duration;

use crate::budget::Truncation;
use crate::entry::{FileEntry, SkippedFile};
use crate::error::ScanWarning;

/// Eligible files plus everything the digest needs to annotate.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Canonical root that was scanned.
    pub root: PathBuf,
    /// Eligible files in path order.
    pub files: Vec<FileEntry>,
    /// Files refused by the per-file ceiling.
    pub skipped: Vec<SkippedFile>,
    /// Set when a global ceiling stopped the walk early.
    pub truncation: Option<Truncation>,
    /// Directories not descended into because of the depth ceiling.
    pub depth_pruned: u64,
    /// Entries skipped because of transient I/O errors.
    pub warnings: Vec<ScanWarning>,
    /// Time spent walking.
    pub duration: Duration,
}

impl ScanOutcome {
    /// Create an empty outcome for a root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: Vec::new(),
            skipped: Vec::new(),
            truncation: None,
            depth_pruned: 0,
            warnings: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Whether every eligible file under the ceilings was collected.
    pub fn is_complete(&self) -> bool {
        self.truncation.is_none()
    }

    /// Total bytes of eligible files.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}
