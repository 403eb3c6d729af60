//! File descriptors produced by traversal.

use std::path::{Path, PathBuf};

use compact_str::CompactString;

use crate::budget::BudgetLimit;

/// An eligible file, immutable once produced by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the scan root.
    pub relative: PathBuf,
    /// Size in bytes at scan time.
    pub size: u64,
    /// Lower-cased extension with leading dot, if any.
    pub extension: Option<CompactString>,
}

impl FileEntry {
    /// Create a new entry.
    pub fn new(
        path: impl Into<PathBuf>,
        relative: impl Into<PathBuf>,
        size: u64,
        extension: Option<CompactString>,
    ) -> Self {
        Self {
            path: path.into(),
            relative: relative.into(),
            size,
            extension,
        }
    }

    /// File name component.
    pub fn file_name(&self) -> &str {
        self.relative
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Relative path with `/` separators on every platform.
    pub fn display_path(&self) -> String {
        slash_path(&self.relative)
    }

    /// Number of path components below the root.
    pub fn depth(&self) -> usize {
        self.relative.components().count()
    }
}

/// A file that passed classification but was refused by the per-file ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// Path relative to the scan root.
    pub relative: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Ceiling that refused it.
    pub reason: BudgetLimit,
}

impl SkippedFile {
    /// Relative path with `/` separators.
    pub fn display_path(&self) -> String {
        slash_path(&self.relative)
    }
}

pub(crate) fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_accessors() {
        let entry = FileEntry::new(
            "/repo/src/main.go",
            Path::new("src").join("main.go"),
            200,
            Some(".go".into()),
        );

        assert_eq!(entry.file_name(), "main.go");
        assert_eq!(entry.display_path(), "src/main.go");
        assert_eq!(entry.depth(), 2);
    }
}
