//! Traversal ceilings and the mutable budget threaded through a walk.

use std::path::PathBuf;

use humansize::{BINARY, format_size};
use serde::{Deserialize, Serialize};

use crate::config::DigestConfig;

/// Which ceiling refused a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum BudgetLimit {
    /// Single file larger than the per-file ceiling.
    #[strum(to_string = "per-file size limit")]
    FileSize,
    /// File-count ceiling reached.
    #[strum(to_string = "file count limit")]
    FileCount,
    /// Aggregate size ceiling reached.
    #[strum(to_string = "total size limit")]
    TotalSize,
}

impl BudgetLimit {
    /// Whether hitting this limit must stop the whole traversal.
    pub fn is_global(self) -> bool {
        matches!(self, Self::FileCount | Self::TotalSize)
    }
}

/// Fixed upper bounds for one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ceilings {
    pub max_file_size: u64,
    pub max_total_size: u64,
    pub max_files: u64,
    pub max_depth: usize,
}

impl From<&DigestConfig> for Ceilings {
    fn from(config: &DigestConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            max_total_size: config.max_total_size,
            max_files: config.max_files,
            max_depth: config.max_depth,
        }
    }
}

/// Counters for one traversal. Counters never exceed their ceilings.
#[derive(Debug, Clone)]
pub struct TraversalBudget {
    ceilings: Ceilings,
    files_seen: u64,
    bytes_seen: u64,
}

impl TraversalBudget {
    /// Create an empty budget.
    pub fn new(ceilings: Ceilings) -> Self {
        Self {
            ceilings,
            files_seen: 0,
            bytes_seen: 0,
        }
    }

    /// Create an empty budget from a config.
    pub fn from_config(config: &DigestConfig) -> Self {
        Self::new(Ceilings::from(config))
    }

    pub fn ceilings(&self) -> &Ceilings {
        &self.ceilings
    }

    pub fn files_seen(&self) -> u64 {
        self.files_seen
    }

    pub fn bytes_seen(&self) -> u64 {
        self.bytes_seen
    }

    /// Whether a directory at `depth` may still be descended into.
    pub fn allows_descent(&self, depth: usize) -> bool {
        depth < self.ceilings.max_depth
    }

    /// Check whether a file of `size` bytes fits, without admitting it.
    ///
    /// The per-file ceiling is checked first so that an oversized file is
    /// reported as a local skip even when the global budget is nearly spent.
    pub fn check(&self, size: u64) -> Option<BudgetLimit> {
        if size > self.ceilings.max_file_size {
            return Some(BudgetLimit::FileSize);
        }
        if self.files_seen >= self.ceilings.max_files {
            return Some(BudgetLimit::FileCount);
        }
        if self.bytes_seen.saturating_add(size) > self.ceilings.max_total_size {
            return Some(BudgetLimit::TotalSize);
        }
        None
    }

    /// Admit a file, updating the counters.
    pub fn admit(&mut self, size: u64) -> Result<(), BudgetLimit> {
        if let Some(limit) = self.check(size) {
            return Err(limit);
        }
        self.files_seen += 1;
        self.bytes_seen += size;
        Ok(())
    }
}

/// Record of a traversal that stopped at a global ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    /// Ceiling that was hit.
    pub limit: BudgetLimit,
    /// First file that did not fit, relative to the root.
    pub stopped_at: PathBuf,
    /// Files admitted before stopping.
    pub files_admitted: u64,
    /// Bytes admitted before stopping.
    pub bytes_admitted: u64,
    /// The ceiling that applied.
    pub ceiling: u64,
}

impl Truncation {
    /// Human-readable notice for the digest.
    pub fn notice(&self) -> String {
        let ceiling = match self.limit {
            BudgetLimit::FileCount => format!("{} files", self.ceiling),
            _ => format_size(self.ceiling, BINARY),
        };
        format!(
            "Traversal stopped at the {} ({ceiling}): {} files ({}) included, remaining files omitted starting at {}.",
            self.limit,
            self.files_admitted,
            format_size(self.bytes_admitted, BINARY),
            crate::entry::slash_path(&self.stopped_at),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ceilings() -> Ceilings {
        Ceilings {
            max_file_size: 100,
            max_total_size: 250,
            max_files: 3,
            max_depth: 2,
        }
    }

    #[test]
    fn test_admit_counts() {
        let mut budget = TraversalBudget::new(ceilings());
        budget.admit(50).unwrap();
        budget.admit(60).unwrap();

        assert_eq!(budget.files_seen(), 2);
        assert_eq!(budget.bytes_seen(), 110);
    }

    #[test]
    fn test_per_file_limit_is_local() {
        let mut budget = TraversalBudget::new(ceilings());
        assert_eq!(budget.admit(500), Err(BudgetLimit::FileSize));
        assert!(!BudgetLimit::FileSize.is_global());
        assert_eq!(budget.files_seen(), 0);
    }

    #[test]
    fn test_total_size_limit_never_exceeded() {
        let mut budget = TraversalBudget::new(ceilings());
        budget.admit(100).unwrap();
        budget.admit(100).unwrap();
        assert_eq!(budget.admit(60), Err(BudgetLimit::TotalSize));
        assert!(budget.bytes_seen() <= 250);
        assert!(BudgetLimit::TotalSize.is_global());
    }

    #[test]
    fn test_file_count_limit() {
        let mut budget = TraversalBudget::new(ceilings());
        for _ in 0..3 {
            budget.admit(1).unwrap();
        }
        assert_eq!(budget.admit(1), Err(BudgetLimit::FileCount));
    }

    #[test]
    fn test_depth() {
        let budget = TraversalBudget::new(ceilings());
        assert!(budget.allows_descent(1));
        assert!(!budget.allows_descent(2));
    }

    #[test]
    fn test_truncation_notice() {
        let truncation = Truncation {
            limit: BudgetLimit::FileCount,
            stopped_at: PathBuf::from("src/z.rs"),
            files_admitted: 3,
            bytes_admitted: 30,
            ceiling: 3,
        };
        let notice = truncation.notice();
        assert!(notice.contains("file count limit"));
        assert!(notice.contains("src/z.rs"));
    }
}
