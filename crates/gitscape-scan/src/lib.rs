//! Bounded repository traversal for gitscape.
//!
//! The scanner walks a repository root once, applying the
//! [`ClassificationPolicy`] to every entry and threading a
//! [`TraversalBudget`] through the walk. It produces a [`ScanOutcome`]: the
//! ordered list of eligible files plus what was skipped and why.
//!
//! - **Pruned walk** via jwalk: ignored directories and directories at the
//!   depth ceiling are never read
//! - **Deterministic order**: files come out sorted by relative path
//! - **Hard ceilings**: a global ceiling stops the walk and is recorded as
//!   a [`Truncation`] instead of an error
//! - **Tolerant**: unreadable entries are logged and skipped
//!
//! # Example
//!
//! ```rust,no_run
//! use gitscape_scan::{DigestConfig, RepoScanner};
//!
//! let scanner = RepoScanner::new(&DigestConfig::default()).unwrap();
//! let outcome = scanner.scan("/path/to/repo".as_ref()).unwrap();
//!
//! for file in &outcome.files {
//!     println!("{} ({} bytes)", file.display_path(), file.size);
//! }
//! if let Some(truncation) = &outcome.truncation {
//!     println!("{}", truncation.notice());
//! }
//! ```

mod scanner;

pub use scanner::{RepoScanner, SCAN_PROGRESS_INTERVAL};

// Re-export core types for convenience
pub use gitscape_core::{
    BudgetLimit, ClassificationPolicy, DigestConfig, DigestError, FileEntry, ProgressSink,
    ScanOutcome, ScanWarning, SkippedFile, TraversalBudget, Truncation, WarningKind,
};
