//! Core types and policy for gitscape.
//!
//! This crate holds everything the traversal, digest and session crates
//! share: the fixed [`DigestConfig`], the [`ClassificationPolicy`] that
//! decides which files qualify, the [`TraversalBudget`] that enforces the
//! size/count/depth ceilings, progress reporting types and the
//! append-only [`DigestDocument`].

mod budget;
mod classify;
mod config;
mod document;
mod entry;
mod error;
mod event;
mod outcome;

pub use budget::{BudgetLimit, Ceilings, TraversalBudget, Truncation};
pub use classify::{Candidate, Classification, ClassificationPolicy, IgnoreReason, extension_of};
pub use config::{DigestConfig, DigestConfigBuilder};
pub use document::{DigestDocument, DigestSection, SectionKind};
pub use entry::{FileEntry, SkippedFile};
pub use error::{AcquisitionError, DigestError, ScanWarning, WarningKind};
pub use event::{NullSink, ProgressEvent, ProgressSink, ProgressTracker, stage};
pub use outcome::ScanOutcome;
