//! Digest assembly for gitscape.
//!
//! This crate turns a [`ScanOutcome`] into a [`DigestDocument`]:
//!
//! - **Header** naming the source
//! - **Notices** for truncation, depth pruning and oversized files
//! - **Priority documents** (README, LICENSE, ...) promoted to the top
//! - **Directory tree** rendered with `├──`/`└──` connectors
//! - **File sections** with content read in bounded chunks
//!
//! Progress is reported through a [`ProgressSink`] as a non-decreasing
//! percentage ending at exactly 100.
//!
//! ```rust,ignore
//! use gitscape_digest::{DigestAssembler, NullSink};
//! use gitscape_scan::{DigestConfig, RepoScanner};
//!
//! let config = DigestConfig::default();
//! let outcome = RepoScanner::new(&config)?.scan("/path/to/repo".as_ref())?;
//!
//! let mut assembler = DigestAssembler::new(&config)?;
//! let digest = assembler.assemble(&outcome, "my-repo", &mut NullSink)?;
//! println!("{digest}");
//! ```

mod assembler;
mod reader;
mod tree;

pub use assembler::{DigestAssembler, MAX_CONTENT_PROGRESS_EVENTS};
pub use reader::{ChunkReader, ReadReport, Utf8ChunkDecoder};
pub use tree::DirectoryTree;

// Re-export core types
pub use gitscape_core::{DigestDocument, DigestError, NullSink, ProgressSink, ScanOutcome};
