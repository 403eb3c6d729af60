//! Error types for traversal, assembly and acquisition.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while scanning or assembling a digest.
#[derive(Debug, Error)]
pub enum DigestError {
    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The consumer went away and the worker stopped at a checkpoint.
    #[error("Digest cancelled")]
    Cancelled,

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl DigestError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure to make a repository available locally.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// The source locator could not be understood.
    #[error("Invalid source: {message}")]
    InvalidLocator { message: String },

    /// Repository or local path does not exist.
    #[error("Repository not found: {locator}")]
    NotFound { locator: String },

    /// Credentials were missing or rejected.
    #[error("Authentication failed for {locator}")]
    Auth { locator: String },

    /// Transport failure while fetching.
    #[error("Network error while fetching {locator}: {message}")]
    Network { locator: String, message: String },

    /// Local filesystem failure (temp dir, permissions).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other git failure.
    #[error("Git error: {message}")]
    Git { message: String },

    /// The transfer was stopped before it finished.
    #[error("Acquisition cancelled")]
    Cancelled,
}

/// Kind of per-entry warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Error reading a directory or file.
    ReadError,
    /// Error reading metadata.
    MetadataError,
    /// Entry vanished between listing and use.
    Disappeared,
    /// Bytes that were not valid UTF-8 were replaced.
    DecodeError,
}

/// Non-fatal problem recorded while scanning or assembling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Classify an I/O error into a warning.
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        let kind = match error.kind() {
            std::io::ErrorKind::PermissionDenied => WarningKind::PermissionDenied,
            std::io::ErrorKind::NotFound => WarningKind::Disappeared,
            _ => WarningKind::ReadError,
        };
        Self {
            message: error.to_string(),
            path,
            kind,
        }
    }
}
