//! Classification policy: which paths are pruned, ignored or eligible.

use std::collections::HashSet;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::budget::{BudgetLimit, TraversalBudget};
use crate::config::DigestConfig;
use crate::error::DigestError;

/// Why a file was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum IgnoreReason {
    /// Symbolic links are never followed.
    Symlink,
    /// Not a regular file.
    NotAFile,
    /// File name is in the ignore set.
    IgnoredName,
    /// Extension is in the ignore set.
    IgnoredExtension,
    /// Path matched an ignore glob.
    IgnoredPattern,
    /// Extension is not in the text allow-list.
    NotText,
}

/// Result of classifying one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Eligible,
    Ignored(IgnoreReason),
    OverBudget(BudgetLimit),
}

/// A filesystem entry about to be classified.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// Path relative to the scan root.
    pub relative: &'a Path,
    /// Size in bytes.
    pub size: u64,
    /// Whether the entry is a regular file.
    pub is_file: bool,
    /// Whether the entry itself is a symbolic link.
    pub is_symlink: bool,
}

impl<'a> Candidate<'a> {
    /// A regular, non-symlinked file.
    pub fn file(relative: &'a Path, size: u64) -> Self {
        Self {
            relative,
            size,
            is_file: true,
            is_symlink: false,
        }
    }
}

/// Lower-cased extension with a leading dot.
///
/// A dot-file without a further extension (`.gitignore`, `.env`) uses its
/// whole name.
pub fn extension_of(name: &str) -> Option<String> {
    if let Some(rest) = name.strip_prefix('.') {
        if !rest.is_empty() && !rest.contains('.') {
            return Some(name.to_lowercase());
        }
    }
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

fn lowered(items: &[String]) -> HashSet<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

/// Pure decision function over paths, built once from the config.
#[derive(Debug, Clone)]
pub struct ClassificationPolicy {
    ignored_dirs: HashSet<String>,
    ignored_files: HashSet<String>,
    ignored_extensions: HashSet<String>,
    text_extensions: HashSet<String>,
    text_file_names: HashSet<String>,
    priority_documents: Vec<String>,
    ignore_globs: GlobSet,
}

impl ClassificationPolicy {
    /// Build the policy from a config.
    pub fn new(config: &DigestConfig) -> Result<Self, DigestError> {
        let mut globs = GlobSetBuilder::new();
        for pattern in &config.ignore_globs {
            let glob = Glob::new(pattern).map_err(|e| DigestError::InvalidConfig {
                message: format!("Invalid ignore glob {pattern:?}: {e}"),
            })?;
            globs.add(glob);
        }
        let ignore_globs = globs.build().map_err(|e| DigestError::InvalidConfig {
            message: e.to_string(),
        })?;

        let ignored_extensions = lowered(&config.ignored_extensions);
        let text_extensions = lowered(&config.text_extensions)
            .into_iter()
            .filter(|ext| !ignored_extensions.contains(ext))
            .collect();

        Ok(Self {
            ignored_dirs: config.ignored_dirs.iter().cloned().collect(),
            ignored_files: config.ignored_files.iter().cloned().collect(),
            ignored_extensions,
            text_extensions,
            text_file_names: config.text_file_names.iter().cloned().collect(),
            priority_documents: config
                .priority_documents
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
            ignore_globs,
        })
    }

    /// Whether a directory with this name prunes its whole subtree.
    pub fn prunes_dir(&self, name: &str) -> bool {
        self.ignored_dirs.contains(name)
    }

    /// Position of a root-level priority document, matched case-insensitively.
    pub fn priority_rank(&self, relative: &Path) -> Option<usize> {
        if relative.components().count() != 1 {
            return None;
        }
        let name = relative.file_name()?.to_str()?.to_lowercase();
        self.priority_documents.iter().position(|p| *p == name)
    }

    /// Classify a file against the rule sets and the remaining budget.
    pub fn classify(&self, candidate: &Candidate<'_>, budget: &TraversalBudget) -> Classification {
        match self.ignore_reason(candidate) {
            Some(reason) => Classification::Ignored(reason),
            None => match budget.check(candidate.size) {
                Some(limit) => Classification::OverBudget(limit),
                None => Classification::Eligible,
            },
        }
    }

    fn ignore_reason(&self, candidate: &Candidate<'_>) -> Option<IgnoreReason> {
        if candidate.is_symlink {
            return Some(IgnoreReason::Symlink);
        }
        if !candidate.is_file {
            return Some(IgnoreReason::NotAFile);
        }

        let name = candidate
            .relative
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if self.ignored_files.contains(name) {
            return Some(IgnoreReason::IgnoredName);
        }

        let extension = extension_of(name);
        if let Some(ext) = &extension {
            if self.ignored_extensions.contains(ext) {
                return Some(IgnoreReason::IgnoredExtension);
            }
        }
        if self.ignore_globs.is_match(candidate.relative) {
            return Some(IgnoreReason::IgnoredPattern);
        }

        let is_text = extension
            .as_ref()
            .is_some_and(|ext| self.text_extensions.contains(ext))
            || self.text_file_names.contains(name)
            || self.priority_rank(candidate.relative).is_some();
        if !is_text {
            return Some(IgnoreReason::NotText);
        }
        None
    }
}
