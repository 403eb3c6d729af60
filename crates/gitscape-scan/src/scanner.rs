//! JWalk-based bounded repository scanner.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use compact_str::CompactString;
use jwalk::{Parallelism, WalkDir};

use gitscape_core::{
    BudgetLimit, Candidate, Classification, ClassificationPolicy, DigestConfig, DigestError,
    FileEntry, NullSink, ProgressSink, ScanOutcome, ScanWarning, SkippedFile, TraversalBudget,
    Truncation, WarningKind, extension_of, stage,
};

/// Number of admitted files between scan progress reports.
pub const SCAN_PROGRESS_INTERVAL: u64 = 500;

/// What the traversal does after one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Next,
    Stop,
}

/// A listed non-directory entry and the outcome of reading its size.
struct Visited<'a> {
    path: &'a Path,
    relative: &'a Path,
    is_file: bool,
    is_symlink: bool,
    size: io::Result<u64>,
}

/// Scanner that produces the ordered list of eligible files under a root.
#[derive(Debug, Clone)]
pub struct RepoScanner {
    config: DigestConfig,
    policy: Arc<ClassificationPolicy>,
}

impl RepoScanner {
    /// Create a scanner for a config.
    pub fn new(config: &DigestConfig) -> Result<Self, DigestError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            policy: Arc::new(ClassificationPolicy::new(config)?),
        })
    }

    /// The classification policy in use.
    pub fn policy(&self) -> &ClassificationPolicy {
        &self.policy
    }

    /// Scan without progress reporting.
    pub fn scan(&self, root: &Path) -> Result<ScanOutcome, DigestError> {
        self.scan_with_progress(root, &mut NullSink)
    }

    /// Scan the given root, reporting into `sink`.
    ///
    /// Returns `DigestError::Cancelled` if the sink asks to stop.
    pub fn scan_with_progress(
        &self,
        root: &Path,
        sink: &mut dyn ProgressSink,
    ) -> Result<ScanOutcome, DigestError> {
        let start = Instant::now();
        let root_path = root.canonicalize().map_err(|e| DigestError::io(root, e))?;

        if !root_path.is_dir() {
            return Err(DigestError::NotADirectory { path: root_path });
        }

        let mut budget = TraversalBudget::from_config(&self.config);
        let depth_pruned = Arc::new(AtomicU64::new(0));
        let mut outcome = ScanOutcome::new(&root_path);

        sink.report("Scanning repository files...", stage::SCANNING);

        let walker = self.walker(&root_path, &budget, Arc::clone(&depth_pruned));

        for entry_result in walker {
            if sink.is_cancelled() {
                tracing::info!(root = %root_path.display(), "Scan cancelled");
                return Err(DigestError::Cancelled);
            }

            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    let relative = path
                        .strip_prefix(&root_path)
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|_| path.clone());
                    let message = err.to_string();
                    let error = err.into_io_error().unwrap_or_else(|| io::Error::other(message));
                    tracing::warn!(path = %path.display(), error = %error, "Skipping unreadable entry");
                    outcome.warnings.push(ScanWarning::from_io(relative, &error));
                    continue;
                }
            };

            // The root itself is yielded at depth 0
            if entry.depth == 0 || entry.file_type.is_dir() {
                continue;
            }

            let path = entry.path();
            let Ok(relative) = path.strip_prefix(&root_path) else {
                continue;
            };

            let is_symlink = entry.file_type.is_symlink();
            let size = if is_symlink {
                Ok(0)
            } else {
                entry
                    .metadata()
                    .map(|metadata| metadata.len())
                    .map_err(|err| {
                        let message = err.to_string();
                        err.into_io_error().unwrap_or_else(|| io::Error::other(message))
                    })
            };

            let visited = Visited {
                path: &path,
                relative,
                is_file: entry.file_type.is_file(),
                is_symlink,
                size,
            };
            if self.visit(visited, &mut budget, &mut outcome, sink) == Step::Stop {
                break;
            }
        }

        outcome.files.sort_by(|a, b| a.relative.cmp(&b.relative));
        outcome.depth_pruned = depth_pruned.load(Ordering::Relaxed);
        outcome.duration = start.elapsed();

        tracing::info!(
            root = %root_path.display(),
            files = outcome.files.len(),
            bytes = budget.bytes_seen(),
            skipped = outcome.skipped.len(),
            truncated = outcome.truncation.is_some(),
            elapsed_ms = outcome.duration.as_millis() as u64,
            "Scan finished"
        );

        Ok(outcome)
    }

    /// Classify one listed entry and record the result in `outcome`.
    fn visit(
        &self,
        visited: Visited<'_>,
        budget: &mut TraversalBudget,
        outcome: &mut ScanOutcome,
        sink: &mut dyn ProgressSink,
    ) -> Step {
        let Visited {
            path,
            relative,
            is_file,
            is_symlink,
            size,
        } = visited;

        let size = match size {
            Ok(size) => size,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Skipping entry without metadata");
                let mut warning = ScanWarning::from_io(relative, &err);
                if warning.kind == WarningKind::ReadError {
                    warning.kind = WarningKind::MetadataError;
                }
                outcome.warnings.push(warning);
                return Step::Next;
            }
        };

        let candidate = Candidate {
            relative,
            size,
            is_file,
            is_symlink,
        };

        match self.policy.classify(&candidate, budget) {
            Classification::Ignored(reason) => {
                tracing::trace!(path = %relative.display(), %reason, "Ignored");
            }
            Classification::OverBudget(BudgetLimit::FileSize) => {
                tracing::info!(path = %relative.display(), size, "Skipping large file");
                outcome.skipped.push(SkippedFile {
                    relative: relative.to_path_buf(),
                    size,
                    reason: BudgetLimit::FileSize,
                });
            }
            Classification::OverBudget(limit) => {
                tracing::warn!(
                    limit = %limit,
                    files = budget.files_seen(),
                    bytes = budget.bytes_seen(),
                    "Repository ceiling reached, stopping traversal"
                );
                outcome.truncation = Some(self.truncation(limit, relative, budget));
                return Step::Stop;
            }
            Classification::Eligible => {
                if let Err(limit) = budget.admit(size) {
                    outcome.truncation = Some(self.truncation(limit, relative, budget));
                    return Step::Stop;
                }
                let extension = relative
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(extension_of)
                    .map(CompactString::from);
                outcome
                    .files
                    .push(FileEntry::new(path, relative, size, extension));

                if budget.files_seen() % SCAN_PROGRESS_INTERVAL == 0 {
                    sink.report(
                        &format!("Scanning: {} files found", budget.files_seen()),
                        stage::SCANNING,
                    );
                }
            }
        }
        Step::Next
    }

    /// Build the walker. Pruned directories are dropped before they are read.
    fn walker(
        &self,
        root_path: &Path,
        budget: &TraversalBudget,
        depth_pruned: Arc<AtomicU64>,
    ) -> WalkDir {
        let policy = Arc::clone(&self.policy);
        let depth_budget = TraversalBudget::new(*budget.ceilings());

        WalkDir::new(root_path)
            .parallelism(Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            })
            .sort(true)
            .skip_hidden(false)
            .follow_links(false)
            .process_read_dir(move |_depth, _path, _state, children| {
                children.retain(|child| match child {
                    Ok(entry) if entry.depth > 0 && entry.file_type.is_dir() => {
                        let name = entry.file_name.to_string_lossy();
                        let pruned = policy.prunes_dir(&name);
                        if pruned {
                            tracing::debug!(dir = %name, "Pruning ignored directory");
                        }
                        !pruned
                    }
                    _ => true,
                });

                for entry in children.iter_mut().flatten() {
                    if entry.depth > 0
                        && entry.file_type.is_dir()
                        && !depth_budget.allows_descent(entry.depth)
                    {
                        entry.read_children_path = None;
                        depth_pruned.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
    }

    fn truncation(&self, limit: BudgetLimit, relative: &Path, budget: &TraversalBudget) -> Truncation {
        let ceilings = budget.ceilings();
        Truncation {
            limit,
            stopped_at: relative.to_path_buf(),
            files_admitted: budget.files_seen(),
            bytes_admitted: budget.bytes_seen(),
            ceiling: match limit {
                BudgetLimit::FileCount => ceilings.max_files,
                BudgetLimit::TotalSize => ceilings.max_total_size,
                BudgetLimit::FileSize => ceilings.max_file_size,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::create_dir(root.join("assets")).unwrap();

        fs::write(root.join("README.md"), "# Demo").unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("src/nested/util.rs"), "pub fn util() {}").unwrap();
        fs::write(root.join(".git/config"), "[core]").unwrap();
        fs::write(root.join(".git/objects/blob.txt"), "blob").unwrap();
        fs::write(root.join("assets/logo.png"), "not really a png").unwrap();
        fs::write(root.join("notes.txt"), "notes").unwrap();

        temp
    }

    fn paths(outcome: &ScanOutcome) -> Vec<String> {
        outcome.files.iter().map(|f| f.display_path()).collect()
    }

    #[test]
    fn test_basic_scan() {
        let temp = create_test_tree();
        let scanner = RepoScanner::new(&DigestConfig::default()).unwrap();
        let outcome = scanner.scan(temp.path()).unwrap();

        assert_eq!(
            paths(&outcome),
            vec!["README.md", "notes.txt", "src/main.rs", "src/nested/util.rs"]
        );
        assert!(outcome.is_complete());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_depth_ceiling_prunes_without_failing() {
        let temp = create_test_tree();
        let config = DigestConfig::builder().max_depth(2usize).build().unwrap();
        let scanner = RepoScanner::new(&config).unwrap();
        let outcome = scanner.scan(temp.path()).unwrap();

        assert_eq!(paths(&outcome), vec!["README.md", "notes.txt", "src/main.rs"]);
        assert_eq!(outcome.depth_pruned, 1);
    }

    #[test]
    fn test_file_count_ceiling_truncates() {
        let temp = create_test_tree();
        let config = DigestConfig::builder().max_files(2u64).build().unwrap();
        let scanner = RepoScanner::new(&config).unwrap();
        let outcome = scanner.scan(temp.path()).unwrap();

        assert_eq!(paths(&outcome), vec!["README.md", "notes.txt"]);
        let truncation = outcome.truncation.unwrap();
        assert_eq!(truncation.limit, BudgetLimit::FileCount);
        assert_eq!(truncation.stopped_at, Path::new("src").join("main.rs"));
    }

    #[test]
    fn test_metadata_failure_is_warned_and_skipped() {
        let temp = create_test_tree();
        let config = DigestConfig::default();
        let scanner = RepoScanner::new(&config).unwrap();
        let mut budget = TraversalBudget::from_config(&config);
        let mut outcome = ScanOutcome::new(temp.path());

        let gone = temp.path().join("gone.rs");
        let step = scanner.visit(
            Visited {
                path: &gone,
                relative: Path::new("gone.rs"),
                is_file: true,
                is_symlink: false,
                size: Err(io::Error::new(io::ErrorKind::NotFound, "vanished")),
            },
            &mut budget,
            &mut outcome,
            &mut NullSink,
        );
        assert_eq!(step, Step::Next);

        let broken = temp.path().join("broken.rs");
        scanner.visit(
            Visited {
                path: &broken,
                relative: Path::new("broken.rs"),
                is_file: true,
                is_symlink: false,
                size: Err(io::Error::other("stat failed")),
            },
            &mut budget,
            &mut outcome,
            &mut NullSink,
        );

        // Later entries are still admitted.
        let notes = temp.path().join("notes.txt");
        let step = scanner.visit(
            Visited {
                path: &notes,
                relative: Path::new("notes.txt"),
                is_file: true,
                is_symlink: false,
                size: Ok(5),
            },
            &mut budget,
            &mut outcome,
            &mut NullSink,
        );
        assert_eq!(step, Step::Next);

        assert_eq!(paths(&outcome), vec!["notes.txt"]);
        let kinds: Vec<_> = outcome.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::Disappeared, WarningKind::MetadataError]);
        assert_eq!(outcome.warnings[0].path, Path::new("gone.rs"));
        assert_eq!(budget.files_seen(), 1);
    }

    #[test]
    fn test_not_a_directory() {
        let temp = create_test_tree();
        let scanner = RepoScanner::new(&DigestConfig::default()).unwrap();
        let result = scanner.scan(&temp.path().join("notes.txt"));
        assert!(matches!(result, Err(DigestError::NotADirectory { .. })));
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let temp = TempDir::new().unwrap();
        let scanner = RepoScanner::new(&DigestConfig::default()).unwrap();
        let result = scanner.scan(&temp.path().join("missing"));
        assert!(matches!(result, Err(DigestError::Io { .. })));
    }

    #[test]
    fn test_cancelled_sink_stops_scan() {
        struct Cancelled;
        impl ProgressSink for Cancelled {
            fn report(&mut self, _message: &str, _percentage: u8) {}
            fn is_cancelled(&self) -> bool {
                true
            }
        }

        let temp = create_test_tree();
        let scanner = RepoScanner::new(&DigestConfig::default()).unwrap();
        let result = scanner.scan_with_progress(temp.path(), &mut Cancelled);
        assert!(matches!(result, Err(DigestError::Cancelled)));
    }
}
