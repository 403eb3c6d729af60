//! Digest assembly from a scan outcome.

use humansize::{BINARY, format_size};

use gitscape_core::{
    ClassificationPolicy, DigestConfig, DigestDocument, DigestError, DigestSection, FileEntry,
    ProgressSink, ProgressTracker, ScanOutcome, SectionKind, stage,
};

use crate::reader::ChunkReader;
use crate::tree::DirectoryTree;

/// Upper bound on content progress events; larger repositories report in batches.
pub const MAX_CONTENT_PROGRESS_EVENTS: usize = 500;

/// Skipped files listed by name in the notices before summarizing.
const MAX_LISTED_SKIPS: usize = 20;

/// Renders a [`DigestDocument`] from the files a scan produced.
#[derive(Debug)]
pub struct DigestAssembler {
    policy: ClassificationPolicy,
    max_depth: usize,
    max_file_size: u64,
    reader: ChunkReader,
}

impl DigestAssembler {
    /// Create an assembler for a config.
    pub fn new(config: &DigestConfig) -> Result<Self, DigestError> {
        Ok(Self {
            policy: ClassificationPolicy::new(config)?,
            max_depth: config.max_depth,
            max_file_size: config.max_file_size,
            reader: ChunkReader::new(config.chunk_size),
        })
    }

    /// Assemble the digest for `outcome`, naming the source `label`.
    ///
    /// The sink is polled after every file; if it reports cancellation the
    /// partial document is dropped and `DigestError::Cancelled` returned.
    pub fn assemble(
        &mut self,
        outcome: &ScanOutcome,
        label: &str,
        sink: &mut dyn ProgressSink,
    ) -> Result<DigestDocument, DigestError> {
        let mut progress = ProgressTracker::new(sink);
        let mut doc = DigestDocument::new();

        doc.push_section(SectionKind::Header, format!("Repository Digest for {label}"));
        self.push_notices(&mut doc, outcome);

        let (mut priority, rest): (Vec<&FileEntry>, Vec<&FileEntry>) = outcome
            .files
            .iter()
            .partition(|f| self.policy.priority_rank(&f.relative).is_some());
        priority.sort_by_key(|f| self.policy.priority_rank(&f.relative));

        let span = (stage::TREE_BUILT - stage::SCANNING) as usize;
        for (index, entry) in priority.iter().enumerate() {
            checkpoint(&progress)?;
            let section = doc.push_section(SectionKind::Priority, entry.display_path());
            self.append_content(entry, section);
            let percentage = stage::SCANNING as usize + (index + 1) * span / (priority.len() + 1);
            progress.report(&format!("Processed {}", entry.file_name()), percentage as u8);
        }

        checkpoint(&progress)?;
        let tree = DirectoryTree::from_outcome(outcome, root_name(outcome, label));
        doc.push_section(SectionKind::Tree, "Directory Structure")
            .push_str(&tree.render());
        progress.report("Directory tree built", stage::TREE_BUILT);

        let total = rest.len();
        let batch = total.div_ceil(MAX_CONTENT_PROGRESS_EVENTS).max(1);
        let content_span = (stage::DONE - stage::TREE_BUILT) as usize;

        for (index, entry) in rest.iter().enumerate() {
            checkpoint(&progress)?;
            let section = doc.push_section(SectionKind::File, entry.display_path());
            self.append_content(entry, section);

            let processed = index + 1;
            if processed % batch == 0 || processed == total {
                let percentage = stage::TREE_BUILT as usize + processed * content_span / total;
                progress.report(
                    &format!("Currently processing {}...", entry.file_name()),
                    percentage as u8,
                );
            }
        }

        if progress.last() < stage::DONE {
            progress.report("Digest assembled", stage::DONE);
        }

        tracing::info!(
            label,
            files = outcome.files.len(),
            priority = priority.len(),
            "Digest assembled"
        );
        Ok(doc)
    }

    fn push_notices(&self, doc: &mut DigestDocument, outcome: &ScanOutcome) {
        let mut notices = Vec::new();

        if let Some(truncation) = &outcome.truncation {
            notices.push(truncation.notice());
        }
        if outcome.depth_pruned > 0 {
            notices.push(format!(
                "{} directories deeper than {} levels were not scanned.",
                outcome.depth_pruned, self.max_depth
            ));
        }
        if !outcome.skipped.is_empty() {
            let mut listed = outcome
                .skipped
                .iter()
                .take(MAX_LISTED_SKIPS)
                .map(|s| s.display_path())
                .collect::<Vec<_>>()
                .join(", ");
            if outcome.skipped.len() > MAX_LISTED_SKIPS {
                listed.push_str(&format!(
                    " and {} more",
                    outcome.skipped.len() - MAX_LISTED_SKIPS
                ));
            }
            notices.push(format!(
                "{} files larger than {} were skipped: {listed}.",
                outcome.skipped.len(),
                format_size(self.max_file_size, BINARY),
            ));
        }
        if !outcome.warnings.is_empty() {
            notices.push(format!(
                "{} entries could not be read during traversal and were skipped.",
                outcome.warnings.len()
            ));
        }

        if notices.is_empty() {
            return;
        }
        let section = doc.push_section(SectionKind::Notice, "Notices");
        for notice in notices {
            section.push_str(&format!("- {notice}\n"));
        }
    }

    /// Stream one file into its section. Failures become in-place notes.
    fn append_content(&mut self, entry: &FileEntry, section: &mut DigestSection) {
        let result = self
            .reader
            .read(&entry.path, entry.size, |text| section.push_str(text));

        match result {
            Ok(report) => {
                if report.replaced > 0 {
                    tracing::warn!(
                        path = %entry.relative.display(),
                        replaced = report.replaced,
                        "Replaced undecodable bytes"
                    );
                }
                if let Some(err) = report.error {
                    tracing::warn!(path = %entry.relative.display(), error = %err, "Read failed mid-file");
                    if !section.body().is_empty() && !section.body().ends_with('\n') {
                        section.push_str("\n");
                    }
                    section.push_str(&format!(
                        "[Read error after {} bytes: {err}; remaining content omitted]\n",
                        report.bytes_read
                    ));
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %entry.relative.display(), "File disappeared before reading");
                section.push_str("[File disappeared before it could be read]\n");
            }
            Err(err) => {
                tracing::warn!(path = %entry.relative.display(), error = %err, "Skipping unreadable file");
                section.push_str(&format!("[File could not be read: {err}]\n"));
            }
        }
    }
}

fn checkpoint<S: ProgressSink>(progress: &ProgressTracker<S>) -> Result<(), DigestError> {
    if progress.is_cancelled() {
        tracing::info!("Digest assembly cancelled at checkpoint");
        return Err(DigestError::Cancelled);
    }
    Ok(())
}

fn root_name(outcome: &ScanOutcome, label: &str) -> String {
    outcome
        .root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| label.to_string())
}
