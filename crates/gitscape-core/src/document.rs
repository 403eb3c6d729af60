//! The rendered digest: an append-only sequence of sections.

use std::fmt;

use serde::{Serialize, Serializer};

/// Kind of digest section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// `# Repository Digest for ...` line.
    Header,
    /// Truncation and skip notices.
    Notice,
    /// Promoted root document (README, LICENSE, ...).
    Priority,
    /// Directory tree listing.
    Tree,
    /// Content of one file.
    File,
}

/// One section of the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestSection {
    kind: SectionKind,
    title: String,
    body: String,
}

impl DigestSection {
    pub fn kind(&self) -> SectionKind {
        self.kind
    }

    /// Title; the relative path for file and priority sections.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Append text to the body.
    pub fn push_str(&mut self, text: &str) {
        self.body.push_str(text);
    }
}

/// The digest document, built incrementally and only ever appended to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestDocument {
    sections: Vec<DigestSection>,
}

impl DigestDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new section and return it for appending.
    pub fn push_section(&mut self, kind: SectionKind, title: impl Into<String>) -> &mut DigestSection {
        self.sections.push(DigestSection {
            kind,
            title: title.into(),
            body: String::new(),
        });
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    pub fn sections(&self) -> &[DigestSection] {
        &self.sections
    }

    /// Relative paths of all content sections (priority and file), in order.
    pub fn content_paths(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| matches!(s.kind, SectionKind::Priority | SectionKind::File))
            .map(|s| s.title.as_str())
            .collect()
    }

    /// Find a content section by relative path.
    pub fn content_of(&self, path: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| matches!(s.kind, SectionKind::Priority | SectionKind::File) && s.title == path)
            .map(|s| s.body.as_str())
    }

    /// Whether the document has no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Render the whole document as Markdown.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DigestDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            match section.kind {
                SectionKind::Header => writeln!(f, "# {}", section.title)?,
                SectionKind::Notice => {
                    writeln!(f, "\n## {}\n", section.title)?;
                    f.write_str(&section.body)?;
                }
                SectionKind::Tree => {
                    writeln!(f, "\n## {}\n", section.title)?;
                    writeln!(f, "```text")?;
                    f.write_str(&section.body)?;
                    if !section.body.ends_with('\n') {
                        f.write_str("\n")?;
                    }
                    writeln!(f, "```")?;
                }
                SectionKind::Priority | SectionKind::File => {
                    writeln!(f, "\n## {}\n", section.title)?;
                    f.write_str(&section.body)?;
                    if !section.body.is_empty() && !section.body.ends_with('\n') {
                        f.write_str("\n")?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Serialize for DigestDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_layout() {
        let mut doc = DigestDocument::new();
        doc.push_section(SectionKind::Header, "Repository Digest for demo");
        doc.push_section(SectionKind::Tree, "Directory Structure")
            .push_str("demo/\n└── a.rs\n");
        doc.push_section(SectionKind::File, "a.rs").push_str("fn main() {}");

        let text = doc.render();
        assert!(text.starts_with("# Repository Digest for demo\n"));
        assert!(text.contains("```text\ndemo/\n└── a.rs\n```\n"));
        assert!(text.ends_with("\n## a.rs\n\nfn main() {}\n"));
    }

    #[test]
    fn test_content_paths() {
        let mut doc = DigestDocument::new();
        doc.push_section(SectionKind::Header, "x");
        doc.push_section(SectionKind::Priority, "README.md").push_str("hi");
        doc.push_section(SectionKind::File, "src/a.rs");

        assert_eq!(doc.content_paths(), vec!["README.md", "src/a.rs"]);
        assert_eq!(doc.content_of("README.md"), Some("hi"));
        assert_eq!(doc.content_of("missing"), None);
    }

    #[test]
    fn test_serializes_as_text() {
        let mut doc = DigestDocument::new();
        doc.push_section(SectionKind::Header, "Repository Digest for x");
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, "\"# Repository Digest for x\\n\"");
    }
}
