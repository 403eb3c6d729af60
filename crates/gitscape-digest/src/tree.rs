//! Prefix-connector directory tree.

use std::collections::BTreeMap;
use std::path::Path;

use humansize::{BINARY, format_size};
use itertools::{Itertools, Position};

use gitscape_core::ScanOutcome;

#[derive(Debug, Default)]
struct TreeNode {
    children: BTreeMap<String, TreeNode>,
    is_dir: bool,
    note: Option<String>,
}

/// Directory tree of the files that made it through classification.
#[derive(Debug)]
pub struct DirectoryTree {
    root_name: String,
    root: TreeNode,
}

impl DirectoryTree {
    /// Create an empty tree whose root line reads `root_name/`.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
            root: TreeNode {
                is_dir: true,
                ..TreeNode::default()
            },
        }
    }

    /// Build the tree from a scan: eligible files plus annotated skips.
    pub fn from_outcome(outcome: &ScanOutcome, root_name: impl Into<String>) -> Self {
        let mut tree = Self::new(root_name);
        for file in &outcome.files {
            tree.insert(&file.relative, None);
        }
        for skipped in &outcome.skipped {
            tree.insert(
                &skipped.relative,
                Some(format!(
                    "[skipped: {}, exceeds {}]",
                    format_size(skipped.size, BINARY),
                    skipped.reason
                )),
            );
        }
        tree
    }

    /// Insert a file path, creating intermediate directories.
    pub fn insert(&mut self, relative: &Path, note: Option<String>) {
        let mut node = &mut self.root;
        let mut components = relative.components().peekable();
        while let Some(component) = components.next() {
            let name = component.as_os_str().to_string_lossy().into_owned();
            let is_last = components.peek().is_none();
            node = node.children.entry(name).or_default();
            if !is_last {
                node.is_dir = true;
            }
        }
        node.note = note;
    }

    /// Number of files in the tree.
    pub fn file_count(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            node.children
                .values()
                .map(|child| if child.is_dir { count(child) } else { 1 })
                .sum()
        }
        count(&self.root)
    }

    /// Render with `├──`, `└──` and `│` connectors.
    pub fn render(&self) -> String {
        let mut out = format!("{}/\n", self.root_name);
        render_children(&self.root, "", &mut out);
        out
    }
}

fn render_children(node: &TreeNode, prefix: &str, out: &mut String) {
    for (position, (name, child)) in node.children.iter().with_position() {
        let last = matches!(position, Position::Last | Position::Only);
        let connector = if last { "└── " } else { "├── " };

        out.push_str(prefix);
        out.push_str(connector);
        out.push_str(name);
        if child.is_dir {
            out.push('/');
        }
        if let Some(note) = &child.note {
            out.push(' ');
            out.push_str(note);
        }
        out.push('\n');

        if child.is_dir {
            let extension = if last { "    " } else { "│   " };
            render_children(child, &format!("{prefix}{extension}"), out);
        }
    }
}
