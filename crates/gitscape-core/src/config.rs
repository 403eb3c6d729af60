//! Digest configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::DigestError;

/// Default per-file size ceiling (15 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 15 * 1024 * 1024;
/// Default aggregate size ceiling (1000 MiB).
pub const DEFAULT_MAX_TOTAL_SIZE: u64 = 1000 * 1024 * 1024;
/// Default file-count ceiling.
pub const DEFAULT_MAX_FILES: u64 = 15_000;
/// Default directory depth ceiling.
pub const DEFAULT_MAX_DEPTH: usize = 40;
/// Default read chunk size (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
/// Default capacity of the session event channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 100;

const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "__pycache__",
    "node_modules",
    ".venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    // Build output
    "target",
    "dist",
    "build",
    "out",
    // Vendored dependencies
    "vendor",
    "bower_components",
];

const IGNORED_FILES: &[&str] = &[".DS_Store", "Zone.Identifier", "Thumbs.db"];

const IGNORED_EXTENSIONS: &[&str] = &[
    ".jpeg", ".jpg", ".png", ".gif", ".bmp", ".tiff", ".tif", ".webp", ".heif", ".heic", ".avif",
    ".svg", ".psd", ".raw", ".eps", ".pdf", ".ico", ".exr", ".tga", ".dds", ".wdp", ".dng", ".ppm",
];

const TEXT_EXTENSIONS: &[&str] = &[
    ".adoc", ".asciidoc", ".ada", ".adb", ".ads", ".asp", ".aspx", ".asm", ".astro", ".bash",
    ".bat", ".bib", ".build", ".c", ".cbl", ".cfg", ".clj", ".cls", ".cob", ".conf", ".cpp",
    ".cql", ".cr", ".cs", ".cshtml", ".csproj", ".css", ".csv", ".cypher", ".d", ".dart",
    ".dockerfile", ".ejs", ".elm", ".env", ".erb", ".erl", ".ex", ".exs", ".f", ".f90", ".f95",
    ".fs", ".fsi", ".fsproj", ".gitattributes", ".gitignore", ".go", ".gradle", ".graphql",
    ".groovy", ".h", ".handlebars", ".hbs", ".hcl", ".hpp", ".hrl", ".hs", ".htm", ".html",
    ".idr", ".ini", ".java", ".jinja", ".js", ".json", ".jsp", ".jsx", ".kt", ".less", ".lhs",
    ".lidr", ".liquid", ".lua", ".m", ".markdown", ".md", ".ml", ".mli", ".mustache", ".nim",
    ".p", ".pas", ".php", ".pl", ".plist", ".plsql", ".pom", ".pp", ".properties", ".ps1",
    ".psm1", ".psql", ".pug", ".py", ".r", ".rb", ".re", ".rei", ".rmd", ".rs", ".rst", ".s",
    ".sass", ".sbt", ".scala", ".scss", ".sh", ".slim", ".sln", ".sol", ".sql", ".strings",
    ".sty", ".svelte", ".swift", ".tcl", ".tex", ".tf", ".tfvars", ".toml", ".ts", ".tsv",
    ".tsql", ".tsx", ".txt", ".v", ".vbhtml", ".vbcsproj", ".vcxproj", ".vhd", ".vhdl", ".vim",
    ".vimrc", ".vue", ".xaml", ".xcodeproj", ".xcworkspace", ".xml", ".xul", ".yaml", ".yml",
    ".zig", ".zsh",
];

const TEXT_FILE_NAMES: &[&str] = &[
    "Dockerfile",
    "Makefile",
    "Gemfile",
    "Rakefile",
    "Procfile",
    "Jenkinsfile",
    "Vagrantfile",
];

const PRIORITY_DOCUMENTS: &[&str] = &[
    "README.md",
    "CONTRIBUTING.md",
    "CODE_OF_CONDUCT.md",
    "SECURITY.md",
    "LICENSE",
    "LICENSE.md",
    "LICENSE.txt",
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Configuration for traversal and digest assembly.
///
/// Fixed for the lifetime of the process; requests cannot tune it.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct DigestConfig {
    /// Largest single file admitted, in bytes.
    #[builder(default = "DEFAULT_MAX_FILE_SIZE")]
    pub max_file_size: u64,

    /// Largest aggregate size of admitted files, in bytes.
    #[builder(default = "DEFAULT_MAX_TOTAL_SIZE")]
    pub max_total_size: u64,

    /// Maximum number of admitted files.
    #[builder(default = "DEFAULT_MAX_FILES")]
    pub max_files: u64,

    /// Maximum directory depth below the root (root children are depth 1).
    #[builder(default = "DEFAULT_MAX_DEPTH")]
    pub max_depth: usize,

    /// Size of each incremental read during assembly.
    #[builder(default = "DEFAULT_CHUNK_SIZE")]
    pub chunk_size: usize,

    /// Capacity of the bounded worker-to-consumer event queue.
    #[builder(default = "DEFAULT_EVENT_CHANNEL_CAPACITY")]
    pub event_channel_capacity: usize,

    /// Directory names whose whole subtree is pruned.
    #[builder(default = "strings(IGNORED_DIRS)")]
    pub ignored_dirs: Vec<String>,

    /// Exact file names that are never included.
    #[builder(default = "strings(IGNORED_FILES)")]
    pub ignored_files: Vec<String>,

    /// Extensions (with leading dot) that are never included.
    #[builder(default = "strings(IGNORED_EXTENSIONS)")]
    pub ignored_extensions: Vec<String>,

    /// Glob patterns matched against the root-relative path of files.
    #[builder(default)]
    pub ignore_globs: Vec<String>,

    /// Extensions (with leading dot) treated as text.
    #[builder(default = "strings(TEXT_EXTENSIONS)")]
    pub text_extensions: Vec<String>,

    /// Extensionless file names treated as text.
    #[builder(default = "strings(TEXT_FILE_NAMES)")]
    pub text_file_names: Vec<String>,

    /// Root-level documents promoted to the top of the digest, in order.
    #[builder(default = "strings(PRIORITY_DOCUMENTS)")]
    pub priority_documents: Vec<String>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_total_size: DEFAULT_MAX_TOTAL_SIZE,
            max_files: DEFAULT_MAX_FILES,
            max_depth: DEFAULT_MAX_DEPTH,
            chunk_size: DEFAULT_CHUNK_SIZE,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            ignored_dirs: strings(IGNORED_DIRS),
            ignored_files: strings(IGNORED_FILES),
            ignored_extensions: strings(IGNORED_EXTENSIONS),
            ignore_globs: Vec::new(),
            text_extensions: strings(TEXT_EXTENSIONS),
            text_file_names: strings(TEXT_FILE_NAMES),
            priority_documents: strings(PRIORITY_DOCUMENTS),
        }
    }
}

fn check_limits(
    max_file_size: u64,
    max_total_size: u64,
    max_files: u64,
    max_depth: usize,
    chunk_size: usize,
    event_channel_capacity: usize,
) -> Result<(), String> {
    if max_file_size == 0 || max_total_size == 0 || max_files == 0 || max_depth == 0 {
        return Err("Ceilings must be greater than zero".to_string());
    }
    if max_file_size > max_total_size {
        return Err(format!(
            "max_file_size ({max_file_size}) exceeds max_total_size ({max_total_size})"
        ));
    }
    if chunk_size == 0 {
        return Err("chunk_size must be greater than zero".to_string());
    }
    if event_channel_capacity == 0 {
        return Err("event_channel_capacity must be greater than zero".to_string());
    }
    Ok(())
}

impl DigestConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        check_limits(
            self.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE),
            self.max_total_size.unwrap_or(DEFAULT_MAX_TOTAL_SIZE),
            self.max_files.unwrap_or(DEFAULT_MAX_FILES),
            self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
            self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            self.event_channel_capacity
                .unwrap_or(DEFAULT_EVENT_CHANNEL_CAPACITY),
        )
    }
}

impl DigestConfig {
    /// Create a new config builder.
    pub fn builder() -> DigestConfigBuilder {
        DigestConfigBuilder::default()
    }

    /// Check the ceilings of an already constructed config.
    pub fn validate(&self) -> Result<(), DigestError> {
        check_limits(
            self.max_file_size,
            self.max_total_size,
            self.max_files,
            self.max_depth,
            self.chunk_size,
            self.event_channel_capacity,
        )
        .map_err(|message| DigestError::InvalidConfig { message })
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, DigestError> {
        let config: Self = toml::from_str(content).map_err(|e| DigestError::InvalidConfig {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> Result<Self, DigestError> {
        let content = std::fs::read_to_string(path).map_err(|e| DigestError::io(path, e))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded digest config");
        Ok(config)
    }

    /// Default config file location (`<config_dir>/gitscape/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gitscape").join("config.toml"))
    }

    /// Load the default config file if it exists, otherwise use defaults.
    pub fn load_or_default() -> Result<Self, DigestError> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = DigestConfig::builder()
            .max_file_size(100u64)
            .max_files(10u64)
            .ignored_dirs(vec!["vendor".to_string()])
            .build()
            .unwrap();

        assert_eq!(config.max_file_size, 100);
        assert_eq!(config.max_files, 10);
        assert_eq!(config.max_total_size, DEFAULT_MAX_TOTAL_SIZE);
        assert_eq!(config.ignored_dirs, vec!["vendor".to_string()]);
        assert!(config.text_extensions.contains(&".rs".to_string()));
    }

    #[test]
    fn test_default_ignores_build_output_and_vendored_code() {
        let config = DigestConfig::default();
        for dir in ["target", "dist", "build", "out", "vendor", "bower_components", "node_modules"] {
            assert!(config.ignored_dirs.iter().any(|d| d == dir), "{dir}");
        }
    }

    #[test]
    fn test_builder_rejects_zero_ceiling() {
        let result = DigestConfig::builder().max_files(0u64).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_file_ceiling_above_total() {
        let result = DigestConfig::builder()
            .max_file_size(200u64)
            .max_total_size(100u64)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_allow_list_and_ignore_set_are_disjoint() {
        let config = DigestConfig::default();
        for ext in &config.ignored_extensions {
            assert!(!config.text_extensions.contains(ext), "{ext} in both sets");
        }
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DigestConfig::from_toml_str("max_files = 42\nignore_globs = [\"*.lock\"]\n")
            .unwrap();
        assert_eq!(config.max_files, 42);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.ignore_globs, vec!["*.lock".to_string()]);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = DigestConfig::from_toml_str("max_files = 0").unwrap_err();
        assert!(matches!(err, DigestError::InvalidConfig { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "max_depth = 3\n").unwrap();

        let config = DigestConfig::load(&path).unwrap();
        assert_eq!(config.max_depth, 3);
    }
}
