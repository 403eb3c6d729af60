//! Making a repository available on the local filesystem.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use git2::build::RepoBuilder;
use git2::{Cred, ErrorClass, ErrorCode, FetchOptions, RemoteCallbacks};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use gitscape_core::AcquisitionError;

const REMOTE_PREFIXES: [&str; 2] = ["https://", "http://"];

/// Transports libgit2 is built without.
const SSH_PREFIXES: [&str; 2] = ["ssh://", "git@"];

/// Where a repository comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// A git remote URL.
    Remote(String),
    /// A directory on this machine.
    Local(PathBuf),
}

impl SourceLocator {
    /// Parse user input. `http(s)://` URLs are remote, SSH remotes are
    /// rejected, everything else is a local path.
    pub fn parse(input: &str) -> Result<Self, AcquisitionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AcquisitionError::InvalidLocator {
                message: "source is empty".to_string(),
            });
        }

        if SSH_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix)) {
            return Err(AcquisitionError::InvalidLocator {
                message: format!("SSH remotes are not supported, use an https:// URL: {trimmed}"),
            });
        }
        if REMOTE_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix)) {
            Ok(Self::Remote(trimmed.to_string()))
        } else {
            Ok(Self::Local(PathBuf::from(trimmed)))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Label used in the digest header.
    pub fn label(&self) -> String {
        match self {
            Self::Remote(url) => url.clone(),
            Self::Local(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Access token for private remotes.
#[derive(Clone)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub(crate) fn secret(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// A repository checked out locally.
///
/// Remote checkouts live in a temporary directory that is removed when
/// this value is dropped.
#[derive(Debug)]
pub struct AcquiredRepository {
    root: PathBuf,
    label: String,
    checkout: Option<TempDir>,
}

impl AcquiredRepository {
    /// Wrap an existing local directory.
    pub fn local(root: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            label: label.into(),
            checkout: None,
        }
    }

    /// Directory to digest.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Label for the digest header.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the checkout is temporary.
    pub fn is_temporary(&self) -> bool {
        self.checkout.is_some()
    }

    /// Narrow the root to a subdirectory, which must stay inside the
    /// repository.
    pub fn with_subpath(mut self, subpath: &Path) -> Result<Self, AcquisitionError> {
        let escapes = subpath
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(AcquisitionError::InvalidLocator {
                message: format!("subpath must be relative and inside the repository: {}", subpath.display()),
            });
        }

        let candidate = self.root.join(subpath);
        let resolved = candidate.canonicalize().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AcquisitionError::NotFound {
                locator: format!("{}/{}", self.label, subpath.display()),
            },
            _ => AcquisitionError::Io {
                path: candidate.clone(),
                source: e,
            },
        })?;

        // A symlinked subpath can still point outside.
        if !resolved.starts_with(&self.root) {
            return Err(AcquisitionError::InvalidLocator {
                message: format!("subpath resolves outside the repository: {}", subpath.display()),
            });
        }
        if !resolved.is_dir() {
            return Err(AcquisitionError::InvalidLocator {
                message: format!("subpath is not a directory: {}", subpath.display()),
            });
        }

        tracing::debug!(root = %resolved.display(), "Narrowed digest root");
        self.root = resolved;
        Ok(self)
    }
}

/// Makes repositories available locally. Runs on a blocking thread.
///
/// Long transfers should poll `cancel` and give up with
/// `AcquisitionError::Cancelled` once it fires.
pub trait Acquirer: Send + Sync {
    fn acquire(
        &self,
        source: &SourceLocator,
        credentials: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> Result<AcquiredRepository, AcquisitionError>;
}

/// Opens local directories and shallow-clones remotes with libgit2.
#[derive(Debug, Clone)]
pub struct RepositoryAcquirer {
    clone_depth: i32,
}

impl Default for RepositoryAcquirer {
    fn default() -> Self {
        Self { clone_depth: 1 }
    }
}

impl RepositoryAcquirer {
    pub fn new() -> Self {
        Self::default()
    }

    /// History depth for remote clones; 0 fetches everything.
    pub fn with_clone_depth(mut self, depth: i32) -> Self {
        self.clone_depth = depth.max(0);
        self
    }

    fn open_local(&self, path: &Path) -> Result<AcquiredRepository, AcquisitionError> {
        let root = path.canonicalize().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AcquisitionError::NotFound {
                locator: path.display().to_string(),
            },
            _ => AcquisitionError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        if !root.is_dir() {
            return Err(AcquisitionError::InvalidLocator {
                message: format!("not a directory: {}", path.display()),
            });
        }

        tracing::info!(root = %root.display(), "Using local repository");
        Ok(AcquiredRepository::local(root, path.display().to_string()))
    }

    fn clone_remote(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> Result<AcquiredRepository, AcquisitionError> {
        if cancel.is_cancelled() {
            return Err(AcquisitionError::Cancelled);
        }

        let checkout = tempfile::Builder::new()
            .prefix("gitscape-")
            .tempdir()
            .map_err(|e| AcquisitionError::Io {
                path: std::env::temp_dir(),
                source: e,
            })?;

        let mut callbacks = RemoteCallbacks::new();
        if let Some(credentials) = credentials {
            let token = credentials.secret().to_string();
            let mut attempted = false;
            // libgit2 keeps asking while the callback succeeds; answer once.
            callbacks.credentials(move |_url, _username, _allowed| {
                if attempted {
                    return Err(git2::Error::new(
                        ErrorCode::Auth,
                        ErrorClass::Callback,
                        "credentials rejected",
                    ));
                }
                attempted = true;
                Cred::userpass_plaintext("x-access-token", &token)
            });
        }

        let transfer_token = cancel.clone();
        callbacks.transfer_progress(move |_progress| !transfer_token.is_cancelled());

        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(callbacks);
        if self.clone_depth > 0 {
            fetch.depth(self.clone_depth);
        }

        tracing::info!(url, depth = self.clone_depth, "Cloning repository");
        RepoBuilder::new()
            .fetch_options(fetch)
            .clone(url, checkout.path())
            .map_err(|e| {
                if cancel.is_cancelled() {
                    tracing::info!(url, "Clone aborted on cancellation");
                    AcquisitionError::Cancelled
                } else {
                    map_git_error(url, &e)
                }
            })?;

        let root = checkout.path().canonicalize().map_err(|e| AcquisitionError::Io {
            path: checkout.path().to_path_buf(),
            source: e,
        })?;

        Ok(AcquiredRepository {
            root,
            label: url.to_string(),
            checkout: Some(checkout),
        })
    }
}

impl Acquirer for RepositoryAcquirer {
    fn acquire(
        &self,
        source: &SourceLocator,
        credentials: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> Result<AcquiredRepository, AcquisitionError> {
        match source {
            SourceLocator::Local(path) => self.open_local(path),
            SourceLocator::Remote(url) => self.clone_remote(url, credentials, cancel),
        }
    }
}

fn map_git_error(locator: &str, err: &git2::Error) -> AcquisitionError {
    let locator = locator.to_string();
    match (err.code(), err.class()) {
        (ErrorCode::Auth, _) => AcquisitionError::Auth { locator },
        (ErrorCode::NotFound, _) => AcquisitionError::NotFound { locator },
        _ if err.message().contains("unsupported URL protocol") => {
            AcquisitionError::InvalidLocator {
                message: format!("unsupported transport: {locator}"),
            }
        }
        (_, ErrorClass::Http) if err.message().contains("404") => {
            AcquisitionError::NotFound { locator }
        }
        (_, ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssl | ErrorClass::Ssh) => {
            AcquisitionError::Network {
                locator,
                message: err.message().to_string(),
            }
        }
        _ => AcquisitionError::Git {
            message: err.message().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_locators() {
        assert!(SourceLocator::parse("https://github.com/a/b.git").unwrap().is_remote());
        assert!(SourceLocator::parse("http://localhost/a/b.git").unwrap().is_remote());
        assert_eq!(
            SourceLocator::parse("  ./repo ").unwrap(),
            SourceLocator::Local(PathBuf::from("./repo"))
        );
        assert!(matches!(
            SourceLocator::parse("   "),
            Err(AcquisitionError::InvalidLocator { .. })
        ));
    }

    #[test]
    fn test_ssh_remotes_are_rejected() {
        for input in ["git@github.com:a/b.git", "ssh://git@127.0.0.1:1/a/b.git"] {
            assert!(
                matches!(
                    SourceLocator::parse(input),
                    Err(AcquisitionError::InvalidLocator { .. })
                ),
                "{input}"
            );
        }
    }

    #[test]
    fn test_cancelled_clone_never_starts() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let source = SourceLocator::parse("https://127.0.0.1:1/a/b.git").unwrap();

        let result = RepositoryAcquirer::new().acquire(&source, None, &cancel);
        assert!(matches!(result, Err(AcquisitionError::Cancelled)));
    }

    #[test]
    fn test_credentials_are_redacted() {
        let creds = Credentials::token("ghp_secret");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_local_acquisition() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = SourceLocator::Local(temp.path().to_path_buf());
        let repo = RepositoryAcquirer::new()
            .acquire(&source, None, &CancellationToken::new())
            .unwrap();

        assert_eq!(repo.root(), temp.path().canonicalize().unwrap());
        assert!(!repo.is_temporary());
    }

    #[test]
    fn test_local_errors() {
        let temp = tempfile::TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        let missing = SourceLocator::Local(temp.path().join("nope"));
        assert!(matches!(
            RepositoryAcquirer::new().acquire(&missing, None, &cancel),
            Err(AcquisitionError::NotFound { .. })
        ));

        let file = temp.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            RepositoryAcquirer::new().acquire(&SourceLocator::Local(file), None, &cancel),
            Err(AcquisitionError::InvalidLocator { .. })
        ));
    }

    #[test]
    fn test_subpath_must_stay_inside() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("docs/api")).unwrap();
        let acquire = || {
            RepositoryAcquirer::new()
                .acquire(
                    &SourceLocator::Local(temp.path().to_path_buf()),
                    None,
                    &CancellationToken::new(),
                )
                .unwrap()
        };

        let narrowed = acquire().with_subpath(Path::new("docs/api")).unwrap();
        assert!(narrowed.root().ends_with("docs/api"));

        assert!(matches!(
            acquire().with_subpath(Path::new("../elsewhere")),
            Err(AcquisitionError::InvalidLocator { .. })
        ));
        assert!(matches!(
            acquire().with_subpath(Path::new("missing")),
            Err(AcquisitionError::NotFound { .. })
        ));
    }

    #[test]
    fn test_git_error_mapping() {
        let url = "https://example.com/a.git";
        let auth = git2::Error::new(ErrorCode::Auth, ErrorClass::Http, "auth required");
        assert!(matches!(map_git_error(url, &auth), AcquisitionError::Auth { .. }));

        let missing = git2::Error::new(
            ErrorCode::GenericError,
            ErrorClass::Http,
            "unexpected http status code: 404",
        );
        assert!(matches!(map_git_error(url, &missing), AcquisitionError::NotFound { .. }));

        let net = git2::Error::new(ErrorCode::GenericError, ErrorClass::Net, "connection refused");
        assert!(matches!(map_git_error(url, &net), AcquisitionError::Network { .. }));

        let ssh = git2::Error::new(
            ErrorCode::GenericError,
            ErrorClass::Net,
            "unsupported URL protocol",
        );
        assert!(matches!(map_git_error(url, &ssh), AcquisitionError::InvalidLocator { .. }));

        let other = git2::Error::new(ErrorCode::GenericError, ErrorClass::Odb, "corrupt");
        assert!(matches!(map_git_error(url, &other), AcquisitionError::Git { .. }));
    }
}
