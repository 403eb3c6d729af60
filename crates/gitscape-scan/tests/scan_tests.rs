use std::fs;
use std::path::Path;

use gitscape_scan::{BudgetLimit, DigestConfig, RepoScanner, WarningKind};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn scan_paths(config: &DigestConfig, root: &Path) -> Vec<String> {
    RepoScanner::new(config)
        .unwrap()
        .scan(root)
        .unwrap()
        .files
        .iter()
        .map(|f| f.display_path())
        .collect()
}

#[test]
fn test_vendor_directory_is_pruned() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "README.md", &"r".repeat(50));
    write(temp.path(), "src/main.go", &"m".repeat(200));
    write(temp.path(), "vendor/lib.go", &"v".repeat(100));

    let config = DigestConfig::builder()
        .ignored_dirs(vec![".git".to_string(), "vendor".to_string()])
        .build()
        .unwrap();

    assert_eq!(scan_paths(&config, temp.path()), vec!["README.md", "src/main.go"]);
}

#[test]
fn test_default_config_skips_build_output_and_vendored_code() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/main.rs", "fn main() {}\n");
    write(temp.path(), "target/debug/deps/app-1234.d", "deps");
    write(temp.path(), "target/debug/build/out/bindings.rs", "pub fn x() {}");
    write(temp.path(), "dist/bundle.js", "console.log(1)");
    write(temp.path(), "vendor/lib.go", "package lib");
    write(temp.path(), "web/bower_components/jquery/jquery.js", "$");

    assert_eq!(scan_paths(&DigestConfig::default(), temp.path()), vec!["src/main.rs"]);
}

#[test]
fn test_oversized_file_is_recorded_as_skipped() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "big.txt", &"x".repeat(500));
    write(temp.path(), "small.txt", "ok");

    let config = DigestConfig::builder().max_file_size(100u64).build().unwrap();
    let outcome = RepoScanner::new(&config).unwrap().scan(temp.path()).unwrap();

    assert_eq!(outcome.files.len(), 1);
    assert_eq!(outcome.files[0].display_path(), "small.txt");
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].display_path(), "big.txt");
    assert_eq!(outcome.skipped[0].reason, BudgetLimit::FileSize);
    assert!(outcome.is_complete());
}

#[test]
fn test_total_size_ceiling_never_exceeded() {
    let temp = TempDir::new().unwrap();
    for name in ["a.txt", "b.txt", "c.txt", "d.txt"] {
        write(temp.path(), name, &"z".repeat(40));
    }

    let config = DigestConfig::builder()
        .max_file_size(50u64)
        .max_total_size(100u64)
        .build()
        .unwrap();
    let outcome = RepoScanner::new(&config).unwrap().scan(temp.path()).unwrap();

    assert_eq!(outcome.files.len(), 2);
    assert!(outcome.total_bytes() <= 100);
    let truncation = outcome.truncation.expect("scan should be truncated");
    assert_eq!(truncation.limit, BudgetLimit::TotalSize);
    assert_eq!(truncation.stopped_at, Path::new("c.txt"));
}

#[test]
fn test_order_is_lexicographic_by_path() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "b.rs", "");
    write(temp.path(), "a.txt", "");
    write(temp.path(), "a/z.rs", "");
    write(temp.path(), "A.md", "");

    let paths = scan_paths(&DigestConfig::default(), temp.path());
    assert_eq!(paths, vec!["A.md", "a/z.rs", "a.txt", "b.rs"]);
}

#[test]
fn test_repeated_scans_are_identical() {
    let temp = TempDir::new().unwrap();
    for i in 0..30 {
        write(temp.path(), &format!("dir{}/file{}.py", i % 4, i), "print()");
    }

    let config = DigestConfig::default();
    assert_eq!(scan_paths(&config, temp.path()), scan_paths(&config, temp.path()));
}

#[test]
fn test_hidden_text_files_are_included() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".gitignore", "target/");
    write(temp.path(), ".github/workflows/ci.yml", "on: push");

    let paths = scan_paths(&DigestConfig::default(), temp.path());
    assert_eq!(paths, vec![".github/workflows/ci.yml", ".gitignore"]);
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_never_followed() {
    let temp = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    write(outside.path(), "secret.txt", "outside the root");
    write(temp.path(), "inside.txt", "inside");
    std::os::unix::fs::symlink(outside.path(), temp.path().join("escape")).unwrap();
    std::os::unix::fs::symlink(temp.path().join("inside.txt"), temp.path().join("alias.txt"))
        .unwrap();
    std::os::unix::fs::symlink(temp.path(), temp.path().join("loop")).unwrap();

    let paths = scan_paths(&DigestConfig::default(), temp.path());
    assert_eq!(paths, vec!["inside.txt"]);
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_warned_not_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.txt", "a");
    write(temp.path(), "locked/secret.txt", "hidden");
    write(temp.path(), "z.txt", "z");
    let locked = temp.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Permission bits do not bind root.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = RepoScanner::new(&DigestConfig::default())
        .unwrap()
        .scan(temp.path());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let outcome = result.unwrap();
    let paths: Vec<_> = outcome.files.iter().map(|f| f.display_path()).collect();
    assert_eq!(paths, vec!["a.txt", "z.txt"]);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].kind, WarningKind::PermissionDenied);
}
