//! Drift detection: did the shared directory change while we were syncing it?
//!
//! A fingerprint is a SHA-256 over the contents of every regular file under
//! the directory, visited recursively in lexicographic order. Each file's
//! contents are followed by its byte length (u64, little endian), so bytes
//! shifted between neighbouring files still change the digest. Directories
//! and symlinks contribute nothing. Two fingerprints bracket each sweep; if they
//! differ a [`DriftWarning`] is raised. Nothing is re-synced in response.

use chrono::Utc;
use ring::digest::{Context, SHA256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use synk_core::{DirectoryFingerprint, DriftWarning, Result, SynkError};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Buffer size for streaming file reads (64 KiB).
const BUF_SIZE: usize = 64 * 1024;

/// Fingerprint `dir`, blocking the current thread.
///
/// Files that cannot be read (or vanish during the walk) are logged and
/// skipped. Fails only if `dir` itself is not a readable directory.
pub fn fingerprint_blocking(dir: &Path) -> Result<DirectoryFingerprint> {
    if !dir.is_dir() {
        return Err(SynkError::Fingerprint {
            path: dir.to_path_buf(),
            reason: "not a directory".into(),
        });
    }

    let mut context = Context::new(&SHA256);
    let mut buf = vec![0u8; BUF_SIZE];
    let mut files = 0usize;

    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                if e.depth() == 0 {
                    return Err(SynkError::Fingerprint {
                        path: dir.to_path_buf(),
                        reason: e.to_string(),
                    });
                }
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        match hash_file(entry.path(), &mut context, &mut buf) {
            Ok(len) => context.update(&len.to_le_bytes()),
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "could not read file");
                continue;
            }
        }
        files += 1;
    }

    let digest = context.finish();
    let fingerprint = DirectoryFingerprint::new(hex::encode(digest.as_ref()));
    debug!(dir = %dir.display(), files, fingerprint = %fingerprint.short(), "fingerprinted directory");
    Ok(fingerprint)
}

/// Fingerprint `dir` on the blocking thread pool.
pub async fn fingerprint(dir: &Path) -> Result<DirectoryFingerprint> {
    let dir: PathBuf = dir.to_path_buf();
    let path = dir.clone();
    tokio::task::spawn_blocking(move || fingerprint_blocking(&dir))
        .await
        .map_err(|e| SynkError::Fingerprint {
            path,
            reason: format!("hashing task failed: {e}"),
        })?
}

/// Compare the fingerprints taken around a sweep.
///
/// Logs and returns a warning when they differ.
pub fn compare(before: &DirectoryFingerprint, after: &DirectoryFingerprint) -> Option<DriftWarning> {
    if before == after {
        return None;
    }

    let warning = DriftWarning {
        before: before.clone(),
        after: after.clone(),
        detected_at: Utc::now(),
    };
    warn!(
        before = %before.short(),
        after = %after.short(),
        "{warning}"
    );
    Some(warning)
}

/// Stream one file into the digest, returning how many bytes it held.
fn hash_file(path: &Path, context: &mut Context, buf: &mut [u8]) -> std::io::Result<u64> {
    let mut file = File::open(path)?;
    let mut len = 0u64;
    loop {
        let n = file.read(buf)?;
        if n == 0 {
            break;
        }
        context.update(&buf[..n]);
        len += n as u64;
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_empty_directory_is_digest_of_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fp = fingerprint_blocking(dir.path()).unwrap();
        assert_eq!(
            fp.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_single_file_is_contents_then_length() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello world").unwrap();

        // sha256("hello world" ++ 11u64 little endian)
        let fp = fingerprint_blocking(dir.path()).unwrap();
        assert_eq!(
            fp.as_str(),
            "7021d11bdb2f18d577037b4cb35ce3fbab346615277e8395d013eedf6df122b2"
        );
    }

    #[test]
    fn test_order_is_lexicographic_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b").join("inner.txt"), "world").unwrap();
        fs::write(dir.path().join("a.txt"), "hello ").unwrap();

        // "a.txt" sorts before "b", so "hello " is hashed first
        let fp = fingerprint_blocking(dir.path()).unwrap();
        assert_eq!(
            fp.as_str(),
            "70874010b86e6152e8efe8e635489fd3e88ffff2ef9d1b144c5ea61e0c4bf4c1"
        );
    }

    #[test]
    fn test_bytes_moved_between_files_change_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a"), "ab").unwrap();
        fs::write(dir.path().join("b"), "c").unwrap();
        let before = fingerprint_blocking(dir.path()).unwrap();

        fs::write(dir.path().join("a"), "a").unwrap();
        fs::write(dir.path().join("b"), "bc").unwrap();
        let after = fingerprint_blocking(dir.path()).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_directories_and_symlinks_excluded() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        let before = fingerprint_blocking(dir.path()).unwrap();

        fs::create_dir(dir.path().join("empty")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("a.txt"), dir.path().join("z.link")).unwrap();
        let after = fingerprint_blocking(dir.path()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_content_change_changes_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        let before = fingerprint_blocking(dir.path()).unwrap();

        fs::write(dir.path().join("a.txt"), "xy").unwrap();
        let after = fingerprint_blocking(dir.path()).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = fingerprint_blocking(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, SynkError::Fingerprint { .. }));
    }

    #[test]
    fn test_compare() {
        let a = DirectoryFingerprint::new("aa");
        let b = DirectoryFingerprint::new("bb");
        assert!(compare(&a, &a.clone()).is_none());

        let warning = compare(&a, &b).unwrap();
        assert_eq!(warning.before, a);
        assert_eq!(warning.after, b);
    }

    #[tokio::test]
    async fn test_async_fingerprint_matches_blocking() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        assert_eq!(
            fingerprint(dir.path()).await.unwrap(),
            fingerprint_blocking(dir.path()).unwrap()
        );
    }
}
