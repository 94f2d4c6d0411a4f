//! Tracked files and change detection
//!
//! A [`TrackedFile`] answers two questions for the session: does the file
//! exist, and has it changed since a recorded [`FileSnapshot`]? Timestamps are
//! the cheap signal, content hashes the authoritative one.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use tracing::trace;

use crate::error::TaskError;

/// Recorded state of a file: content hash plus modification timestamp.
///
/// Both fields are empty when the file did not exist at snapshot time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    /// Hex digest of the file contents
    pub hash: String,
    /// Modification time, RFC 3339 UTC with nanoseconds
    pub timestamp: String,
}

impl FileSnapshot {
    /// Create a snapshot from its parts
    pub fn new(hash: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Snapshot of a file that does not exist
    pub fn missing() -> Self {
        Self::default()
    }

    /// Whether this snapshot records a missing file
    pub fn is_missing(&self) -> bool {
        self.hash.is_empty() && self.timestamp.is_empty()
    }
}

/// Digest function used to fingerprint file contents.
///
/// Only equality of digests matters, so any stable function works.
pub trait ContentHasher: Send + Sync {
    /// Digest `bytes` into a printable string
    fn digest(&self, bytes: &[u8]) -> String;
}

impl<F> ContentHasher for F
where
    F: Fn(&[u8]) -> String + Send + Sync,
{
    fn digest(&self, bytes: &[u8]) -> String {
        self(bytes)
    }
}

/// SHA-256 content hasher (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn digest(&self, bytes: &[u8]) -> String {
        format!("{:x}", Sha256::digest(bytes))
    }
}

/// SHA-512 content hasher
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha512Hasher;

impl ContentHasher for Sha512Hasher {
    fn digest(&self, bytes: &[u8]) -> String {
        format!("{:x}", Sha512::digest(bytes))
    }
}

/// A file whose state feeds into a task's freshness decision.
///
/// Identity is the canonical path: two `TrackedFile`s naming the same file
/// compare equal regardless of how the path was spelled or which hasher they
/// carry.
#[derive(Clone)]
pub struct TrackedFile {
    path: PathBuf,
    hasher: Arc<dyn ContentHasher>,
}

impl TrackedFile {
    /// Track `path` using the default SHA-256 hasher
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_hasher(path, Sha256Hasher)
    }

    /// Track `path` using a custom content hasher
    pub fn with_hasher(path: impl AsRef<Path>, hasher: impl ContentHasher + 'static) -> Self {
        Self {
            path: canonicalize(path.as_ref()),
            hasher: Arc::new(hasher),
        }
    }

    /// Canonical (absolute, normalized) path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether anything exists at this path
    pub async fn exists(&self) -> Result<bool, TaskError> {
        tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| TaskError::io(&self.path, e))
    }

    /// Modification time, or an empty string when the file is missing
    pub async fn timestamp(&self) -> Result<String, TaskError> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(String::new()),
            Err(e) => return Err(TaskError::io(&self.path, e)),
        };
        let modified = metadata
            .modified()
            .map_err(|e| TaskError::io(&self.path, e))?;
        Ok(DateTime::<Utc>::from(modified).to_rfc3339_opts(SecondsFormat::Nanos, true))
    }

    /// Content digest, or an empty string when the file is missing
    pub async fn hash(&self) -> Result<String, TaskError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(String::new()),
            Err(e) => return Err(TaskError::io(&self.path, e)),
        };
        trace!(path = %self.path.display(), bytes = contents.len(), "hashing file");
        Ok(self.hasher.digest(&contents))
    }

    /// Read the current state of the file. Always hashes.
    pub async fn snapshot(&self) -> Result<FileSnapshot, TaskError> {
        let hash = self.hash().await?;
        let timestamp = self.timestamp().await?;
        Ok(FileSnapshot { hash, timestamp })
    }

    /// Whether the file still matches `cached`.
    ///
    /// An unchanged timestamp is trusted without hashing. A changed timestamp
    /// only counts as a change if the content hash differs too.
    pub async fn is_fresh(&self, cached: Option<&FileSnapshot>) -> Result<bool, TaskError> {
        let Some(cached) = cached else {
            return Ok(false);
        };

        if self.timestamp().await? == cached.timestamp {
            return Ok(true);
        }

        Ok(self.hash().await? == cached.hash)
    }

    /// Return `cached` when the file is fresh, otherwise a new snapshot.
    ///
    /// The boolean reports whether the file was fresh.
    pub async fn snapshot_or_cached(
        &self,
        cached: Option<&FileSnapshot>,
    ) -> Result<(FileSnapshot, bool), TaskError> {
        if let Some(cached) = cached {
            if self.is_fresh(Some(cached)).await? {
                return Ok((cached.clone(), true));
            }
        }
        Ok((self.snapshot().await?, false))
    }
}

impl PartialEq for TrackedFile {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for TrackedFile {}

impl Hash for TrackedFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Debug for TrackedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TrackedFile").field(&self.path).finish()
    }
}

impl fmt::Display for TrackedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl From<&str> for TrackedFile {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for TrackedFile {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&PathBuf> for TrackedFile {
    fn from(path: &PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for TrackedFile {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

/// Make `path` absolute and fold `.`/`..` lexically.
///
/// The filesystem is not consulted, so targets that do not exist yet get the
/// same canonical form as they will once produced.
pub fn canonicalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn counting_hasher(counter: Arc<AtomicUsize>) -> impl ContentHasher {
        move |bytes: &[u8]| {
            counter.fetch_add(1, Ordering::SeqCst);
            Sha256Hasher.digest(bytes)
        }
    }

    fn shift_mtime(path: &Path, secs: u64) {
        let later = SystemTime::now() + Duration::from_secs(secs);
        filetime::set_file_mtime(path, filetime::FileTime::from_system_time(later)).unwrap();
    }

    #[test]
    fn test_canonicalize_folds_dots() {
        let path = canonicalize(Path::new("/tmp/a/./b/../c.txt"));
        assert_eq!(path, PathBuf::from("/tmp/a/c.txt"));
    }

    #[test]
    fn test_canonicalize_relative_is_absolute() {
        let path = canonicalize(Path::new("src/main.rs"));
        assert!(path.is_absolute());
        assert!(path.ends_with("src/main.rs"));
    }

    #[test]
    fn test_same_file_different_spelling_is_equal() {
        let a = TrackedFile::new("/work/out/../out/lib.a");
        let b = TrackedFile::with_hasher("/work/out/lib.a", Sha512Hasher);
        assert_eq!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_sha256_is_stable() {
        assert_eq!(
            Sha256Hasher.digest(b"A"),
            "559aead08264d5795d3909718cdd05abd49572e84fe55590eef31a88a08fdffd"
        );
    }

    #[tokio::test]
    async fn test_missing_file_sentinels() {
        let temp = TempDir::new().unwrap();
        let file = TrackedFile::new(temp.path().join("nope.txt"));

        assert!(!file.exists().await.unwrap());
        assert_eq!(file.timestamp().await.unwrap(), "");
        assert_eq!(file.hash().await.unwrap(), "");
        assert!(file.snapshot().await.unwrap().is_missing());
    }

    #[tokio::test]
    async fn test_snapshot_of_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("src.txt");
        std::fs::write(&path, "A").unwrap();

        let file = TrackedFile::new(&path);
        assert!(file.exists().await.unwrap());

        let snapshot = file.snapshot().await.unwrap();
        assert_eq!(snapshot.hash, Sha256Hasher.digest(b"A"));
        assert!(!snapshot.timestamp.is_empty());
    }

    #[tokio::test]
    async fn test_never_fresh_without_history() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("src.txt");
        std::fs::write(&path, "A").unwrap();

        let file = TrackedFile::new(&path);
        assert!(!file.is_fresh(None).await.unwrap());

        let (snapshot, fresh) = file.snapshot_or_cached(None).await.unwrap();
        assert!(!fresh);
        assert_eq!(snapshot.hash, Sha256Hasher.digest(b"A"));
    }

    #[tokio::test]
    async fn test_unchanged_timestamp_skips_hashing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("src.txt");
        std::fs::write(&path, "A").unwrap();

        let counter = Arc::new(AtomicUsize::new(0));
        let file = TrackedFile::with_hasher(&path, counting_hasher(counter.clone()));
        let cached = file.snapshot().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let (snapshot, fresh) = file.snapshot_or_cached(Some(&cached)).await.unwrap();
        assert!(fresh);
        assert_eq!(snapshot, cached);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_touched_file_with_same_content_is_fresh() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("src.txt");
        std::fs::write(&path, "A").unwrap();

        let counter = Arc::new(AtomicUsize::new(0));
        let file = TrackedFile::with_hasher(&path, counting_hasher(counter.clone()));
        let cached = file.snapshot().await.unwrap();

        shift_mtime(&path, 60);
        assert_ne!(file.timestamp().await.unwrap(), cached.timestamp);
        assert!(file.is_fresh(Some(&cached)).await.unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_changed_content_is_stale() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("src.txt");
        std::fs::write(&path, "A").unwrap();

        let file = TrackedFile::new(&path);
        let cached = file.snapshot().await.unwrap();

        std::fs::write(&path, "B").unwrap();
        shift_mtime(&path, 60);

        let (snapshot, fresh) = file.snapshot_or_cached(Some(&cached)).await.unwrap();
        assert!(!fresh);
        assert_eq!(snapshot.hash, Sha256Hasher.digest(b"B"));
    }

    #[tokio::test]
    async fn test_deleted_file_is_stale() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("src.txt");
        std::fs::write(&path, "A").unwrap();

        let file = TrackedFile::new(&path);
        let cached = file.snapshot().await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let (snapshot, fresh) = file.snapshot_or_cached(Some(&cached)).await.unwrap();
        assert!(!fresh);
        assert!(snapshot.is_missing());
    }
}
