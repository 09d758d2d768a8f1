//! Local directory store.
//!
//! Serves keys out of a directory tree, with path security to prevent
//! escaping the root directory. Sub-directories play the part of key
//! prefixes.

use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

use crate::vfs::storage::{Listing, Storage};
use crate::vfs::types::{OpenMode, SEP};

/// Local directory store.
///
/// All keys are relative to `root`. For example, if `root` is
/// `/srv/ftp`, then the key `photos/cat.jpg` is the file
/// `/srv/ftp/photos/cat.jpg`.
///
/// Path security is enforced: `..` components and symlinks leading outside
/// the root are rejected.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    read_only: bool,
}

impl LocalStorage {
    /// Create a store rooted at the given directory.
    ///
    /// The root is canonicalized at construction time to handle symlinks
    /// (e.g. macOS `/tmp` → `/private/tmp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        Self {
            root,
            read_only: false,
        }
    }

    /// Set whether this store is read-only.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Returns true if writes are refused.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to an absolute path within the root.
    ///
    /// Returns `PermissionDenied` if the key escapes the root.
    fn resolve(&self, key: &str) -> io::Result<PathBuf> {
        let rel = Path::new(key.trim_start_matches(SEP));
        if rel.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(Self::escapes(key));
        }
        if rel.as_os_str().is_empty() {
            return Ok(self.root.clone());
        }

        // Canonicalize the nearest existing ancestor so symlinks anywhere on
        // the path are resolved, then re-append the components that do not
        // exist yet. `symlink_metadata` stops at dangling links, which then
        // fail to canonicalize.
        let full = self.root.join(rel);
        let mut existing = full.as_path();
        let mut missing = Vec::new();
        while std::fs::symlink_metadata(existing).is_err() {
            match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_owned());
                    existing = parent;
                }
                _ => break,
            }
        }

        let mut canonical = dunce::canonicalize(existing)?;
        if !canonical.starts_with(&self.root) {
            return Err(Self::escapes(key));
        }
        for name in missing.into_iter().rev() {
            canonical.push(name);
        }
        Ok(canonical)
    }

    fn escapes(key: &str) -> io::Error {
        io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("key escapes storage root: {key}"),
        )
    }

    /// Remove directories left empty by a removal, up to the root.
    ///
    /// A prefix stops existing once its last key is gone.
    async fn prune_empty_parents(&self, removed: &Path) {
        let mut dir = removed.parent();
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            // Fails on non-empty directories, which ends the walk.
            if fs::remove_dir(current).await.is_err() {
                break;
            }
            tracing::debug!(dir = %current.display(), "pruned empty directory");
            dir = current.parent();
        }
    }

    /// Check if write operations are allowed.
    fn check_writable(&self) -> io::Result<()> {
        if self.read_only {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "storage is read-only",
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    type File = fs::File;

    async fn open(&self, key: &str, mode: OpenMode) -> io::Result<fs::File> {
        if mode.writes() {
            self.check_writable()?;
        }
        let path = self.resolve(key)?;

        let mut options = fs::OpenOptions::new();
        match mode {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.append(true).create(true),
            OpenMode::ReadWrite => options.read(true).write(true),
        };

        if mode.writes() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
        }

        options.open(&path).await
    }

    async fn exists(&self, key: &str) -> io::Result<bool> {
        let path = self.resolve(key)?;
        match fs::metadata(&path).await {
            Ok(meta) if key.is_empty() || key.ends_with(SEP) => Ok(meta.is_dir()),
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if matches!(
                e.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
            ) =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn size(&self, key: &str) -> io::Result<u64> {
        let path = self.resolve(key)?;
        Ok(fs::metadata(&path).await?.len())
    }

    async fn created_time(&self, key: &str) -> io::Result<SystemTime> {
        let path = self.resolve(key)?;
        let meta = fs::metadata(&path).await?;
        // Not every platform/filesystem records birth time.
        meta.created().or_else(|_| meta.modified())
    }

    async fn listdir(&self, prefix: &str) -> io::Result<Listing> {
        let path = self.resolve(prefix)?;
        let mut listing = Listing::default();
        let mut dir = fs::read_dir(&path).await?;

        while let Some(entry) = dir.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!(name = ?raw, dir = %path.display(), "skipping non-UTF-8 entry");
                    continue;
                }
            };
            if entry.file_type().await?.is_dir() {
                listing.dirs.push(name);
            } else {
                listing.files.push(name);
            }
        }

        Ok(listing)
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        self.check_writable()?;
        let path = self.resolve(key)?;
        fs::remove_file(&path).await?;
        self.prune_empty_parents(&path).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn setup() -> (LocalStorage, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = LocalStorage::new(dir.path());
        (store, dir)
    }

    fn sorted(mut names: Vec<String>) -> Vec<String> {
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (store, dir) = setup();

        let mut f = store.open("notes/a.txt", OpenMode::Write).await.unwrap();
        f.write_all(b"hello world").await.unwrap();
        f.flush().await.unwrap();
        drop(f);

        assert!(dir.path().join("notes/a.txt").is_file());

        let mut f = store.open("notes/a.txt", OpenMode::Read).await.unwrap();
        let mut out = String::new();
        f.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn test_append() {
        let (store, dir) = setup();
        std::fs::write(dir.path().join("log.txt"), "one\n").unwrap();

        let mut f = store.open("log.txt", OpenMode::Append).await.unwrap();
        f.write_all(b"two\n").await.unwrap();
        f.flush().await.unwrap();
        drop(f);

        assert_eq!(std::fs::read_to_string(dir.path().join("log.txt")).unwrap(), "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_exists_and_dir_probe() {
        let (store, dir) = setup();
        std::fs::create_dir(dir.path().join("photos")).unwrap();
        std::fs::write(dir.path().join("photos/cat.jpg"), "meow").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "hi").unwrap();

        assert!(store.exists("").await.unwrap());
        assert!(store.exists("photos/").await.unwrap());
        assert!(store.exists("readme.txt").await.unwrap());
        assert!(!store.exists("readme.txt/").await.unwrap());
        assert!(!store.exists("missing").await.unwrap());
        assert!(!store.exists("missing/").await.unwrap());
    }

    #[tokio::test]
    async fn test_size_and_created_time() {
        let (store, dir) = setup();
        std::fs::write(dir.path().join("a.bin"), vec![0u8; 2048]).unwrap();

        assert_eq!(store.size("a.bin").await.unwrap(), 2048);
        let created = store.created_time("a.bin").await.unwrap();
        assert!(created <= SystemTime::now());

        let err = store.size("nope.bin").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_listdir() {
        let (store, dir) = setup();
        std::fs::create_dir_all(dir.path().join("photos/2024")).unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("readme.txt"), "").unwrap();
        std::fs::write(dir.path().join("photos/cat.jpg"), "").unwrap();

        let root = store.listdir("").await.unwrap();
        assert_eq!(sorted(root.dirs), vec!["docs", "photos"]);
        assert_eq!(root.files, vec!["readme.txt"]);

        let photos = store.listdir("photos/").await.unwrap();
        assert_eq!(photos.dirs, vec!["2024"]);
        assert_eq!(photos.files, vec!["cat.jpg"]);

        let err = store.listdir("missing").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_remove() {
        let (store, dir) = setup();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();

        store.remove("a.txt").await.unwrap();
        assert!(!dir.path().join("a.txt").exists());

        std::fs::create_dir_all(dir.path().join("p/q")).unwrap();
        std::fs::write(dir.path().join("p/keep.txt"), "k").unwrap();
        std::fs::write(dir.path().join("p/q/gone.txt"), "g").unwrap();
        store.remove("p/q/gone.txt").await.unwrap();
        assert!(!dir.path().join("p/q").exists());
        assert!(dir.path().join("p").is_dir());
        assert!(!store.exists("p/q/").await.unwrap());

        let err = store.remove("a.txt").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_read_only() {
        let (mut store, dir) = setup();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        store.set_read_only(true);
        assert!(store.is_read_only());

        let err = store.open("b.txt", OpenMode::Write).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        let err = store.remove("a.txt").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);

        // Reads still work.
        assert!(store.open("a.txt", OpenMode::Read).await.is_ok());
    }

    #[tokio::test]
    async fn test_path_escape_blocked() {
        let (store, _dir) = setup();

        let err = store.open("../../../etc/passwd", OpenMode::Read).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);

        let err = store.exists("a/../../b").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_blocked() {
        let (store, dir) = setup();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "s").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("out")).unwrap();

        let err = store.open("out/secret.txt", OpenMode::Read).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_blocked_for_new_keys() {
        let (store, dir) = setup();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("out")).unwrap();

        for mode in [OpenMode::Write, OpenMode::Append] {
            let err = store.open("out/newdir/evil.txt", mode).await.unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        }
        let err = store.open("out/evil.txt", OpenMode::Write).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);

        assert!(!outside.path().join("newdir").exists());
        assert!(!outside.path().join("evil.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_symlink_not_followed_on_write() {
        let (store, dir) = setup();
        let outside = TempDir::new().unwrap();
        let target = outside.path().join("later");
        std::os::unix::fs::symlink(&target, dir.path().join("dangling")).unwrap();

        assert!(store.open("dangling/x.txt", OpenMode::Write).await.is_err());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_new_nested_key_stays_inside_root() {
        let (store, dir) = setup();
        let mut f = store.open("a/b/c.txt", OpenMode::Write).await.unwrap();
        f.write_all(b"x").await.unwrap();
        f.flush().await.unwrap();
        drop(f);
        assert!(dir.path().join("a/b/c.txt").is_file());
    }

    #[tokio::test]
    async fn test_directory_is_not_a_plain_key() {
        let (store, dir) = setup();
        std::fs::create_dir(dir.path().join("photos")).unwrap();
        std::fs::write(dir.path().join("photos/cat.jpg"), "meow").unwrap();

        assert!(!store.exists("photos").await.unwrap());
        assert!(store.exists("photos/").await.unwrap());
        assert!(store.exists("photos/cat.jpg").await.unwrap());
    }
}
