//! Hierarchical filesystem view over a flat key store.
//!
//! [`StorageFs`] turns the six [`Storage`] primitives into the
//! [`VirtualFs`] contract. Directories are inferred: `photos` is a directory
//! when the store has anything filed under `photos/`. Every stat record is
//! synthesized, and operations the store cannot express are refused with
//! [`FsError::Unsupported`].

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::error::{FsError, FsResult};
use super::ops::VirtualFs;
use super::path::{self, as_text};
use super::storage::Storage;
use super::types::{GROUP_NAME, OWNER_NAME, OpenMode, Operation, SEP, StatRecord, unix_seconds};
use crate::session::Session;

/// Filesystem adapter bound to one protocol session.
///
/// Holds the backing store, the session root and the cursor. The cursor is
/// the only state that changes after construction, and only through
/// [`VirtualFs::chdir`].
#[derive(Debug)]
pub struct StorageFs<S: Storage> {
    storage: S,
    session: Session,
    root: String,
    cwd: String,
}

impl<S: Storage> StorageFs<S> {
    /// Create an adapter over an already constructed store.
    ///
    /// `root` is the key prefix protocol `/` maps onto (`""` or `"/"` for
    /// the whole store).
    pub fn new(root: &str, session: Session, storage: S) -> Self {
        let root = path::normalize_root(root);
        tracing::debug!(root = %root, user = %session.user, session = %session.id, "filesystem adapter created");
        Self {
            storage,
            session,
            root,
            cwd: SEP.to_string(),
        }
    }

    /// Create an adapter from a store factory.
    ///
    /// A factory failure surfaces as [`FsError::NoBackend`], so a session
    /// never starts without a store.
    pub fn connect<F, E>(root: &str, session: Session, factory: F) -> FsResult<Self>
    where
        F: FnOnce() -> Result<S, E>,
        E: Into<FsError>,
    {
        let storage = factory().map_err(|e| match e.into() {
            FsError::NoBackend(reason) => FsError::NoBackend(reason),
            other => FsError::no_backend(other.to_string()),
        })?;
        Ok(Self::new(root, session, storage))
    }

    /// The backing store.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The session this adapter serves.
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn is_root_sentinel(key: &str) -> bool {
        key.is_empty() || key == "/"
    }

    /// Key form the store expects for existence probes.
    fn exists_key(key: &str) -> &str {
        if key == "/" { "" } else { key }
    }

    /// Directory probe at the separator form of `key`.
    async fn probe_dir(&self, key: &str) -> FsResult<bool> {
        if Self::is_root_sentinel(key) {
            return Ok(true);
        }
        let found = if key.ends_with(SEP) {
            self.storage.dir_exists(key).await?
        } else {
            self.storage.dir_exists(&format!("{key}/")).await?
        };
        Ok(found)
    }

    async fn exists(&self, key: &str) -> FsResult<bool> {
        Ok(self.storage.exists(Self::exists_key(key)).await?)
    }
}

#[async_trait]
impl<S: Storage> VirtualFs for StorageFs<S> {
    type File = S::File;

    fn root(&self) -> &str {
        &self.root
    }

    fn cwd(&self) -> &str {
        &self.cwd
    }

    #[tracing::instrument(skip(self), name = "fs.open", fields(user = %self.session.user, session = %self.session.id))]
    async fn open(&self, path: &Path, mode: OpenMode) -> FsResult<S::File> {
        let key = self.ftp2fs(as_text(path)?);
        Ok(self.storage.open(&key, mode).await?)
    }

    async fn mkstemp(
        &self,
        _suffix: &str,
        _prefix: &str,
        _dir: Option<&Path>,
        _mode: OpenMode,
    ) -> FsResult<S::File> {
        Err(FsError::unsupported(Operation::Mkstemp))
    }

    #[tracing::instrument(skip(self), name = "fs.remove", fields(user = %self.session.user, session = %self.session.id))]
    async fn remove(&self, path: &Path) -> FsResult<()> {
        let key = as_text(path)?;
        self.storage.remove(key).await?;
        tracing::info!(key = %key, "removed");
        Ok(())
    }

    async fn rename(&self, _src: &Path, _dst: &Path) -> FsResult<()> {
        Err(FsError::unsupported(Operation::Rename))
    }

    async fn chmod(&self, _path: &Path, _mode: u32) -> FsResult<()> {
        Err(FsError::unsupported(Operation::Chmod))
    }

    async fn utime(&self, _path: &Path, _mtime: SystemTime) -> FsResult<()> {
        Err(FsError::unsupported(Operation::Utime))
    }

    #[tracing::instrument(skip(self), name = "fs.chdir", fields(user = %self.session.user, session = %self.session.id))]
    fn chdir(&mut self, path: &Path) -> FsResult<()> {
        let key = as_text(path)?;
        self.cwd = self.fs2ftp(key);
        Ok(())
    }

    async fn mkdir(&self, _path: &Path) -> FsResult<()> {
        Err(FsError::unsupported(Operation::Mkdir))
    }

    async fn rmdir(&self, _path: &Path) -> FsResult<()> {
        Err(FsError::unsupported(Operation::Rmdir))
    }

    #[tracing::instrument(skip(self), name = "fs.listdir", fields(user = %self.session.user, session = %self.session.id))]
    async fn listdir(&self, path: &Path) -> FsResult<Vec<String>> {
        let key = Self::exists_key(as_text(path)?);
        let listing = self.storage.listdir(key).await?;

        let mut names = Vec::with_capacity(listing.len());
        names.extend(listing.dirs.into_iter().map(|d| format!("{d}/")));
        names.extend(listing.files);
        Ok(names)
    }

    #[tracing::instrument(skip(self), name = "fs.stat", fields(user = %self.session.user, session = %self.session.id))]
    async fn stat(&self, path: &Path) -> FsResult<StatRecord> {
        let key = as_text(path)?;
        let is_dir = self.probe_dir(key).await?;

        // Directories are queried at their separator form; a bare `photos`
        // is not a key the store knows.
        let query = if is_dir && !key.ends_with(SEP) && !key.is_empty() {
            format!("{key}/")
        } else {
            Self::exists_key(key).to_string()
        };

        let size = self.storage.size(&query).await?;
        let created = self.storage.created_time(&query).await?;
        Ok(StatRecord::synthesize(is_dir, size, unix_seconds(created)))
    }

    async fn readlink(&self, _path: &Path) -> FsResult<PathBuf> {
        Err(FsError::unsupported(Operation::Readlink))
    }

    async fn isfile(&self, path: &Path) -> FsResult<bool> {
        let key = as_text(path)?;
        if key.ends_with(SEP) {
            return Ok(false);
        }
        self.exists(key).await
    }

    async fn isdir(&self, path: &Path) -> FsResult<bool> {
        self.probe_dir(as_text(path)?).await
    }

    async fn islink(&self, path: &Path) -> FsResult<bool> {
        as_text(path)?;
        Ok(false)
    }

    async fn lexists(&self, path: &Path) -> FsResult<bool> {
        self.exists(as_text(path)?).await
    }

    async fn getsize(&self, path: &Path) -> FsResult<u64> {
        let key = as_text(path)?;
        Ok(self.storage.size(Self::exists_key(key)).await?)
    }

    async fn getmtime(&self, path: &Path) -> FsResult<i64> {
        let key = as_text(path)?;
        let created = self.storage.created_time(Self::exists_key(key)).await?;
        Ok(unix_seconds(created))
    }

    fn realpath(&self, path: &Path) -> FsResult<PathBuf> {
        as_text(path)?;
        Ok(path.to_path_buf())
    }

    fn get_user_by_uid(&self, _uid: u32) -> String {
        OWNER_NAME.to_string()
    }

    fn get_group_by_gid(&self, _gid: u32) -> String {
        GROUP_NAME.to_string()
    }
}
