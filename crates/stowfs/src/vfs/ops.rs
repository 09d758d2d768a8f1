//! Filesystem contract consumed by protocol servers.
//!
//! This is the surface an FTP-style server drives: path translation, file
//! handles, listings and stat records. Protocol servers depend on this trait,
//! never on a concrete adapter.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::error::FsResult;
use super::listing;
use super::path;
use super::types::{EntryKind, Fact, OpenMode, StatRecord, unix_seconds};

/// Core filesystem operations for a protocol session.
///
/// Paths passed to [`VirtualFs::open`] are protocol paths, resolved against
/// the cursor. Every other path argument is a key as produced by
/// [`VirtualFs::ftp2fs`]. All path arguments must be valid UTF-8.
#[async_trait]
pub trait VirtualFs: Send + Sync {
    /// File handle type returned by [`VirtualFs::open`].
    type File: Send;

    // ========================================================================
    // Session state and path translation
    // ========================================================================

    /// Session root key prefix (`""` for the whole store).
    fn root(&self) -> &str;

    /// Current directory, as a protocol path.
    fn cwd(&self) -> &str;

    /// Normalize a protocol path against the cursor.
    fn ftpnorm(&self, ftp_path: &str) -> String {
        path::normalize(self.cwd(), ftp_path)
    }

    /// Translate a protocol path into a store key.
    fn ftp2fs(&self, ftp_path: &str) -> String {
        path::to_key(self.root(), &self.ftpnorm(ftp_path))
    }

    /// Translate a store key into the protocol path it is visible as.
    fn fs2ftp(&self, key: &str) -> String {
        path::from_key(self.root(), key)
    }

    /// Whether a key lies inside this session's root.
    fn validpath(&self, key: &str) -> bool {
        path::is_under_root(self.root(), key)
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Open a file relative to the cursor.
    async fn open(&self, path: &Path, mode: OpenMode) -> FsResult<Self::File>;

    /// Create a staging file for an upload.
    async fn mkstemp(
        &self,
        suffix: &str,
        prefix: &str,
        dir: Option<&Path>,
        mode: OpenMode,
    ) -> FsResult<Self::File>;

    /// Remove a file.
    async fn remove(&self, path: &Path) -> FsResult<()>;

    /// Rename a file or directory.
    async fn rename(&self, src: &Path, dst: &Path) -> FsResult<()>;

    /// Change permission bits.
    async fn chmod(&self, path: &Path, mode: u32) -> FsResult<()>;

    /// Set the modification time.
    async fn utime(&self, path: &Path, mtime: SystemTime) -> FsResult<()>;

    // ========================================================================
    // Directories
    // ========================================================================

    /// Change the current directory.
    fn chdir(&mut self, path: &Path) -> FsResult<()>;

    /// Create a directory.
    async fn mkdir(&self, path: &Path) -> FsResult<()>;

    /// Remove a directory.
    async fn rmdir(&self, path: &Path) -> FsResult<()>;

    /// List a directory: sub-directory names with a trailing `/`, then files.
    async fn listdir(&self, path: &Path) -> FsResult<Vec<String>>;

    /// Listing used for `LIST`/`MLSD`; same as [`VirtualFs::listdir`] unless
    /// overridden.
    async fn listdirinfo(&self, path: &Path) -> FsResult<Vec<String>> {
        self.listdir(path).await
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Synthesize a stat record.
    async fn stat(&self, path: &Path) -> FsResult<StatRecord>;

    /// Stat without following links. Identical to [`VirtualFs::stat`] when
    /// links do not exist.
    async fn lstat(&self, path: &Path) -> FsResult<StatRecord> {
        self.stat(path).await
    }

    /// Read a symbolic link target.
    async fn readlink(&self, path: &Path) -> FsResult<PathBuf>;

    async fn isfile(&self, path: &Path) -> FsResult<bool>;

    async fn isdir(&self, path: &Path) -> FsResult<bool>;

    async fn islink(&self, path: &Path) -> FsResult<bool>;

    async fn lexists(&self, path: &Path) -> FsResult<bool>;

    async fn getsize(&self, path: &Path) -> FsResult<u64>;

    /// Modification time in epoch seconds.
    async fn getmtime(&self, path: &Path) -> FsResult<i64>;

    /// Canonical form of a path.
    fn realpath(&self, path: &Path) -> FsResult<PathBuf>;

    fn get_user_by_uid(&self, uid: u32) -> String;

    fn get_group_by_gid(&self, gid: u32) -> String;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Three-way classification of a path.
    async fn classify(&self, path: &Path) -> FsResult<EntryKind> {
        if self.isdir(path).await? {
            Ok(EntryKind::Directory)
        } else if self.isfile(path).await? {
            Ok(EntryKind::File)
        } else {
            Ok(EntryKind::Missing)
        }
    }

    /// Render `LIST` lines for `names` inside `basedir`.
    ///
    /// Entries that cannot be stat'ed are skipped.
    async fn format_list(&self, basedir: &Path, names: &[String]) -> FsResult<Vec<String>> {
        let dir = path::as_text(basedir)?;
        let now = unix_seconds(SystemTime::now());
        let mut lines = Vec::with_capacity(names.len());
        for name in names {
            let key = path::join_key(dir, name);
            let st = match self.lstat(Path::new(&key)).await {
                Ok(st) => st,
                Err(e) => {
                    tracing::debug!(key = %key, error = %e, "skipping unlistable entry");
                    continue;
                }
            };
            let owner = self.get_user_by_uid(st.uid);
            let group = self.get_group_by_gid(st.gid);
            lines.push(listing::list_line(name, &st, &owner, &group, now));
        }
        Ok(lines)
    }

    /// Render `MLSD`/`MLST` lines for `names` inside `basedir`.
    ///
    /// `perms` is the user's permission string; `facts` selects the facts
    /// to report. Entries that cannot be stat'ed are skipped.
    async fn format_mlsx(
        &self,
        basedir: &Path,
        names: &[String],
        perms: &str,
        facts: &[Fact],
    ) -> FsResult<Vec<String>> {
        let dir = path::as_text(basedir)?;
        let mut lines = Vec::with_capacity(names.len());
        for name in names {
            let key = path::join_key(dir, name);
            match self.lstat(Path::new(&key)).await {
                Ok(st) => lines.push(listing::mlsx_line(name, &st, perms, facts)),
                Err(e) => {
                    tracing::debug!(key = %key, error = %e, "skipping unlistable entry");
                }
            }
        }
        Ok(lines)
    }
}
