//! Backing store contract.
//!
//! A store is a flat map from text keys to byte blobs. Directories are not
//! objects: they exist only as shared key prefixes, so the whole contract is
//! six primitives plus one overridable probe.

use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::io::{AsyncRead, AsyncWrite};

use super::types::OpenMode;

/// Result of listing a key prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// First-level sub-prefixes, without trailing separator.
    pub dirs: Vec<String>,
    /// Leaf keys directly under the prefix, as bare names.
    pub files: Vec<String>,
}

impl Listing {
    /// Create a listing from dirs and files.
    pub fn new<D, F>(dirs: D, files: F) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.dirs.len() + self.files.len()
    }

    /// Returns true if nothing was listed.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }
}

/// Key-addressed storage backend.
///
/// Errors are plain `io::Error`s whose kinds the backend chooses; the adapter
/// forwards them without translation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Native file handle returned by [`Storage::open`].
    type File: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Open the blob at `key`.
    async fn open(&self, key: &str, mode: OpenMode) -> io::Result<Self::File>;

    /// Whether anything exists at `key`.
    ///
    /// A key ending in `/` asks whether any blob lives under that prefix.
    async fn exists(&self, key: &str) -> io::Result<bool>;

    /// Size of the blob at `key` in bytes.
    async fn size(&self, key: &str) -> io::Result<u64>;

    /// Creation time of the blob at `key`.
    async fn created_time(&self, key: &str) -> io::Result<SystemTime>;

    /// List sub-prefixes and leaf keys one level under `prefix`.
    ///
    /// `""` lists the top of the store. Order is the backend's own.
    async fn listdir(&self, prefix: &str) -> io::Result<Listing>;

    /// Delete the blob at `key`.
    async fn remove(&self, key: &str) -> io::Result<()>;

    /// Directory probe. `dir_key` always ends in `/` (or is empty).
    ///
    /// Stores with real directory markers override this; the default asks
    /// whether anything exists under the prefix.
    async fn dir_exists(&self, dir_key: &str) -> io::Result<bool> {
        self.exists(dir_key).await
    }
}

#[async_trait]
impl<S: Storage + ?Sized> Storage for Arc<S> {
    type File = S::File;

    async fn open(&self, key: &str, mode: OpenMode) -> io::Result<Self::File> {
        (**self).open(key, mode).await
    }

    async fn exists(&self, key: &str) -> io::Result<bool> {
        (**self).exists(key).await
    }

    async fn size(&self, key: &str) -> io::Result<u64> {
        (**self).size(key).await
    }

    async fn created_time(&self, key: &str) -> io::Result<SystemTime> {
        (**self).created_time(key).await
    }

    async fn listdir(&self, prefix: &str) -> io::Result<Listing> {
        (**self).listdir(prefix).await
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        (**self).remove(key).await
    }

    async fn dir_exists(&self, dir_key: &str) -> io::Result<bool> {
        (**self).dir_exists(dir_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_counts() {
        let listing = Listing::new(["photos", "docs"], ["readme.txt"]);
        assert_eq!(listing.len(), 3);
        assert!(!listing.is_empty());
        assert!(Listing::default().is_empty());
    }
}
