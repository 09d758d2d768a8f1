//! Runtime-selected backend.
//!
//! Configuration picks the store at startup, so the adapter needs one
//! concrete `Storage` type covering every choice.

use async_trait::async_trait;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::SystemTime;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::{LocalStorage, MemoryFile, MemoryStorage};
use crate::vfs::storage::{Listing, Storage};
use crate::vfs::types::OpenMode;

/// Either built-in backend.
#[derive(Debug, Clone)]
pub enum AnyStorage {
    Memory(MemoryStorage),
    Local(LocalStorage),
}

impl AnyStorage {
    /// Short backend name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AnyStorage::Memory(_) => "memory",
            AnyStorage::Local(_) => "local",
        }
    }
}

impl From<MemoryStorage> for AnyStorage {
    fn from(store: MemoryStorage) -> Self {
        AnyStorage::Memory(store)
    }
}

impl From<LocalStorage> for AnyStorage {
    fn from(store: LocalStorage) -> Self {
        AnyStorage::Local(store)
    }
}

/// File handle of an [`AnyStorage`].
#[derive(Debug)]
pub enum AnyFile {
    Memory(MemoryFile),
    Local(tokio::fs::File),
}

#[async_trait]
impl Storage for AnyStorage {
    type File = AnyFile;

    async fn open(&self, key: &str, mode: OpenMode) -> io::Result<AnyFile> {
        match self {
            AnyStorage::Memory(s) => s.open(key, mode).await.map(AnyFile::Memory),
            AnyStorage::Local(s) => s.open(key, mode).await.map(AnyFile::Local),
        }
    }

    async fn exists(&self, key: &str) -> io::Result<bool> {
        match self {
            AnyStorage::Memory(s) => s.exists(key).await,
            AnyStorage::Local(s) => s.exists(key).await,
        }
    }

    async fn size(&self, key: &str) -> io::Result<u64> {
        match self {
            AnyStorage::Memory(s) => s.size(key).await,
            AnyStorage::Local(s) => s.size(key).await,
        }
    }

    async fn created_time(&self, key: &str) -> io::Result<SystemTime> {
        match self {
            AnyStorage::Memory(s) => s.created_time(key).await,
            AnyStorage::Local(s) => s.created_time(key).await,
        }
    }

    async fn listdir(&self, prefix: &str) -> io::Result<Listing> {
        match self {
            AnyStorage::Memory(s) => s.listdir(prefix).await,
            AnyStorage::Local(s) => s.listdir(prefix).await,
        }
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        match self {
            AnyStorage::Memory(s) => s.remove(key).await,
            AnyStorage::Local(s) => s.remove(key).await,
        }
    }

    async fn dir_exists(&self, dir_key: &str) -> io::Result<bool> {
        match self {
            AnyStorage::Memory(s) => s.dir_exists(dir_key).await,
            AnyStorage::Local(s) => s.dir_exists(dir_key).await,
        }
    }
}

impl AsyncRead for AnyFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            AnyFile::Memory(f) => Pin::new(f).poll_read(cx, buf),
            AnyFile::Local(f) => Pin::new(f).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for AnyFile {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            AnyFile::Memory(f) => Pin::new(f).poll_write(cx, buf),
            AnyFile::Local(f) => Pin::new(f).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            AnyFile::Memory(f) => Pin::new(f).poll_flush(cx),
            AnyFile::Local(f) => Pin::new(f).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            AnyFile::Memory(f) => Pin::new(f).poll_shutdown(cx),
            AnyFile::Local(f) => Pin::new(f).poll_shutdown(cx),
        }
    }
}
