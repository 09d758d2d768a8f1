//! In-memory key store.
//!
//! Used for testing and for throwaway sessions. All data is ephemeral and
//! shared between clones.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::vfs::storage::{Listing, Storage};
use crate::vfs::types::{OpenMode, SEP};

/// Stored blob.
#[derive(Debug, Clone)]
struct Blob {
    data: Vec<u8>,
    created: SystemTime,
}

type Entries = Arc<RwLock<BTreeMap<String, Blob>>>;

/// In-memory key store.
///
/// Keys are kept sorted, so listings come back in key order. A key ending
/// in `/` is a prefix query: it exists when some blob lives under it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Entries,
}

impl MemoryStorage {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` at `key`, stamped with the current time.
    pub fn insert(&self, key: impl AsRef<str>, data: impl Into<Vec<u8>>) {
        self.insert_at(key, data, SystemTime::now());
    }

    /// Store `data` at `key` with an explicit creation time.
    pub fn insert_at(&self, key: impl AsRef<str>, data: impl Into<Vec<u8>>, created: SystemTime) {
        let key = Self::normalize(key.as_ref()).into_owned();
        self.entries.write().insert(
            key,
            Blob {
                data: data.into(),
                created,
            },
        );
    }

    /// Contents of the blob at `key`, if any.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .read()
            .get(&*Self::normalize(key))
            .map(|b| b.data.clone())
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Strip leading separators and collapse repeated ones; keys are always
    /// relative and never carry an empty segment.
    fn normalize(key: &str) -> Cow<'_, str> {
        let key = key.trim_start_matches(SEP);
        if !key.contains("//") {
            return Cow::Borrowed(key);
        }
        let mut out = String::with_capacity(key.len());
        for c in key.chars() {
            if c == SEP && out.ends_with(SEP) {
                continue;
            }
            out.push(c);
        }
        Cow::Owned(out)
    }

    fn is_prefix(key: &str) -> bool {
        key.is_empty() || key.ends_with(SEP)
    }

    /// Blobs whose keys start with `prefix`, in key order.
    fn under<'a>(
        entries: &'a BTreeMap<String, Blob>,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a Blob)> + 'a {
        entries
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
    }

    fn not_found(key: &str) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("no such key: {key}"))
    }

    fn is_a_directory(key: &str) -> io::Error {
        io::Error::new(io::ErrorKind::IsADirectory, format!("is a prefix: {key}"))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    type File = MemoryFile;

    async fn open(&self, key: &str, mode: OpenMode) -> io::Result<MemoryFile> {
        let key = Self::normalize(key);
        let key: &str = &key;
        if Self::is_prefix(key) {
            return Err(Self::is_a_directory(key));
        }

        let mut entries = self.entries.write();
        let existing = entries.get(key).map(|b| b.data.clone());

        let (data, position) = match mode {
            OpenMode::Read => {
                let data = existing.ok_or_else(|| Self::not_found(key))?;
                return Ok(MemoryFile::reader(data));
            }
            OpenMode::ReadWrite => (existing.ok_or_else(|| Self::not_found(key))?, 0),
            OpenMode::Write => (Vec::new(), 0),
            OpenMode::Append => {
                let data = existing.unwrap_or_default();
                let len = data.len() as u64;
                (data, len)
            }
        };

        // Writers make the key visible immediately, like creating a file.
        let created = entries
            .get(key)
            .map(|b| b.created)
            .unwrap_or_else(SystemTime::now);
        entries.insert(
            key.to_string(),
            Blob {
                data: data.clone(),
                created,
            },
        );

        Ok(MemoryFile::writer(
            Arc::clone(&self.entries),
            key.to_string(),
            data,
            position,
            mode.reads(),
        ))
    }

    async fn exists(&self, key: &str) -> io::Result<bool> {
        let key = Self::normalize(key);
        let key: &str = &key;
        if key.is_empty() {
            return Ok(true);
        }
        let entries = self.entries.read();
        if Self::is_prefix(key) {
            Ok(Self::under(&entries, key).next().is_some())
        } else {
            Ok(entries.contains_key(key))
        }
    }

    async fn size(&self, key: &str) -> io::Result<u64> {
        let key = Self::normalize(key);
        let key: &str = &key;
        let entries = self.entries.read();
        if Self::is_prefix(key) {
            return if key.is_empty() || Self::under(&entries, key).next().is_some() {
                Ok(0)
            } else {
                Err(Self::not_found(key))
            };
        }
        entries
            .get(key)
            .map(|b| b.data.len() as u64)
            .ok_or_else(|| Self::not_found(key))
    }

    async fn created_time(&self, key: &str) -> io::Result<SystemTime> {
        let key = Self::normalize(key);
        let key: &str = &key;
        let entries = self.entries.read();
        if Self::is_prefix(key) {
            // A prefix is as old as its oldest blob.
            return match Self::under(&entries, key).map(|(_, b)| b.created).min() {
                Some(t) => Ok(t),
                None if key.is_empty() => Ok(UNIX_EPOCH),
                None => Err(Self::not_found(key)),
            };
        }
        entries
            .get(key)
            .map(|b| b.created)
            .ok_or_else(|| Self::not_found(key))
    }

    async fn listdir(&self, prefix: &str) -> io::Result<Listing> {
        let prefix = Self::normalize(prefix);
        let prefix: &str = &prefix;
        let prefix = if Self::is_prefix(prefix) {
            prefix.to_string()
        } else {
            format!("{prefix}/")
        };

        let entries = self.entries.read();
        let mut listing = Listing::default();
        for (key, _) in Self::under(&entries, &prefix) {
            let rest = &key[prefix.len()..];
            match rest.split_once(SEP) {
                Some((dir, _)) => {
                    // Keys sharing a sub-prefix are contiguous in sort order.
                    if listing.dirs.last().map(String::as_str) != Some(dir) {
                        listing.dirs.push(dir.to_string());
                    }
                }
                None if !rest.is_empty() => listing.files.push(rest.to_string()),
                None => {}
            }
        }
        Ok(listing)
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        let key = Self::normalize(key);
        let key: &str = &key;
        if Self::is_prefix(key) {
            return Err(Self::is_a_directory(key));
        }
        self.entries
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(key))
    }
}

/// Where a writable handle commits its buffer.
#[derive(Debug)]
struct Sink {
    entries: Entries,
    key: String,
}

/// File handle over a [`MemoryStorage`] blob.
///
/// Reads see a snapshot taken at open. Writes go to a private buffer that is
/// committed to the store on flush, shutdown or drop.
#[derive(Debug)]
pub struct MemoryFile {
    buf: io::Cursor<Vec<u8>>,
    sink: Option<Sink>,
    readable: bool,
    dirty: bool,
}

impl MemoryFile {
    fn reader(data: Vec<u8>) -> Self {
        Self {
            buf: io::Cursor::new(data),
            sink: None,
            readable: true,
            dirty: false,
        }
    }

    fn writer(entries: Entries, key: String, data: Vec<u8>, position: u64, readable: bool) -> Self {
        let mut buf = io::Cursor::new(data);
        buf.set_position(position);
        Self {
            buf,
            sink: Some(Sink { entries, key }),
            readable,
            dirty: false,
        }
    }

    fn commit(&mut self) {
        if !self.dirty {
            return;
        }
        if let Some(sink) = &self.sink {
            let data = self.buf.get_ref().clone();
            let mut entries = sink.entries.write();
            match entries.get_mut(&sink.key) {
                Some(blob) => blob.data = data,
                None => {
                    entries.insert(
                        sink.key.clone(),
                        Blob {
                            data,
                            created: SystemTime::now(),
                        },
                    );
                }
            }
        }
        self.dirty = false;
    }
}

impl AsyncRead for MemoryFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if !this.readable {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file not opened for reading",
            )));
        }
        Pin::new(&mut this.buf).poll_read(cx, buf)
    }
}

impl AsyncWrite for MemoryFile {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.sink.is_none() {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file not opened for writing",
            )));
        }
        let written = Pin::new(&mut this.buf).poll_write(cx, data);
        if matches!(written, Poll::Ready(Ok(n)) if n > 0) {
            this.dirty = true;
        }
        written
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().commit();
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().commit();
        Poll::Ready(Ok(()))
    }
}

impl Drop for MemoryFile {
    fn drop(&mut self) {
        self.commit();
    }
}
