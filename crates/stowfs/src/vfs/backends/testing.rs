//! Scripted backend for adapter tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io;
use std::time::SystemTime;

use crate::vfs::storage::{Listing, Storage};
use crate::vfs::types::OpenMode;

/// Backend whose answers are fixed up front.
///
/// Listings are returned verbatim (in whatever order they were scripted),
/// and every call is logged as `"<op>:<key>"` so tests can assert on the
/// exact probes the adapter made.
#[derive(Debug, Default)]
pub struct ScriptedStorage {
    listings: HashMap<String, Listing>,
    existing: HashSet<String>,
    sizes: HashMap<String, u64>,
    times: HashMap<String, SystemTime>,
    contents: HashMap<String, Vec<u8>>,
    /// When set, `dir_exists` answers from this set instead of `exists`.
    dir_markers: Option<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the listing returned for `prefix`.
    pub fn with_listing(mut self, prefix: &str, dirs: &[&str], files: &[&str]) -> Self {
        let listing = Listing::new(dirs.iter().copied(), files.iter().copied());
        self.listings.insert(prefix.to_string(), listing);
        self
    }

    /// Mark `key` as existing for `exists`.
    pub fn with_existing(mut self, key: &str) -> Self {
        self.existing.insert(key.to_string());
        self
    }

    /// Script a file with size and creation time. Also marks it existing.
    pub fn with_file(mut self, key: &str, size: u64, created: SystemTime) -> Self {
        self.existing.insert(key.to_string());
        self.sizes.insert(key.to_string(), size);
        self.times.insert(key.to_string(), created);
        self
    }

    /// Script the bytes `open` hands back for `key`.
    pub fn with_contents(mut self, key: &str, data: &[u8]) -> Self {
        self.existing.insert(key.to_string());
        self.contents.insert(key.to_string(), data.to_vec());
        self
    }

    /// Answer directory probes from explicit markers.
    pub fn with_dir_markers(mut self, markers: &[&str]) -> Self {
        self.dir_markers = Some(markers.iter().map(|m| m.to_string()).collect());
        self
    }

    /// Snapshot of the calls made so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, op: &str, key: &str) {
        self.calls.lock().push(format!("{op}:{key}"));
    }

    fn missing(key: &str) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("not scripted: {key}"))
    }
}

#[async_trait]
impl Storage for ScriptedStorage {
    type File = io::Cursor<Vec<u8>>;

    async fn open(&self, key: &str, _mode: OpenMode) -> io::Result<Self::File> {
        self.record("open", key);
        match self.contents.get(key) {
            Some(data) => Ok(io::Cursor::new(data.clone())),
            None if self.existing.contains(key) => Ok(io::Cursor::new(Vec::new())),
            None => Err(Self::missing(key)),
        }
    }

    async fn exists(&self, key: &str) -> io::Result<bool> {
        self.record("exists", key);
        Ok(self.existing.contains(key))
    }

    async fn size(&self, key: &str) -> io::Result<u64> {
        self.record("size", key);
        self.sizes.get(key).copied().ok_or_else(|| Self::missing(key))
    }

    async fn created_time(&self, key: &str) -> io::Result<SystemTime> {
        self.record("created_time", key);
        self.times.get(key).copied().ok_or_else(|| Self::missing(key))
    }

    async fn listdir(&self, prefix: &str) -> io::Result<Listing> {
        self.record("listdir", prefix);
        self.listings
            .get(prefix)
            .cloned()
            .ok_or_else(|| Self::missing(prefix))
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        self.record("remove", key);
        if self.existing.contains(key) {
            Ok(())
        } else {
            Err(Self::missing(key))
        }
    }

    async fn dir_exists(&self, dir_key: &str) -> io::Result<bool> {
        match &self.dir_markers {
            Some(markers) => {
                self.record("dir_exists", dir_key);
                Ok(markers.contains(dir_key))
            }
            None => self.exists(dir_key).await,
        }
    }
}
