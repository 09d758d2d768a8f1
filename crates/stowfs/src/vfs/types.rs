//! Core adapter types.
//!
//! The backing store tracks nothing but size and creation time, so most of
//! what lives here is synthesized: stat records with fixed ownership and
//! permission bits, and the classification that picks between them.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use strum::{Display, EnumString, IntoStaticStr};

use super::error::{FsError, FsResult};

/// Path separator used by keys and protocol paths alike.
pub const SEP: char = '/';

/// Mode reported for directories: `drwxrwx---`.
pub const DIR_MODE: u32 = 0o040770;

/// Mode reported for regular files: `-rwxrwx---`.
pub const FILE_MODE: u32 = 0o100770;

/// Placeholder owner id; the store has no ownership model.
pub const PLACEHOLDER_UID: u32 = 1000;

/// Placeholder group id.
pub const PLACEHOLDER_GID: u32 = 1000;

/// Name reported for every uid.
pub const OWNER_NAME: &str = "owner";

/// Name reported for every gid.
pub const GROUP_NAME: &str = "group";

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;

/// Classification of a path against the backing store.
///
/// There is no link variant: links do not exist in a flat store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Implied directory (some key lives under `path/`).
    Directory,
    /// Regular file (a key exists at `path`).
    File,
    /// Neither.
    Missing,
}

impl EntryKind {
    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }

    /// Returns true if the path resolved to something.
    pub fn exists(&self) -> bool {
        !matches!(self, EntryKind::Missing)
    }
}

/// Synthesized stat record.
///
/// Only `size` and `mtime` come from the backend; `mtime` is really the
/// backend's creation time since nothing tracks modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRecord {
    /// Size in bytes.
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub mtime: i64,
    /// Number of hard links (always 1).
    pub nlink: u32,
    /// [`DIR_MODE`] or [`FILE_MODE`].
    pub mode: u32,
    /// Owner id (placeholder).
    pub uid: u32,
    /// Group id (placeholder).
    pub gid: u32,
    /// Device id (always 0).
    pub dev: u64,
    /// Inode number (always 0).
    pub ino: u64,
}

impl StatRecord {
    /// Build a record for a directory or a regular file.
    pub fn synthesize(is_dir: bool, size: u64, mtime: i64) -> Self {
        Self {
            size,
            mtime,
            nlink: 1,
            mode: if is_dir { DIR_MODE } else { FILE_MODE },
            uid: PLACEHOLDER_UID,
            gid: PLACEHOLDER_GID,
            dev: 0,
            ino: 0,
        }
    }

    /// Returns true if the mode marks a directory.
    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    /// Entry kind implied by the mode.
    pub fn kind(&self) -> EntryKind {
        if self.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }

    /// Permission bits only (e.g. `0o770`).
    pub fn perm(&self) -> u32 {
        self.mode & 0o7777
    }

    /// `ls -l` style rendering of the mode, e.g. `drwxrwx---`.
    pub fn filemode(&self) -> String {
        let mut out = String::with_capacity(10);
        out.push(if self.is_dir() { 'd' } else { '-' });
        for shift in [6u32, 3, 0] {
            let bits = (self.mode >> shift) & 0o7;
            out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        out
    }
}

/// Whole seconds since the Unix epoch, rounded toward negative infinity.
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => {
            let d = e.duration();
            let secs = -(d.as_secs() as i64);
            if d.subsec_nanos() > 0 { secs - 1 } else { secs }
        }
    }
}

/// Mode a file is opened with.
///
/// Parsed from the mode strings FTP servers hand to their filesystem layer
/// (`"rb"`, `"wb"`, `"ab"`, `"r+b"`). All modes are binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum OpenMode {
    /// Read from the start.
    #[strum(serialize = "rb", serialize = "r")]
    Read,
    /// Create or truncate, then write.
    #[strum(serialize = "wb", serialize = "w")]
    Write,
    /// Create if missing, write at the end.
    #[strum(serialize = "ab", serialize = "a")]
    Append,
    /// Read and overwrite in place; the key must exist.
    #[strum(serialize = "r+b", serialize = "rb+", serialize = "r+")]
    ReadWrite,
}

impl OpenMode {
    /// Parse a mode string.
    pub fn parse(mode: &str) -> FsResult<Self> {
        mode.parse()
            .map_err(|_| FsError::InvalidMode(mode.to_string()))
    }

    /// Returns true if the mode permits reading.
    pub fn reads(&self) -> bool {
        matches!(self, OpenMode::Read | OpenMode::ReadWrite)
    }

    /// Returns true if the mode permits writing.
    pub fn writes(&self) -> bool {
        !matches!(self, OpenMode::Read)
    }
}

/// Capabilities a flat store refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Mkstemp,
    Mkdir,
    Rmdir,
    Chmod,
    Rename,
    Utime,
    Readlink,
}

/// MLSx facts the adapter can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, IntoStaticStr)]
#[strum(ascii_case_insensitive)]
pub enum Fact {
    #[strum(serialize = "type")]
    Type,
    #[strum(serialize = "size")]
    Size,
    #[strum(serialize = "modify")]
    Modify,
    #[strum(serialize = "perm")]
    Perm,
    #[strum(serialize = "unix.mode")]
    UnixMode,
    #[strum(serialize = "unix.uid")]
    UnixUid,
    #[strum(serialize = "unix.gid")]
    UnixGid,
    #[strum(serialize = "unique")]
    Unique,
}

impl Fact {
    /// Every supported fact.
    pub const ALL: [Fact; 8] = [
        Fact::Type,
        Fact::Size,
        Fact::Modify,
        Fact::Perm,
        Fact::UnixMode,
        Fact::UnixUid,
        Fact::UnixGid,
        Fact::Unique,
    ];

    /// Parse an `OPTS MLST` fact list like `"type;size;modify;"`.
    ///
    /// Unknown facts are dropped.
    pub fn parse_list(list: &str) -> Vec<Fact> {
        list.split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect()
    }

    /// Wire name of the fact.
    pub fn name(&self) -> &'static str {
        self.into()
    }
}
