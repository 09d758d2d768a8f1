//! Virtual filesystem over flat key stores.
//!
//! Key components:
//!
//! - [`Storage`] - The six primitives a backing store provides
//! - [`VirtualFs`] - Filesystem contract consumed by protocol servers
//! - [`StorageFs`] - Adapter implementing [`VirtualFs`] over any [`Storage`]
//! - [`MemoryStorage`] - In-memory store (for testing and scratch sessions)
//! - [`LocalStorage`] - Directory-backed store (with path security)
//!
//! ## Design Decisions
//!
//! - **Directories are inferred**: a path is a directory when the store
//!   has something filed under `path/`. The probe is the single overridable
//!   [`Storage::dir_exists`] hook.
//! - **Metadata is synthesized**: stat records carry fixed ownership and
//!   mode bits; only size and creation time come from the store.
//! - **Refuse, don't emulate**: operations with no store primitive fail
//!   with [`FsError::Unsupported`].

mod adapter;
pub mod backends;
mod error;
pub mod listing;
mod ops;
pub mod path;
mod storage;
mod types;

pub use adapter::StorageFs;
pub use backends::{AnyFile, AnyStorage, LocalStorage, MemoryFile, MemoryStorage};
pub use error::{FsError, FsResult};
pub use ops::VirtualFs;
pub use storage::{Listing, Storage};
pub use types::{
    DIR_MODE, EntryKind, FILE_MODE, Fact, GROUP_NAME, OWNER_NAME, OpenMode, Operation,
    PLACEHOLDER_GID, PLACEHOLDER_UID, SEP, StatRecord, unix_seconds,
};
