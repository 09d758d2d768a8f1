//! Hierarchical filesystem view over flat key-addressed object stores.
//!
//! A protocol server (FTP and friends) wants paths, directories, stat
//! records and file handles. An object store offers keys and blobs. This
//! crate sits between them: [`vfs::StorageFs`] implements the
//! [`vfs::VirtualFs`] contract on top of any [`vfs::Storage`].
//!
//! ```no_run
//! use std::path::Path;
//! use stowfs::{Session, vfs::{MemoryStorage, StorageFs, VirtualFs}};
//!
//! # async fn demo() -> stowfs::vfs::FsResult<()> {
//! let store = MemoryStorage::new();
//! store.insert("photos/cat.jpg", b"meow".to_vec());
//!
//! let fs = StorageFs::new("", Session::new("amy"), store);
//! assert_eq!(fs.listdir(Path::new("/")).await?, vec!["photos/"]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod session;
pub mod vfs;

pub use config::{FsConfig, StorageConfig};
pub use session::Session;
