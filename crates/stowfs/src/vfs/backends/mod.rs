//! Storage backends.
//!
//! Backends implement [`Storage`](super::Storage) for different stores.

mod any;
mod local;
mod memory;

#[cfg(test)]
pub(crate) mod testing;

pub use any::{AnyFile, AnyStorage};
pub use local::LocalStorage;
pub use memory::{MemoryFile, MemoryStorage};
