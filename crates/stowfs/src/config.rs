//! Adapter configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! root = "media/uploads"
//!
//! [storage]
//! backend = "local"
//! path = "~/ftp"
//! read_only = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::session::Session;
use crate::vfs::{AnyStorage, FsError, FsResult, LocalStorage, MemoryStorage, StorageFs};

/// Top-level configuration for one adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FsConfig {
    /// Key prefix the session's `/` maps onto. Empty for the whole store.
    #[serde(default)]
    pub root: String,

    /// Which store to serve.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl FsConfig {
    /// Create a config over the given store.
    pub fn new(storage: StorageConfig) -> Self {
        Self {
            root: String::new(),
            storage,
        }
    }

    /// Set the session root prefix.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Parse from TOML text.
    pub fn from_toml(text: &str) -> FsResult<Self> {
        toml::from_str(text).map_err(|e| FsError::config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub async fn load(path: impl AsRef<Path>) -> FsResult<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FsError::config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), backend = config.storage.kind(), "loaded config");
        Ok(config)
    }

    /// Build the store and bind an adapter to `session`.
    pub fn connect(&self, session: Session) -> FsResult<StorageFs<AnyStorage>> {
        StorageFs::connect(&self.root, session, || self.storage.build())
    }
}

/// Backend selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Empty in-memory store.
    #[default]
    Memory,

    /// Directory on the local filesystem.
    Local {
        /// Store root. `~` is expanded.
        path: String,

        /// Refuse writes and removals.
        #[serde(default)]
        read_only: bool,
    },
}

impl StorageConfig {
    /// Local directory store.
    pub fn local(path: impl Into<String>) -> Self {
        Self::Local {
            path: path.into(),
            read_only: false,
        }
    }

    /// Short backend name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Local { .. } => "local",
        }
    }

    /// Construct the configured store.
    ///
    /// A local root that is not an existing directory yields
    /// [`FsError::NoBackend`].
    pub fn build(&self) -> FsResult<AnyStorage> {
        match self {
            Self::Memory => Ok(MemoryStorage::new().into()),
            Self::Local { path, read_only } => {
                let root: PathBuf = shellexpand::tilde(path).as_ref().into();
                if !root.is_dir() {
                    return Err(FsError::no_backend(format!(
                        "not a directory: {}",
                        root.display()
                    )));
                }
                let mut store = LocalStorage::new(root);
                store.set_read_only(*read_only);
                tracing::info!(root = %store.root().display(), read_only, "local storage ready");
                Ok(store.into())
            }
        }
    }
}
