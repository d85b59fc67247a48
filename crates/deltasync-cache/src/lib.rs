//! DeltaSync Cache - Local sync state
//!
//! In-process cache of per-user synchronization state:
//! - Folders sync key and folder set
//! - Messages sync key and message set per folder
//!
//! ## Architecture
//!
//! This crate implements the `IStore` port from `deltasync-core` with plain
//! keyed maps, and an `IStateListener` that persists each user's state as a
//! JSON file. It is a driven (secondary) adapter in the hexagonal
//! architecture.
//!
//! ## Key Components
//!
//! - [`InMemoryStore`] - Reference `IStore` implementation
//! - [`FileStatePersister`] - Writes state to disk after every change
//! - [`CacheError`] - Error types for persistence operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::{path::Path, sync::Arc};
//! use deltasync_cache::{FileStatePersister, InMemoryStore};
//!
//! # fn example() -> Result<(), deltasync_cache::CacheError> {
//! let persister = Arc::new(FileStatePersister::new(Path::new("/home/user/.local/share/deltasync/state"))?);
//! let store = InMemoryStore::restore(persister)?;
//! // Hand `store` to the sync engine as its IStore...
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod persist;

pub use memory::InMemoryStore;
pub use persist::FileStatePersister;

/// Errors that can occur during cache persistence
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading or writing a state file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization of cache state failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A state file exists but does not belong to the expected user
    #[error("State file {path} belongs to another user")]
    UserMismatch {
        /// Offending state file
        path: String,
    },
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}
