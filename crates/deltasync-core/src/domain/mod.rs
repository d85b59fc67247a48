//! Domain entities and business logic
//!
//! This module contains the core domain types for DeltaSync:
//! - Newtypes for sync keys and server-assigned identifiers
//! - Folder and message metadata entities
//! - The special-folder registry
//! - Per-user cached synchronization state
//! - Domain-specific error types

pub mod cache_state;
pub mod errors;
pub mod folder;
pub mod message;
pub mod newtypes;
pub mod special_folder;

// Re-export commonly used types
pub use cache_state::{CacheState, Delta, FolderDelta, MessageDelta};
pub use errors::DomainError;
pub use folder::Folder;
pub use message::Message;
pub use newtypes::*;
pub use special_folder::SpecialFolder;
