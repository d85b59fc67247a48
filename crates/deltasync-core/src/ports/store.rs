//! Store port (driven/secondary port)
//!
//! This module defines the cache contract the sync engine reads cursors from
//! and reconciles server deltas into, keyed by username.
//!
//! ## Design Notes
//!
//! - Methods are infallible. The contract is an in-process cache; durable
//!   storage hangs off [`IStateListener`], and failures there belong to the
//!   listener.
//! - Every mutating call is atomic per call: no caller may observe a
//!   half-applied delta.
//! - Read methods return owned snapshots. Mutating a returned `Vec` never
//!   affects the cache.

use crate::domain::{
    CacheState, Folder, FolderDelta, FolderId, Message, MessageDelta, SyncKey,
};

/// Port trait for the per-user synchronization cache
pub trait IStore: Send + Sync {
    /// Folders sync key, `"0"` if none has been recorded
    fn folders_sync_key(&self, username: &str) -> SyncKey;

    /// Messages sync key of a folder
    ///
    /// Returns `"0"` if unset, and records `"0"` as the folder's key.
    fn messages_sync_key(&self, username: &str, folder_id: &FolderId) -> SyncKey;

    /// Sets the folders sync key and applies one round's folder delta
    fn update_folders(&self, username: &str, sync_key: SyncKey, delta: FolderDelta);

    /// Resets the folders sync key to `"0"` and clears the folder set
    fn reset_folders(&self, username: &str);

    /// Sets a folder's messages sync key and applies one round's message delta
    fn update_messages(
        &self,
        username: &str,
        folder_id: &FolderId,
        sync_key: SyncKey,
        delta: MessageDelta,
    );

    /// Resets a folder's messages sync key to `"0"` and clears its messages
    fn reset_messages(&self, username: &str, folder_id: &FolderId);

    /// Snapshot of the cached folders
    fn folders(&self, username: &str) -> Vec<Folder>;

    /// Snapshot of a folder's cached messages
    fn messages(&self, username: &str, folder_id: &FolderId) -> Vec<Message>;
}

/// Change-notification hook for stores
///
/// Called after every mutating store call with the post-mutation state of
/// the affected user, typically to persist it.
pub trait IStateListener: Send + Sync {
    fn state_changed(&self, username: &str, state: &CacheState);
}
