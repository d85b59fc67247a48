//! In-memory implementation of IStore
//!
//! Keeps one [`CacheState`] per user in a concurrent map. Each store call
//! locks only the affected user's entry for its duration, so a store shared
//! by several engines still applies every delta atomically.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use deltasync_core::config::CacheConfig;
use deltasync_core::domain::{
    CacheState, Folder, FolderDelta, FolderId, Message, MessageDelta, SyncKey,
};
use deltasync_core::ports::{IStateListener, IStore};

use crate::{CacheError, FileStatePersister};

/// Reference `IStore` backed by plain keyed maps
///
/// An optional [`IStateListener`] is notified after every update or reset,
/// while the user's entry is still locked, so notifications for one user
/// arrive in mutation order. The listener must not call back into the store.
#[derive(Default)]
pub struct InMemoryStore {
    states: DashMap<String, CacheState>,
    listener: Option<Arc<dyn IStateListener>>,
}

impl InMemoryStore {
    /// Creates an empty store without a listener
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that notifies `listener` after every change
    pub fn with_listener(listener: Arc<dyn IStateListener>) -> Self {
        Self {
            states: DashMap::new(),
            listener: Some(listener),
        }
    }

    /// Creates a store seeded with every state `persister` has on disk
    ///
    /// The persister becomes the store's listener, so later changes are
    /// written back.
    pub fn restore(persister: Arc<FileStatePersister>) -> Result<Self, CacheError> {
        let store = Self::with_listener(persister.clone());
        for (username, state) in persister.load_all()? {
            debug!(%username, folders = state.folder_count(), "Restored cache state");
            store.states.insert(username, state);
        }
        Ok(store)
    }

    /// Opens the store described by the `cache` configuration section
    ///
    /// With `persist` set, state is restored from and written back to
    /// `state_dir`; otherwise the store starts empty and stays in memory.
    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        if !config.persist {
            return Ok(Self::new());
        }
        Self::restore(Arc::new(FileStatePersister::new(&config.state_dir)?))
    }

    /// Replaces a user's state without notifying the listener
    pub fn seed(&self, username: &str, state: CacheState) {
        self.states.insert(username.to_string(), state);
    }

    /// Snapshot of a user's full state, if the user has been seen
    pub fn state(&self, username: &str) -> Option<CacheState> {
        self.states.get(username).map(|state| state.value().clone())
    }

    /// Users with cached state, in no particular order
    pub fn usernames(&self) -> Vec<String> {
        self.states.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Runs `f` on the user's state (created on first access) and notifies
    /// the listener with the result
    fn mutate<R>(&self, username: &str, f: impl FnOnce(&mut CacheState) -> R) -> R {
        let mut entry = self.states.entry(username.to_string()).or_default();
        let result = f(entry.value_mut());
        if let Some(listener) = &self.listener {
            listener.state_changed(username, entry.value());
        }
        result
    }
}

impl IStore for InMemoryStore {
    fn folders_sync_key(&self, username: &str) -> SyncKey {
        self.states
            .get(username)
            .map(|state| state.folders_sync_key().clone())
            .unwrap_or_default()
    }

    fn messages_sync_key(&self, username: &str, folder_id: &FolderId) -> SyncKey {
        // Pinning "0" is not a content change, so no notification.
        let mut entry = self.states.entry(username.to_string()).or_default();
        entry.value_mut().pin_messages_sync_key(folder_id)
    }

    fn update_folders(&self, username: &str, sync_key: SyncKey, delta: FolderDelta) {
        trace!(
            %username,
            %sync_key,
            added = delta.added.len(),
            changed = delta.changed.len(),
            deleted = delta.deleted.len(),
            "Updating folders"
        );
        self.mutate(username, |state| state.apply_folders(sync_key, delta));
    }

    fn reset_folders(&self, username: &str) {
        debug!(%username, "Resetting folders");
        self.mutate(username, CacheState::reset_folders);
    }

    fn update_messages(
        &self,
        username: &str,
        folder_id: &FolderId,
        sync_key: SyncKey,
        delta: MessageDelta,
    ) {
        trace!(
            %username,
            %folder_id,
            %sync_key,
            added = delta.added.len(),
            changed = delta.changed.len(),
            deleted = delta.deleted.len(),
            "Updating messages"
        );
        self.mutate(username, |state| {
            state.apply_messages(folder_id, sync_key, delta)
        });
    }

    fn reset_messages(&self, username: &str, folder_id: &FolderId) {
        debug!(%username, %folder_id, "Resetting messages");
        self.mutate(username, |state| state.reset_messages(folder_id));
    }

    fn folders(&self, username: &str) -> Vec<Folder> {
        self.states
            .get(username)
            .map(|state| state.folders())
            .unwrap_or_default()
    }

    fn messages(&self, username: &str, folder_id: &FolderId) -> Vec<Message> {
        self.states
            .get(username)
            .map(|state| state.messages(folder_id))
            .unwrap_or_default()
    }
}
