//! Per-user synchronization state
//!
//! [`CacheState`] holds everything the client remembers about one user's
//! mailbox between sync rounds: the folders sync key, the folder set, and a
//! sync key plus message set per folder. Stores own one `CacheState` per
//! user and mutate it only through the methods below.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    folder::Folder,
    message::Message,
    newtypes::{FolderId, MessageId, SyncKey},
};

/// One sync round's worth of changes for a collection
///
/// `added` and `changed` are both upserted by id; `deleted` ids that are
/// absent are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta<T, Id> {
    pub added: Vec<T>,
    pub changed: Vec<T>,
    pub deleted: Vec<Id>,
}

impl<T, Id> Delta<T, Id> {
    pub fn new() -> Self {
        Self {
            added: Vec::new(),
            changed: Vec::new(),
            deleted: Vec::new(),
        }
    }

    /// A delta that only removes the given ids
    pub fn deletions(deleted: Vec<Id>) -> Self {
        Self {
            added: Vec::new(),
            changed: Vec::new(),
            deleted,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.deleted.is_empty()
    }

    /// Total number of entries across the three lists
    pub fn len(&self) -> usize {
        self.added.len() + self.changed.len() + self.deleted.len()
    }
}

impl<T, Id> Default for Delta<T, Id> {
    fn default() -> Self {
        Self::new()
    }
}

pub type FolderDelta = Delta<Folder, FolderId>;
pub type MessageDelta = Delta<Message, MessageId>;

/// Cached synchronization state of one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheState {
    folders_sync_key: SyncKey,
    folders: HashMap<FolderId, Folder>,
    messages_sync_keys: HashMap<FolderId, SyncKey>,
    messages: HashMap<FolderId, HashMap<MessageId, Message>>,
}

impl CacheState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folders_sync_key(&self) -> &SyncKey {
        &self.folders_sync_key
    }

    /// Sync key of a folder's messages, if one has been recorded
    pub fn messages_sync_key(&self, folder_id: &FolderId) -> Option<&SyncKey> {
        self.messages_sync_keys.get(folder_id)
    }

    /// Returns the folder's messages sync key, recording `"0"` if none is set
    pub fn pin_messages_sync_key(&mut self, folder_id: &FolderId) -> SyncKey {
        self.messages_sync_keys
            .entry(folder_id.clone())
            .or_default()
            .clone()
    }

    /// Sets the folders sync key and applies the delta
    pub fn apply_folders(&mut self, sync_key: SyncKey, delta: FolderDelta) {
        self.folders_sync_key = sync_key;
        for folder in delta.added.into_iter().chain(delta.changed) {
            self.folders.insert(folder.id().clone(), folder);
        }
        for id in &delta.deleted {
            self.folders.remove(id);
        }
    }

    /// Returns the folders collection to its initial `"0"` state
    pub fn reset_folders(&mut self) {
        self.folders_sync_key = SyncKey::initial();
        self.folders.clear();
    }

    /// Sets a folder's messages sync key and applies the delta to its messages
    pub fn apply_messages(&mut self, folder_id: &FolderId, sync_key: SyncKey, delta: MessageDelta) {
        self.messages_sync_keys.insert(folder_id.clone(), sync_key);
        let messages = self.messages.entry(folder_id.clone()).or_default();
        for message in delta.added.into_iter().chain(delta.changed) {
            messages.insert(message.id().clone(), message);
        }
        for id in &delta.deleted {
            messages.remove(id);
        }
    }

    /// Returns one folder's messages collection to its initial `"0"` state
    pub fn reset_messages(&mut self, folder_id: &FolderId) {
        self.messages_sync_keys
            .insert(folder_id.clone(), SyncKey::initial());
        self.messages.entry(folder_id.clone()).or_default().clear();
    }

    /// Copies of all cached folders, in no particular order
    pub fn folders(&self) -> Vec<Folder> {
        self.folders.values().cloned().collect()
    }

    pub fn folder(&self, folder_id: &FolderId) -> Option<&Folder> {
        self.folders.get(folder_id)
    }

    /// Copies of a folder's cached messages, in no particular order
    pub fn messages(&self, folder_id: &FolderId) -> Vec<Message> {
        self.messages
            .get(folder_id)
            .map(|messages| messages.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    pub fn message_count(&self, folder_id: &FolderId) -> usize {
        self.messages.get(folder_id).map_or(0, HashMap::len)
    }
}
