//! Synchronization engine
//!
//! The [`SyncEngine`] keeps a user's cached folders and messages consistent
//! with the server by replaying server-side changes since the last sync key.
//!
//! ## Sync Flow
//!
//! 1. Read the collection's sync key from the store (`"0"` = full resync)
//! 2. Send one `Sync` round and reconcile its Add/Change/Delete commands
//!    into the store together with the returned key
//! 3. Repeat while the server reports more available
//! 4. Return a snapshot read back from the store
//!
//! ## Recovery
//!
//! Each operation is attempted once. An expired session is renewed and the
//! operation retried once. A rejected sync key (and status 4104 on message
//! syncs) resets the affected collection and retries once from `"0"`. A
//! failing retry propagates as is.

use std::collections::HashSet;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use tracing::{debug, info, warn};

use deltasync_cache::InMemoryStore;
use deltasync_core::config::{Config, DEFAULT_WINDOW_SIZE};
use deltasync_core::domain::{
    DomainError, Folder, FolderDelta, FolderId, Message, MessageDelta, MessageId, SpecialFolder,
};
use deltasync_core::ports::transport::{
    STATUS_INVALID_SYNC_KEY, STATUS_NO_SUCH_MESSAGE, STATUS_SUCCESS,
};
use deltasync_core::ports::{
    CollectionResponse, Command, FolderCommand, ITransport, IStore, MessageCommand,
    MessageDetails, Session, SyncRequest,
};

use crate::SyncError;

/// Maximum number of delete commands per `Sync` request
///
/// 160 is known to fail server-side; 64 works.
pub const DELETE_CHUNK_SIZE: usize = 64;

/// Collection an operation may reset when its sync key is rejected
#[derive(Debug, Clone, Copy)]
enum Recovery<'a> {
    /// No sync key involved (downloads)
    Session,
    Folders,
    Messages(&'a FolderId),
    Delete(&'a FolderId),
}

impl Recovery<'_> {
    /// Whether `err` is recovered by resetting this collection
    fn resets_on(self, err: &SyncError) -> bool {
        match (self, err) {
            (Recovery::Session, _) => false,
            (_, SyncError::InvalidSyncKey) => true,
            (Recovery::Messages(_), err) => err.is_resync_required(),
            _ => false,
        }
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Client-side DeltaSync engine for one account
///
/// Holds the session for `username`; every data operation requires
/// [`login`](Self::login) first and takes `&mut self`, since recovery may
/// replace the session.
pub struct SyncEngine {
    transport: Arc<dyn ITransport>,
    store: Arc<dyn IStore>,
    username: String,
    password: String,
    session: Option<Session>,
    window_size: u32,
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("username", &self.username)
            .field("logged_in", &self.session.is_some())
            .field("window_size", &self.window_size)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Creates an engine backed by a fresh [`InMemoryStore`]
    pub fn new(
        transport: Arc<dyn ITransport>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::with_store(transport, Arc::new(InMemoryStore::new()), username, password)
    }

    /// Creates an engine that reconciles into `store`
    pub fn with_store(
        transport: Arc<dyn ITransport>,
        store: Arc<dyn IStore>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            store,
            username: username.into(),
            password: password.into(),
            session: None,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }

    /// Creates an engine for the account and window size in `config`
    ///
    /// # Errors
    /// Fails if `account.username` is unset or `sync.window_size` is zero.
    pub fn from_config(
        transport: Arc<dyn ITransport>,
        store: Arc<dyn IStore>,
        password: impl Into<String>,
        config: &Config,
    ) -> Result<Self, SyncError> {
        let username = config.account.username.clone().ok_or_else(|| {
            DomainError::ValidationFailed("account.username is not set".to_string())
        })?;
        let mut engine = Self::with_store(transport, store, username, password);
        engine.set_window_size(config.sync.window_size)?;
        Ok(engine)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The current session, `None` when logged out
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    /// Maximum number of message changes requested per round
    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    /// Sets the per-round message window
    ///
    /// Values above the server's own cap are clamped by the server.
    pub fn set_window_size(&mut self, window_size: u32) -> Result<(), DomainError> {
        if window_size == 0 {
            return Err(DomainError::InvalidWindowSize(window_size));
        }
        self.window_size = window_size;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------------

    /// Authenticates and stores the new session
    #[tracing::instrument(skip(self), fields(username = %self.username))]
    pub fn login(&mut self) -> Result<(), SyncError> {
        if self.session.is_some() {
            return Err(SyncError::AlreadyLoggedIn);
        }
        let session = self.transport.authenticate(&self.username, &self.password)?;
        info!("Logged in");
        self.session = Some(session);
        Ok(())
    }

    /// Drops the session
    #[tracing::instrument(skip(self), fields(username = %self.username))]
    pub fn logout(&mut self) -> Result<(), SyncError> {
        match self.session.take() {
            Some(_) => {
                info!("Logged out");
                Ok(())
            }
            None => Err(SyncError::AlreadyLoggedOut),
        }
    }

    // ------------------------------------------------------------------------
    // Folders
    // ------------------------------------------------------------------------

    /// Syncs the folder collection and returns every cached folder
    #[tracing::instrument(skip(self), fields(username = %self.username))]
    pub fn get_folders(&mut self) -> Result<Vec<Folder>, SyncError> {
        self.recover(Recovery::Folders, Self::pull_folders)
    }

    /// Finds a folder by its (mapped) display name
    ///
    /// Looks in the cache first and syncs folders once on a miss.
    pub fn get_folder_by_name(&mut self, name: &str) -> Result<Option<Folder>, SyncError> {
        self.find_folder(|folder| folder.name() == name)
    }

    /// Finds a folder by id, syncing folders once on a cache miss
    pub fn get_folder_by_id(&mut self, folder_id: &FolderId) -> Result<Option<Folder>, SyncError> {
        self.find_folder(|folder| folder.id() == folder_id)
    }

    /// Finds a folder by the server's raw name (e.g. `drAfT`)
    pub fn get_folder_by_raw_name(&mut self, raw_name: &str) -> Result<Option<Folder>, SyncError> {
        self.get_folder_by_name(SpecialFolder::map_display_name(raw_name))
    }

    pub fn get_special_folder(
        &mut self,
        special: SpecialFolder,
    ) -> Result<Option<Folder>, SyncError> {
        self.get_folder_by_name(special.display_name())
    }

    pub fn get_inbox(&mut self) -> Result<Option<Folder>, SyncError> {
        self.get_special_folder(SpecialFolder::Inbox)
    }

    fn find_folder(
        &mut self,
        matches: impl Fn(&Folder) -> bool,
    ) -> Result<Option<Folder>, SyncError> {
        self.current_session()?;
        let cached = self.store.folders(&self.username);
        if let Some(folder) = cached.into_iter().find(|f| matches(f)) {
            return Ok(Some(folder));
        }
        debug!(username = %self.username, "Folder not cached, syncing folders");
        Ok(self.get_folders()?.into_iter().find(|f| matches(f)))
    }

    fn pull_folders(&self) -> Result<Vec<Folder>, SyncError> {
        let session = self.current_session()?;
        let mut rounds = 0u32;
        loop {
            let sync_key = self.store.folders_sync_key(&self.username);
            let collection = self.sync_collection(session, &SyncRequest::folders(sync_key))?;
            rounds += 1;

            let mut delta = FolderDelta::new();
            for command in collection.commands {
                match command {
                    Command::Folder(FolderCommand::Add(details)) => {
                        delta.added.push(Folder::with_parent(
                            details.id,
                            SpecialFolder::map_display_name(&details.display_name),
                            details.parent_id,
                        ));
                    }
                    Command::Folder(FolderCommand::Change(details)) => {
                        delta.changed.push(Folder::with_parent(
                            details.id,
                            SpecialFolder::map_display_name(&details.display_name),
                            details.parent_id,
                        ));
                    }
                    Command::Folder(FolderCommand::Delete(id)) => delta.deleted.push(id),
                    other => debug!(?other, "Ignoring non-folder command"),
                }
            }

            debug!(
                round = rounds,
                added = delta.added.len(),
                changed = delta.changed.len(),
                deleted = delta.deleted.len(),
                more_available = collection.more_available,
                "Folder round"
            );
            self.store
                .update_folders(&self.username, collection.sync_key, delta);

            if !collection.more_available {
                break;
            }
        }
        Ok(self.store.folders(&self.username))
    }

    // ------------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------------

    /// Syncs a folder's messages and returns every cached message in it
    #[tracing::instrument(skip(self), fields(username = %self.username))]
    pub fn get_messages(&mut self, folder_id: &FolderId) -> Result<Vec<Message>, SyncError> {
        self.recover(Recovery::Messages(folder_id), |engine| {
            engine.pull_messages(folder_id)
        })
    }

    fn pull_messages(&self, folder_id: &FolderId) -> Result<Vec<Message>, SyncError> {
        let session = self.current_session()?;
        let mut rounds = 0u32;
        loop {
            let sync_key = self.store.messages_sync_key(&self.username, folder_id);
            let request = SyncRequest::messages(folder_id.clone(), sync_key, self.window_size);
            let collection = self.sync_collection(session, &request)?;
            rounds += 1;

            let mut delta = MessageDelta::new();
            for command in collection.commands {
                match command {
                    Command::Message(MessageCommand::Add(details)) => {
                        delta.added.push(message_from(details));
                    }
                    Command::Message(MessageCommand::Change(details)) => {
                        delta.changed.push(message_from(details));
                    }
                    Command::Message(MessageCommand::Delete(id)) => delta.deleted.push(id),
                    other => debug!(?other, "Ignoring non-message command"),
                }
            }

            debug!(
                %folder_id,
                round = rounds,
                added = delta.added.len(),
                changed = delta.changed.len(),
                deleted = delta.deleted.len(),
                more_available = collection.more_available,
                "Message round"
            );
            self.store
                .update_messages(&self.username, folder_id, collection.sync_key, delta);

            if !collection.more_available {
                break;
            }
        }
        Ok(self.store.messages(&self.username, folder_id))
    }

    // ------------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------------

    /// Deletes `messages` from a folder; see [`delete_messages_by_id`](Self::delete_messages_by_id)
    pub fn delete_messages(
        &mut self,
        folder_id: &FolderId,
        messages: &[Message],
    ) -> Result<Vec<MessageId>, SyncError> {
        let ids: Vec<MessageId> = messages.iter().map(|m| m.id().clone()).collect();
        self.delete_messages_by_id(folder_id, &ids)
    }

    /// Deletes messages by id and returns the ids confirmed deleted
    ///
    /// Ids are sent in chunks of [`DELETE_CHUNK_SIZE`]. An id the server no
    /// longer has counts as deleted. Confirmed ids are removed from the
    /// cache with each round's new sync key. Duplicate input ids are sent
    /// once. After a recovered failure, deletion resumes with the chunk
    /// that failed.
    #[tracing::instrument(skip(self, ids), fields(username = %self.username, count = ids.len()))]
    pub fn delete_messages_by_id(
        &mut self,
        folder_id: &FolderId,
        ids: &[MessageId],
    ) -> Result<Vec<MessageId>, SyncError> {
        let mut seen = HashSet::new();
        let mut remaining: Vec<MessageId> =
            ids.iter().filter(|id| seen.insert(*id)).cloned().collect();
        let mut deleted = Vec::new();

        self.recover(Recovery::Delete(folder_id), |engine| {
            engine.delete_chunks(folder_id, &mut remaining, &mut deleted)
        })?;

        info!(%folder_id, deleted = deleted.len(), "Deleted messages");
        Ok(deleted)
    }

    fn delete_chunks(
        &self,
        folder_id: &FolderId,
        remaining: &mut Vec<MessageId>,
        deleted: &mut Vec<MessageId>,
    ) -> Result<(), SyncError> {
        let session = self.current_session()?;
        while !remaining.is_empty() {
            let take = remaining.len().min(DELETE_CHUNK_SIZE);
            let sync_key = self.store.messages_sync_key(&self.username, folder_id);
            let request =
                SyncRequest::delete_messages(folder_id.clone(), sync_key, &remaining[..take]);
            let collection = self.sync_collection(session, &request)?;

            // No <GetChanges> was sent, so the server must not report changes.
            if !collection.commands.is_empty() {
                warn!(
                    %folder_id,
                    commands = collection.commands.len(),
                    "Delete returned commands, resetting messages"
                );
                self.store.reset_messages(&self.username, folder_id);
                return Err(SyncError::Protocol(
                    "Delete should not return any Commands".to_string(),
                ));
            }

            remaining.drain(..take);

            let mut confirmed = Vec::with_capacity(collection.responses.len());
            for response in collection.responses {
                match response.status {
                    STATUS_SUCCESS | STATUS_NO_SUCH_MESSAGE => confirmed.push(response.id),
                    status => {
                        warn!(%folder_id, id = %response.id, status, "Message not deleted")
                    }
                }
            }

            debug!(%folder_id, sent = take, confirmed = confirmed.len(), "Delete round");
            self.store.update_messages(
                &self.username,
                folder_id,
                collection.sync_key,
                MessageDelta::deletions(confirmed.clone()),
            );
            deleted.extend(confirmed);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Content download
    // ------------------------------------------------------------------------

    /// Streams a message's RFC 822 content into `out`
    pub fn download_message_content(
        &mut self,
        message: &Message,
        out: &mut dyn Write,
    ) -> Result<(), SyncError> {
        self.download_message_content_by_id(message.id(), out)
    }

    /// Streams a message's RFC 822 content into `out`
    ///
    /// If the session expires mid-transfer the download restarts after
    /// renewal, so `out` may receive a partial copy first.
    #[tracing::instrument(skip(self, out), fields(username = %self.username))]
    pub fn download_message_content_by_id(
        &mut self,
        message_id: &MessageId,
        out: &mut dyn Write,
    ) -> Result<(), SyncError> {
        self.recover(Recovery::Session, |engine| {
            let session = engine.current_session()?;
            engine
                .transport
                .download_content(session, message_id, &mut *out)
                .map_err(SyncError::from)
        })
    }

    /// Streams a message's raw, server-compressed content into `out`
    pub fn download_raw_message_content(
        &mut self,
        message: &Message,
        out: &mut dyn Write,
    ) -> Result<(), SyncError> {
        self.download_raw_message_content_by_id(message.id(), out)
    }

    #[tracing::instrument(skip(self, out), fields(username = %self.username))]
    pub fn download_raw_message_content_by_id(
        &mut self,
        message_id: &MessageId,
        out: &mut dyn Write,
    ) -> Result<(), SyncError> {
        self.recover(Recovery::Session, |engine| {
            let session = engine.current_session()?;
            engine
                .transport
                .download_raw_content(session, message_id, &mut *out)
                .map_err(SyncError::from)
        })
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn current_session(&self) -> Result<&Session, SyncError> {
        self.session.as_ref().ok_or(SyncError::NotLoggedIn)
    }

    /// Runs `attempt`, recovering once from an expired session or a
    /// rejected sync key
    fn recover<T>(
        &mut self,
        recovery: Recovery<'_>,
        mut attempt: impl FnMut(&Self) -> Result<T, SyncError>,
    ) -> Result<T, SyncError> {
        self.current_session()?;
        match attempt(&*self) {
            Err(SyncError::SessionExpired) => {
                self.renew_session()?;
                attempt(&*self)
            }
            Err(err) if recovery.resets_on(&err) => {
                self.reset(recovery, &err);
                attempt(&*self)
            }
            result => result,
        }
    }

    fn renew_session(&mut self) -> Result<(), SyncError> {
        let expired = self.current_session()?.clone();
        warn!(username = %self.username, "Session expired, renewing");
        let renewed = self.transport.renew(&expired)?;
        self.session = Some(renewed);
        Ok(())
    }

    fn reset(&self, recovery: Recovery<'_>, cause: &SyncError) {
        match recovery {
            Recovery::Session => {}
            Recovery::Folders => {
                warn!(
                    username = %self.username,
                    %cause,
                    "Folders sync key rejected, retrying from sync key 0"
                );
                self.store.reset_folders(&self.username);
            }
            Recovery::Messages(folder_id) | Recovery::Delete(folder_id) => {
                warn!(
                    username = %self.username,
                    %folder_id,
                    %cause,
                    "Messages sync key rejected, retrying from sync key 0"
                );
                self.store.reset_messages(&self.username, folder_id);
            }
        }
    }

    /// Sends one request and returns its single, successful collection
    fn sync_collection(
        &self,
        session: &Session,
        request: &SyncRequest,
    ) -> Result<CollectionResponse, SyncError> {
        let response = self.transport.sync(session, request)?;
        let mut collections = response.collections.into_iter();
        let collection = collections
            .next()
            .ok_or_else(|| SyncError::Protocol("No <Collection> in Sync response".to_string()))?;
        if collections.next().is_some() {
            return Err(SyncError::Protocol(
                "More than one <Collection> in Sync response".to_string(),
            ));
        }
        match collection.status {
            STATUS_SUCCESS => Ok(collection),
            STATUS_INVALID_SYNC_KEY => Err(SyncError::InvalidSyncKey),
            status => Err(SyncError::Status(status)),
        }
    }
}

fn message_from(details: MessageDetails) -> Message {
    Message::new(
        details.id,
        details.date_received,
        details.size,
        details.read,
        details.subject,
        details.from,
        details.has_attachments,
    )
}
