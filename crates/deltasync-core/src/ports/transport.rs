//! Transport port (driven/secondary port)
//!
//! This module defines the boundary to the DeltaSync wire layer: login and
//! session renewal, the `Sync` command exchange, and message content
//! download. Implementations own the HTTP exchange and the wire encoding;
//! the engine only sees the decoded request/response types below.
//!
//! ## Design Notes
//!
//! - Calls are blocking. The engine runs every operation to completion on
//!   the caller's thread, so the trait has no async methods.
//! - Errors use the typed [`TransportError`] rather than `anyhow`, because
//!   the engine recovers differently from an expired session, an invalid
//!   sync key, and everything else.
//! - Commands are closed enums per entity kind so callers classify them by
//!   pattern matching.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::newtypes::{FolderId, MessageId, SyncKey};

// ============================================================================
// Status codes
// ============================================================================

/// Collection or per-item status: success
pub const STATUS_SUCCESS: u32 = 1;

/// Collection status: the sync key sent is not valid anymore
pub const STATUS_INVALID_SYNC_KEY: u32 = 4402;

/// Delete outcome status: no such message on the server
pub const STATUS_NO_SUCH_MESSAGE: u32 = 4403;

/// Collection status seen on message syncs that requires a full resync
pub const STATUS_RESYNC_REQUIRED: u32 = 4104;

// ============================================================================
// TransportError
// ============================================================================

/// Errors reported by a transport implementation
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server rejected the credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The session ticket is no longer accepted; renew and retry
    #[error("Session expired")]
    SessionExpired,

    /// The sync key sent is not valid anymore; reset the collection and retry
    #[error("Invalid sync key")]
    InvalidSyncKey,

    /// The server answered with something the transport could not accept
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Network or I/O failure
    #[error("Communication error: {0}")]
    Communication(#[from] std::io::Error),
}

// ============================================================================
// Session
// ============================================================================

/// An authenticated DeltaSync session
///
/// Opaque to the engine: it is obtained from [`ITransport::authenticate`],
/// replaced by [`ITransport::renew`], and handed back on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Account the session belongs to
    pub username: String,
    /// Authentication ticket presented on every request
    pub ticket: String,
    /// Server base URI the session is bound to, once known
    pub base_uri: Option<String>,
}

impl Session {
    pub fn new(username: impl Into<String>, ticket: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ticket: ticket.into(),
            base_uri: None,
        }
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }
}

// ============================================================================
// SyncRequest
// ============================================================================

/// Kind of entities a collection holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Class {
    Folder,
    Email,
}

/// What a sync request asks the server to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOperation {
    /// Report changes since the sync key, optionally bounded per round
    GetChanges { window_size: Option<u32> },
    /// Apply mutations; no change tracking for this round
    Commands(Vec<RequestCommand>),
}

/// A client-side mutation carried in a sync request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestCommand {
    DeleteMessage(MessageId),
}

/// A single-collection `Sync` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub class: Class,
    /// Folder whose messages are synced (None for the folder collection)
    pub folder_id: Option<FolderId>,
    pub sync_key: SyncKey,
    pub operation: SyncOperation,
}

impl SyncRequest {
    /// Requests folder changes since `sync_key`
    pub fn folders(sync_key: SyncKey) -> Self {
        Self {
            class: Class::Folder,
            folder_id: None,
            sync_key,
            operation: SyncOperation::GetChanges { window_size: None },
        }
    }

    /// Requests message changes in `folder_id`, at most `window_size` per round
    pub fn messages(folder_id: FolderId, sync_key: SyncKey, window_size: u32) -> Self {
        Self {
            class: Class::Email,
            folder_id: Some(folder_id),
            sync_key,
            operation: SyncOperation::GetChanges {
                window_size: Some(window_size),
            },
        }
    }

    /// Requests deletion of `ids` from `folder_id`
    pub fn delete_messages(folder_id: FolderId, sync_key: SyncKey, ids: &[MessageId]) -> Self {
        Self {
            class: Class::Email,
            folder_id: Some(folder_id),
            sync_key,
            operation: SyncOperation::Commands(
                ids.iter().cloned().map(RequestCommand::DeleteMessage).collect(),
            ),
        }
    }

    /// Returns true if the server is asked to report changes
    pub fn gets_changes(&self) -> bool {
        matches!(self.operation, SyncOperation::GetChanges { .. })
    }

    /// Number of mutation commands carried by the request
    pub fn command_count(&self) -> usize {
        match &self.operation {
            SyncOperation::GetChanges { .. } => 0,
            SyncOperation::Commands(commands) => commands.len(),
        }
    }
}

// ============================================================================
// SyncResponse
// ============================================================================

/// Decoded `<Add>`/`<Change>` payload of a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderDetails {
    pub id: FolderId,
    /// Server display name; raw for special folders (e.g. `drAfT`)
    pub display_name: String,
    pub parent_id: Option<FolderId>,
}

/// Decoded `<Add>`/`<Change>` payload of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDetails {
    pub id: MessageId,
    pub folder_id: Option<FolderId>,
    pub date_received: DateTime<Utc>,
    pub size: u64,
    pub read: bool,
    pub subject: String,
    pub from: String,
    pub has_attachments: bool,
}

/// Server-side change to the folder collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderCommand {
    Add(FolderDetails),
    Change(FolderDetails),
    Delete(FolderId),
}

/// Server-side change to a folder's messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageCommand {
    Add(MessageDetails),
    Change(MessageDetails),
    Delete(MessageId),
}

/// A change reported in a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Folder(FolderCommand),
    Message(MessageCommand),
}

/// Per-id outcome of a delete command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResponse {
    pub id: MessageId,
    pub status: u32,
}

/// One collection in a `Sync` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionResponse {
    pub class: Class,
    pub status: u32,
    /// Key to send on the next request for this collection
    pub sync_key: SyncKey,
    pub more_available: bool,
    pub commands: Vec<Command>,
    /// Delete outcomes, only present on delete rounds
    pub responses: Vec<DeleteResponse>,
}

impl CollectionResponse {
    /// A successful, empty, final round
    pub fn new(class: Class, sync_key: SyncKey) -> Self {
        Self {
            class,
            status: STATUS_SUCCESS,
            sync_key,
            more_available: false,
            commands: Vec::new(),
            responses: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Decoded `Sync` response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResponse {
    pub collections: Vec<CollectionResponse>,
}

impl SyncResponse {
    pub fn single(collection: CollectionResponse) -> Self {
        Self {
            collections: vec![collection],
        }
    }
}

// ============================================================================
// ITransport trait
// ============================================================================

/// Port trait for the DeltaSync wire layer
///
/// ## Implementation Notes
///
/// - `sync` reports an expired session as [`TransportError::SessionExpired`]
///   and a rejected sync key as [`TransportError::InvalidSyncKey`]; any other
///   collection status is returned in the decoded response.
/// - Download methods stream bytes into `out` as they arrive; nothing is
///   buffered or parsed.
/// - Implementations apply their own timeouts; the engine imposes none.
pub trait ITransport: Send + Sync {
    /// Logs in and returns a fresh session
    fn authenticate(&self, username: &str, password: &str) -> Result<Session, TransportError>;

    /// Renews an expired session
    fn renew(&self, session: &Session) -> Result<Session, TransportError>;

    /// Performs one `Sync` exchange
    fn sync(&self, session: &Session, request: &SyncRequest)
        -> Result<SyncResponse, TransportError>;

    /// Streams the decoded RFC 822 content of a message into `out`
    fn download_content(
        &self,
        session: &Session,
        message_id: &MessageId,
        out: &mut dyn Write,
    ) -> Result<(), TransportError>;

    /// Streams the raw, server-compressed content of a message into `out`
    fn download_raw_content(
        &self,
        session: &Session,
        message_id: &MessageId,
        out: &mut dyn Write,
    ) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> SyncKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_folders_request_tracks_changes() {
        let request = SyncRequest::folders(SyncKey::initial());
        assert_eq!(request.class, Class::Folder);
        assert!(request.folder_id.is_none());
        assert!(request.gets_changes());
        assert_eq!(request.command_count(), 0);
    }

    #[test]
    fn test_messages_request_carries_window_size() {
        let request = SyncRequest::messages("f1".parse().unwrap(), key("k9"), 256);
        assert_eq!(request.class, Class::Email);
        assert_eq!(
            request.operation,
            SyncOperation::GetChanges {
                window_size: Some(256)
            }
        );
    }

    #[test]
    fn test_delete_request_has_one_command_per_id() {
        let ids: Vec<MessageId> = vec!["a".parse().unwrap(), "b".parse().unwrap()];
        let request = SyncRequest::delete_messages("f1".parse().unwrap(), key("k1"), &ids);
        assert!(!request.gets_changes());
        assert_eq!(request.command_count(), 2);
    }

    #[test]
    fn test_collection_response_defaults() {
        let collection = CollectionResponse::new(Class::Folder, key("k1"));
        assert!(collection.is_success());
        assert!(!collection.more_available);
        assert!(collection.commands.is_empty());
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(TransportError::SessionExpired.to_string(), "Session expired");
        assert_eq!(
            TransportError::Authentication("bad password".into()).to_string(),
            "Authentication failed: bad password"
        );
    }

    #[test]
    fn test_session_builder() {
        let session = Session::new("alice@example.com", "t=abc").with_base_uri("https://ds.example");
        assert_eq!(session.base_uri.as_deref(), Some("https://ds.example"));
    }
}
