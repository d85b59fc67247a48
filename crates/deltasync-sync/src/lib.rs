//! DeltaSync Sync - Synchronization engine
//!
//! Provides:
//! - Sync-key driven pull loops for folders and messages
//! - Transparent session renewal and invalid sync key recovery
//! - Batched message deletion with per-id outcome accounting
//! - Message content download passthrough
//!
//! ## Modules
//!
//! - [`engine`] - The [`SyncEngine`] driving an `ITransport` and an `IStore`

pub mod engine;

pub use engine::SyncEngine;

use deltasync_core::domain::DomainError;
use deltasync_core::ports::transport::{TransportError, STATUS_RESYNC_REQUIRED};
use thiserror::Error;

/// Errors returned by [`SyncEngine`] operations
///
/// Transport failures map onto the same-named variant, so a failed retry
/// surfaces exactly what the transport reported.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A data operation was called before `login`
    #[error("Not logged in")]
    NotLoggedIn,

    /// `login` was called on a logged-in engine
    #[error("Already logged in")]
    AlreadyLoggedIn,

    /// `logout` was called on a logged-out engine
    #[error("Already logged out")]
    AlreadyLoggedOut,

    /// Credentials were rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The session expired and could not be recovered
    #[error("Session expired")]
    SessionExpired,

    /// The sync key was rejected and could not be recovered
    #[error("Invalid sync key")]
    InvalidSyncKey,

    /// A collection came back with a non-success status
    #[error("Sync request failed with status {0}")]
    Status(u32),

    /// The server response violated the protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Network or I/O failure
    #[error("Communication error: {0}")]
    Communication(#[source] std::io::Error),

    /// Invalid domain value
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl SyncError {
    /// Returns true for terminal errors caused by the server's answer
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, SyncError::Status(_) | SyncError::Protocol(_))
    }

    /// Returns true if the server asked for a full resync of a folder
    pub fn is_resync_required(&self) -> bool {
        matches!(self, SyncError::Status(STATUS_RESYNC_REQUIRED))
    }
}

impl From<TransportError> for SyncError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Authentication(msg) => SyncError::Authentication(msg),
            TransportError::SessionExpired => SyncError::SessionExpired,
            TransportError::InvalidSyncKey => SyncError::InvalidSyncKey,
            TransportError::Protocol(msg) => SyncError::Protocol(msg),
            TransportError::Communication(e) => SyncError::Communication(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_map_without_nesting() {
        assert!(matches!(
            SyncError::from(TransportError::SessionExpired),
            SyncError::SessionExpired
        ));
        assert!(matches!(
            SyncError::from(TransportError::InvalidSyncKey),
            SyncError::InvalidSyncKey
        ));
        let err = SyncError::from(TransportError::Authentication("bad password".into()));
        assert_eq!(err.to_string(), "Authentication failed: bad password");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(
            SyncError::Status(4104).to_string(),
            "Sync request failed with status 4104"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(SyncError::Status(500).is_protocol_error());
        assert!(SyncError::Protocol("x".into()).is_protocol_error());
        assert!(!SyncError::NotLoggedIn.is_protocol_error());
        assert!(SyncError::Status(4104).is_resync_required());
        assert!(!SyncError::Status(4402).is_resync_required());
    }
}
