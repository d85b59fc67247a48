//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the sync engine
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ITransport`] - DeltaSync wire layer (login, renew, Sync, download)
//! - [`IStore`] - Per-user cache of sync keys, folders and messages
//! - [`IStateListener`] - Change hook used to persist cache state

pub mod store;
pub mod transport;

pub use store::{IStateListener, IStore};
pub use transport::{
    Class, CollectionResponse, Command, DeleteResponse, FolderCommand, FolderDetails,
    ITransport, MessageCommand, MessageDetails, RequestCommand, Session, SyncOperation,
    SyncRequest, SyncResponse, TransportError,
};
