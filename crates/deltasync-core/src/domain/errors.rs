//! Domain error types
//!
//! This module defines error types for domain value validation: sync keys,
//! entity identifiers and engine tuning values.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid sync key (empty token)
    #[error("Invalid sync key: {0}")]
    InvalidSyncKey(String),

    /// Invalid folder or message identifier
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Window size must be a positive number of commands
    #[error("Invalid window size: {0}")]
    InvalidWindowSize(u32),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
