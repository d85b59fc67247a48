//! Folder domain entity

use serde::{Deserialize, Serialize};

use super::newtypes::FolderId;

/// A mailbox folder as last reported by the server
///
/// Folders are immutable values. Within one user's folder set they are
/// identified by [`FolderId`]; the name is the canonical display name
/// (special folders already translated from their raw server names).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    id: FolderId,
    name: String,
    parent_id: Option<FolderId>,
}

impl Folder {
    /// Creates a top-level folder
    pub fn new(id: FolderId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id: None,
        }
    }

    /// Creates a folder nested under `parent_id`
    pub fn with_parent(id: FolderId, name: impl Into<String>, parent_id: Option<FolderId>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id,
        }
    }

    pub fn id(&self) -> &FolderId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_id(&self) -> Option<&FolderId> {
        self.parent_id.as_ref()
    }
}

impl std::fmt::Display for Folder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
