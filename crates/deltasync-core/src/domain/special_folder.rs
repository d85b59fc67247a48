//! Special-folder registry
//!
//! The server gives its built-in folders odd internal names (`drAfT`,
//! `HM_BuLkMail_`, ...). This table maps them to the canonical display names
//! exposed to callers, and back. User-created folders are not in the table
//! and pass through unchanged.

use serde::{Deserialize, Serialize};

/// Server-defined folders whose raw name differs from the display name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialFolder {
    Inbox,
    Drafts,
    Junk,
    Sent,
    Deleted,
    OfflineInstantMessages,
}

/// (folder, display name, raw server name)
const SPECIAL_FOLDERS: [(SpecialFolder, &str, &str); 6] = [
    (SpecialFolder::Inbox, "Inbox", "ACTIVE"),
    (SpecialFolder::Drafts, "Drafts", "drAfT"),
    (SpecialFolder::Junk, "Junk", "HM_BuLkMail_"),
    (SpecialFolder::Sent, "Sent", "sAVeD"),
    (SpecialFolder::Deleted, "Deleted", "trAsH"),
    (
        SpecialFolder::OfflineInstantMessages,
        "Offline Instant Messages",
        ".!!OIM",
    ),
];

impl SpecialFolder {
    /// All special folders, in table order
    pub const ALL: [SpecialFolder; 6] = [
        SpecialFolder::Inbox,
        SpecialFolder::Drafts,
        SpecialFolder::Junk,
        SpecialFolder::Sent,
        SpecialFolder::Deleted,
        SpecialFolder::OfflineInstantMessages,
    ];

    fn entry(self) -> &'static (SpecialFolder, &'static str, &'static str) {
        // Every variant has exactly one row.
        &SPECIAL_FOLDERS[self as usize]
    }

    /// Canonical name shown to callers (e.g. `Drafts`)
    pub fn display_name(self) -> &'static str {
        self.entry().1
    }

    /// Internal name used by the server (e.g. `drAfT`)
    pub fn raw_name(self) -> &'static str {
        self.entry().2
    }

    /// Looks up a special folder by its canonical display name
    pub fn from_display_name(name: &str) -> Option<Self> {
        SPECIAL_FOLDERS
            .iter()
            .find(|(_, display, _)| *display == name)
            .map(|(folder, _, _)| *folder)
    }

    /// Looks up a special folder by the server's raw name
    pub fn from_raw_name(name: &str) -> Option<Self> {
        SPECIAL_FOLDERS
            .iter()
            .find(|(_, _, raw)| *raw == name)
            .map(|(folder, _, _)| *folder)
    }

    /// Maps a server-reported folder name to the name exposed to callers
    ///
    /// Raw special-folder names become their display name; every other name
    /// is returned as-is.
    pub fn map_display_name(raw: &str) -> &str {
        match Self::from_raw_name(raw) {
            Some(folder) => folder.display_name(),
            None => raw,
        }
    }
}

impl std::fmt::Display for SpecialFolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
