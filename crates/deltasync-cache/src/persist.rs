//! On-disk persistence of cache state
//!
//! Each user's [`CacheState`] lives in its own JSON file under a state
//! directory. File names are the hex SHA-256 of the username so arbitrary
//! usernames (with `@`, `/`, ...) map to safe, fixed-length names.
//!
//! - **Atomic writes**: every save writes a sibling `.tmp` file and renames
//!   it over the target, so a crash never leaves a half-written state.
//! - **Self-describing**: the file carries the username it belongs to and
//!   is checked on load.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use deltasync_core::domain::CacheState;
use deltasync_core::ports::IStateListener;

use crate::CacheError;

/// Current on-disk format version
const FORMAT_VERSION: u32 = 1;

/// Envelope written to each state file
#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    version: u32,
    username: String,
    saved_at: DateTime<Utc>,
    state: CacheState,
}

/// Writes per-user cache state to a directory of JSON files
///
/// Implements [`IStateListener`], so it can be attached to an
/// [`InMemoryStore`](crate::InMemoryStore) to save after every change.
#[derive(Debug, Clone)]
pub struct FileStatePersister {
    dir: PathBuf,
}

impl FileStatePersister {
    /// Opens (creating if needed) the state directory
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The state directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the state file for `username`
    pub fn path_for(&self, username: &str) -> PathBuf {
        let digest = Sha256::digest(username.as_bytes());
        self.dir.join(format!("{:x}.json", digest))
    }

    /// Writes `state` for `username`, replacing any previous file
    pub fn save(&self, username: &str, state: &CacheState) -> Result<(), CacheError> {
        let target = self.path_for(username);
        let envelope = PersistedState {
            version: FORMAT_VERSION,
            username: username.to_string(),
            saved_at: Utc::now(),
            state: state.clone(),
        };
        let data = serde_json::to_vec_pretty(&envelope)?;

        let mut tmp_path = target.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, &target)?;
        debug!(%username, path = %target.display(), "Saved cache state");
        Ok(())
    }

    /// Reads the state saved for `username`, if any
    pub fn load(&self, username: &str) -> Result<Option<CacheState>, CacheError> {
        let path = self.path_for(username);
        if !path.exists() {
            return Ok(None);
        }
        let envelope = Self::read(&path)?;
        if envelope.username != username {
            return Err(CacheError::UserMismatch {
                path: path.display().to_string(),
            });
        }
        Ok(Some(envelope.state))
    }

    /// Reads every state file in the directory
    ///
    /// Leftover `.tmp` files and non-JSON entries are skipped.
    pub fn load_all(&self) -> Result<Vec<(String, CacheState)>, CacheError> {
        let mut states = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let envelope = Self::read(&path)?;
            if self.path_for(&envelope.username) != path {
                return Err(CacheError::UserMismatch {
                    path: path.display().to_string(),
                });
            }
            states.push((envelope.username, envelope.state));
        }
        Ok(states)
    }

    /// Removes the state file for `username`; returns whether one existed
    pub fn remove(&self, username: &str) -> Result<bool, CacheError> {
        let path = self.path_for(username);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn read(path: &Path) -> Result<PersistedState, CacheError> {
        let data = fs::read(path)?;
        let envelope: PersistedState = serde_json::from_slice(&data)?;
        if envelope.version != FORMAT_VERSION {
            return Err(CacheError::SerializationError(format!(
                "unsupported state format version {} in {}",
                envelope.version,
                path.display()
            )));
        }
        Ok(envelope)
    }
}

impl IStateListener for FileStatePersister {
    fn state_changed(&self, username: &str, state: &CacheState) {
        if let Err(e) = self.save(username, state) {
            warn!(%username, error = %e, "Failed to persist cache state");
        }
    }
}

#[cfg(test)]
mod tests {
    use deltasync_core::domain::{Folder, FolderDelta, SyncKey};
    use tempfile::TempDir;

    use super::*;

    fn sample_state(key: &str) -> CacheState {
        let mut state = CacheState::new();
        let mut delta = FolderDelta::new();
        delta
            .added
            .push(Folder::new("f1".parse().unwrap(), "Inbox"));
        state.apply_folders(SyncKey::new(key.to_string()).unwrap(), delta);
        state
    }

    #[test]
    fn test_path_for_is_stable_and_hashed() {
        let dir = TempDir::new().unwrap();
        let persister = FileStatePersister::new(dir.path()).unwrap();

        let a = persister.path_for("user@example.com");
        let b = persister.path_for("user@example.com");
        assert_eq!(a, b);
        assert_ne!(a, persister.path_for("other@example.com"));

        let name = a.file_name().unwrap().to_str().unwrap();
        assert_eq!(name.len(), 64 + ".json".len());
        assert!(!name.contains('@'));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let persister = FileStatePersister::new(dir.path()).unwrap();
        let state = sample_state("k9");

        persister.save("alice", &state).unwrap();

        assert_eq!(persister.load("alice").unwrap(), Some(state));
        assert_eq!(persister.load("bob").unwrap(), None);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let persister = FileStatePersister::new(dir.path()).unwrap();
        persister.save("alice", &sample_state("k1")).unwrap();
        persister.save("alice", &sample_state("k2")).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json"));
    }

    #[test]
    fn test_load_all_skips_foreign_files() {
        let dir = TempDir::new().unwrap();
        let persister = FileStatePersister::new(dir.path()).unwrap();
        persister.save("alice", &sample_state("a")).unwrap();
        persister.save("bob", &sample_state("b")).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let mut users: Vec<_> = persister
            .load_all()
            .unwrap()
            .into_iter()
            .map(|(user, _)| user)
            .collect();
        users.sort();
        assert_eq!(users, vec!["alice", "bob"]);
    }

    #[test]
    fn test_renamed_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let persister = FileStatePersister::new(dir.path()).unwrap();
        persister.save("alice", &sample_state("a")).unwrap();
        fs::rename(persister.path_for("alice"), persister.path_for("bob")).unwrap();

        assert!(matches!(
            persister.load("bob"),
            Err(CacheError::UserMismatch { .. })
        ));
    }

    #[test]
    fn test_corrupt_file_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let persister = FileStatePersister::new(dir.path()).unwrap();
        fs::write(persister.path_for("alice"), "{ not json").unwrap();

        assert!(matches!(
            persister.load("alice"),
            Err(CacheError::SerializationError(_))
        ));
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let persister = FileStatePersister::new(dir.path()).unwrap();
        persister.save("alice", &sample_state("a")).unwrap();

        assert!(persister.remove("alice").unwrap());
        assert!(!persister.remove("alice").unwrap());
        assert_eq!(persister.load("alice").unwrap(), None);
    }

    #[test]
    fn test_listener_failure_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let persister = FileStatePersister::new(dir.path().join("state")).unwrap();
        fs::remove_dir_all(persister.dir()).unwrap();

        // Directory is gone; save fails and is only logged.
        persister.state_changed("alice", &sample_state("a"));
        assert!(!persister.dir().exists());
    }
}
