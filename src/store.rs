//! Whole-state persistence. The entire session is serialized to one JSON
//! document after every mutation; there is no incremental storage.

use crate::session::Session;
use std::path::{Path, PathBuf};

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store location under an explicit data directory.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("session.json"))
    }

    /// Default store location (~/.local/share/parley/session.json on Linux).
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
            .join("session.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the session. A missing file is the first-run case; a corrupt
    /// file is logged and discarded. Both fall back to a fresh default
    /// session so startup never fails on bad state.
    pub fn load(&self) -> Session {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No session file at {}, starting fresh", self.path.display());
                return Session::default();
            }
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", self.path.display(), e);
                return Session::default();
            }
        };

        match serde_json::from_str::<Session>(&content) {
            Ok(mut session) if !session.chats.is_empty() => {
                session.normalize();
                session
            }
            Ok(_) => {
                tracing::warn!("Session file has no chats, starting fresh");
                Session::default()
            }
            Err(e) => {
                tracing::warn!("Corrupt session file {}: {}", self.path.display(), e);
                Session::default()
            }
        }
    }

    /// Serialize the whole session to disk. Writes through a sibling temp
    /// file and renames it into place so a crash mid-write cannot leave a
    /// truncated document behind.
    pub fn save(&self, session: &Session) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("{}: {}", parent.display(), e)))?;
        }

        let json = serde_json::to_string_pretty(session)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json.as_bytes())
            .map_err(|e| StoreError::Io(format!("{}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::Io(format!("{}: {}", self.path.display(), e)))?;

        tracing::trace!("Saved session to {}", self.path.display());
        Ok(())
    }
}

#[derive(Debug)]
pub enum StoreError {
    Io(String),
    Serialize(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(msg) => write!(f, "IO error: {msg}"),
            StoreError::Serialize(msg) => write!(f, "Serialize error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());

        let mut session = Session::default();
        let chat_id = session.active_chat_id.unwrap();
        session.add_message(chat_id, Role::User, "hello");
        session.add_message(chat_id, Role::Assistant, "hi there");
        store.save(&session).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.chats.len(), 1);
        assert_eq!(loaded.active_chat_id, Some(chat_id));
        assert_eq!(loaded.chats[0].messages.len(), 2);
        assert_eq!(loaded.chats[0].messages[1].content, "hi there");
        assert_eq!(loaded.chat_counter, session.chat_counter);
    }

    #[test]
    fn test_missing_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());
        let session = store.load();
        assert_eq!(session.chats.len(), 1);
        assert_eq!(session.chats[0].title, "New Chat 1");
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());
        std::fs::write(store.path(), "{ definitely not json").unwrap();
        let session = store.load();
        assert_eq!(session.chats.len(), 1);
    }

    #[test]
    fn test_empty_chat_list_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());
        std::fs::write(
            store.path(),
            r#"{"chats": [], "active_chat_id": null, "chat_counter": 7}"#,
        )
        .unwrap();
        let session = store.load();
        assert_eq!(session.chats.len(), 1);
        assert_eq!(session.chat_counter, 2);
    }

    #[test]
    fn test_ids_stay_monotonic_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());

        let mut session = Session::default();
        let chat_id = session.active_chat_id.unwrap();
        let last = session.add_message(chat_id, Role::User, "one").unwrap();
        store.save(&session).unwrap();

        let mut loaded = store.load();
        let next = loaded.add_message(chat_id, Role::User, "two").unwrap();
        assert!(next > last);
    }

    #[test]
    fn test_save_overwrites_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());

        let mut session = Session::default();
        store.save(&session).unwrap();
        session.new_chat();
        store.save(&session).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.chats.len(), 2);
    }
}
