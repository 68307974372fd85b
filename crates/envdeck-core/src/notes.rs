use crate::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Free-text notes per environment, persisted to a flat JSON file.
///
/// The whole map is rewritten on each save; last write wins. This mirrors the
/// human-interactive scale of the console — dozens of entries, not thousands.
pub struct NoteStore {
    path: PathBuf,
    notes: Mutex<HashMap<String, String>>,
}

impl NoteStore {
    /// Open the store, loading any existing notes file. A missing or
    /// unreadable file starts the store empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let notes = match Self::load_file(&path) {
            Ok(notes) => {
                tracing::info!("Loaded {} environment notes", notes.len());
                notes
            }
            Err(e) => {
                tracing::warn!("Could not load notes from {}: {}", path.display(), e);
                HashMap::new()
            }
        };
        Self {
            path,
            notes: Mutex::new(notes),
        }
    }

    fn load_file(path: &Path) -> Result<HashMap<String, String>> {
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Note for one environment, empty string when none.
    pub fn get(&self, env_id: &str) -> String {
        self.notes
            .lock()
            .expect("notes lock poisoned")
            .get(env_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Set a note and persist the whole map.
    pub fn set(&self, env_id: &str, note: &str) -> Result<()> {
        let snapshot = {
            let mut notes = self.notes.lock().expect("notes lock poisoned");
            if note.is_empty() {
                notes.remove(env_id);
            } else {
                notes.insert(env_id.to_string(), note.to_string());
            }
            notes.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, notes: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(notes)?;
        std::fs::write(&self.path, contents)?;
        tracing::debug!("Saved {} environment notes", notes.len());
        Ok(())
    }

    /// Number of stored notes.
    pub fn len(&self) -> usize {
        self.notes.lock().expect("notes lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoteStore::open(dir.path().join("notes.json"));
        assert_eq!(store.get("env-1"), "");
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoteStore::open(dir.path().join("notes.json"));
        store.set("env-1", "primary account").unwrap();
        assert_eq!(store.get("env-1"), "primary account");
    }

    #[test]
    fn test_last_write_wins_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");

        let store = NoteStore::open(&path);
        store.set("env-1", "first").unwrap();
        store.set("env-1", "second").unwrap();
        drop(store);

        let reopened = NoteStore::open(&path);
        assert_eq!(reopened.get("env-1"), "second");
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_empty_note_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoteStore::open(dir.path().join("notes.json"));
        store.set("env-1", "something").unwrap();
        store.set("env-1", "").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("notes.json");
        let store = NoteStore::open(&path);
        store.set("env-1", "note").unwrap();
        assert!(path.exists());
    }
}
