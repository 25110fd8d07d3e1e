use super::files::{atomic_write, ensure_dir, read_file};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Key holding the serialized user collection
pub const USERS_KEY: &str = "users";
/// Key holding the display theme
pub const THEME_KEY: &str = "theme";
/// Key holding the current user id
pub const CURRENT_USER_KEY: &str = "currentUser";
/// Key holding the folder/list selection
pub const SELECTION_KEY: &str = "selection";

/// Durable string key/value store, one file per key under a directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        ensure_dir(&dir)?;
        Ok(Self { dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        read_file(self.key_path(key))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        atomic_write(self.key_path(key), value)
            .with_context(|| format!("Failed to store key `{}`", key))
    }

    /// Move an unreadable value aside as `<key>.json.corrupt`, returning its new path
    pub fn quarantine(&self, key: &str) -> Result<PathBuf> {
        let path = self.key_path(key);
        let target = self.dir.join(format!("{}.json.corrupt", key));
        fs::rename(&path, &target)
            .with_context(|| format!("Failed to move aside corrupt key `{}`", key))?;
        Ok(target)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove key `{}`", key))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_get_missing_key() {
        let temp_dir = tempdir().unwrap();
        let store = LocalStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.get(THEME_KEY).unwrap(), None);
    }

    #[test]
    fn test_set_get_remove() {
        let temp_dir = tempdir().unwrap();
        let store = LocalStore::open(temp_dir.path().join("data")).unwrap();

        store.set(CURRENT_USER_KEY, "u1").unwrap();
        assert_eq!(store.get(CURRENT_USER_KEY).unwrap().as_deref(), Some("u1"));

        store.set(CURRENT_USER_KEY, "u2").unwrap();
        assert_eq!(store.get(CURRENT_USER_KEY).unwrap().as_deref(), Some("u2"));

        store.remove(CURRENT_USER_KEY).unwrap();
        assert_eq!(store.get(CURRENT_USER_KEY).unwrap(), None);

        // Removing twice is fine
        store.remove(CURRENT_USER_KEY).unwrap();
    }

    #[test]
    fn test_keys_are_independent() {
        let temp_dir = tempdir().unwrap();
        let store = LocalStore::open(temp_dir.path()).unwrap();

        store.set(USERS_KEY, "[]").unwrap();
        store.set(THEME_KEY, "dark").unwrap();

        assert_eq!(store.get(USERS_KEY).unwrap().as_deref(), Some("[]"));
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
        assert!(!temp_dir.path().join("currentUser.json").exists());
    }

    #[test]
    fn test_quarantine_moves_value_aside() {
        let temp_dir = tempdir().unwrap();
        let store = LocalStore::open(temp_dir.path()).unwrap();
        store.set(USERS_KEY, "[{").unwrap();

        let moved = store.quarantine(USERS_KEY).unwrap();

        assert_eq!(moved, temp_dir.path().join("users.json.corrupt"));
        assert_eq!(fs::read_to_string(&moved).unwrap(), "[{");
        assert_eq!(store.get(USERS_KEY).unwrap(), None);
        assert!(store.quarantine(USERS_KEY).is_err());
    }
}
