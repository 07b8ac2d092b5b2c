//! Category store - persistent mapping of category name to metadata.
//!
//! Loaded whole at startup, rewritten whole on every mutation. Categories
//! are created once and never deleted or updated afterwards.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Metadata stored per category. The category name is the map key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Free-form description, possibly empty
    #[serde(default)]
    pub description: String,

    /// Creation timestamp (RFC 3339)
    pub created_at: DateTime<Utc>,
}

/// Persistent store of all known categories.
///
/// Single-process usage is assumed: every successful `add` rewrites the
/// backing file synchronously and no locking is performed.
#[derive(Debug)]
pub struct CategoryStore {
    path: PathBuf,
    categories: HashMap<String, Category>,
}

impl CategoryStore {
    /// Load the store from `path`.
    ///
    /// A missing or unreadable file yields an empty store; corruption is
    /// logged, never fatal.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let categories = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Corrupt category store {}: {} - starting empty", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!("Cannot read category store {}: {} - starting empty", path.display(), e);
                HashMap::new()
            }
        };

        Self { path, categories }
    }

    /// All category names, sorted for stable output. Callers must not attach
    /// meaning to the order.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.categories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Insert a category iff the name is not already present.
    ///
    /// Returns whether an insertion happened; an existing category is left
    /// untouched (its `created_at` is not refreshed). Every insertion is
    /// persisted immediately.
    pub fn add(&mut self, name: &str, description: &str) -> bool {
        if self.categories.contains_key(name) {
            return false;
        }

        self.categories.insert(
            name.to_string(),
            Category {
                description: description.to_string(),
                created_at: Utc::now(),
            },
        );
        self.save();
        true
    }

    /// Full record for a category, if it exists.
    pub fn info(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    /// Number of known categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the store holds no categories.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the backing file. Failures are logged and otherwise ignored:
    /// a save error must not abort the categorization run.
    fn save(&self) {
        let json = match serde_json::to_string_pretty(&self.categories) {
            Ok(json) => json,
            Err(e) => {
                error!("Cannot serialize category store: {}", e);
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, json) {
            error!("Cannot write category store {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, CategoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CategoryStore::load(dir.path().join("categories.json"));
        (dir, store)
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.is_empty());
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_add_and_list() {
        let (_dir, mut store) = temp_store();
        assert!(store.add("Work", "office mail"));
        assert!(store.add("Travel", ""));
        assert_eq!(store.list(), vec!["Travel".to_string(), "Work".to_string()]);
    }

    #[test]
    fn test_add_is_idempotent() {
        let (_dir, mut store) = temp_store();
        assert!(store.add("Work", "first"));
        let created = store.info("Work").unwrap().created_at;

        assert!(!store.add("Work", "second"));
        let after = store.info("Work").unwrap();
        assert_eq!(after.description, "first");
        assert_eq!(after.created_at, created);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_info_not_found() {
        let (_dir, store) = temp_store();
        assert!(store.info("Nope").is_none());
    }

    #[test]
    fn test_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");

        let mut store = CategoryStore::load(&path);
        store.add("Purchases", "online orders");

        let reloaded = CategoryStore::load(&path);
        assert_eq!(reloaded.list(), vec!["Purchases".to_string()]);
        assert_eq!(reloaded.info("Purchases").unwrap().description, "online orders");
    }

    #[test]
    fn test_corrupt_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");
        fs::write(&path, "{ not json").unwrap();

        let store = CategoryStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_after_corrupt_load_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");
        fs::write(&path, "garbage").unwrap();

        let mut store = CategoryStore::load(&path);
        assert!(store.add("Fresh", ""));

        let reloaded = CategoryStore::load(&path);
        assert_eq!(reloaded.list(), vec!["Fresh".to_string()]);
    }
}
