//! File-backed store for persistent storage.
//!
//! A store directory has this layout:
//!
//! ```text
//! <store_path>/
//! ├─ CATALOG.json      # Collections, options, indexes and documents
//! └─ LOCK              # Advisory lock for single-process access
//! ```
//!
//! The LOCK file ensures only one process opens the store at a time.
//! CATALOG.json is rewritten after every successful mutation.

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use crate::memory::StoreState;
use fs2::FileExt;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tictac_schema::{CollectionOptions, Document, IndexModel, Value};
use tracing::debug;

const CATALOG_FILE: &str = "CATALOG.json";
const CATALOG_TEMP: &str = "CATALOG.json.tmp";
const LOCK_FILE: &str = "LOCK";

/// A store persisted as JSON inside a locked directory.
///
/// Semantics match [`crate::InMemoryStore`]. Each mutation is applied to a
/// copy of the state, written to disk, and only then made visible, so a
/// failed write leaves both the file and the in-memory state unchanged.
///
/// # Durability
///
/// The catalog is written to a temporary file, synced, and renamed over the
/// previous catalog. The directory is synced after the rename on Unix.
///
/// # Example
///
/// ```no_run
/// use tictac_schema::CollectionOptions;
/// use tictac_store::{FileStore, StoreClient};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("tictac_data"), true).unwrap();
/// store.create_collection("players", &CollectionOptions::default()).unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: RwLock<StoreState>,
    _lock_file: File,
}

impl FileStore {
    /// Opens or creates a store directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the store directory
    /// * `create_if_missing` - If true, creates the directory if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another process holds the lock (returns `Locked`)
    /// - The catalog cannot be parsed (returns `Corrupted`)
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool) -> StoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(StoreError::unavailable(format!(
                    "store directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(StoreError::unavailable(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        // Non-blocking: a second opener fails instead of waiting.
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked);
        }

        let state = load_catalog(&path.join(CATALOG_FILE))?;
        debug!(path = %path.display(), "opened file store");

        Ok(Self {
            path: path.to_path_buf(),
            state: RwLock::new(state),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a copy of the store's contents.
    #[must_use]
    pub fn snapshot(&self) -> StoreState {
        self.state.read().clone()
    }

    /// Inserts a document and returns its `_id`.
    ///
    /// # Errors
    ///
    /// Same as [`crate::InMemoryStore::insert`], plus I/O errors.
    pub fn insert(&self, collection: &str, doc: Document) -> StoreResult<Value> {
        self.mutate(|state| state.insert(collection, doc))
    }

    /// Replaces the document with the given `_id`.
    ///
    /// # Errors
    ///
    /// Same as [`crate::InMemoryStore::replace`], plus I/O errors.
    pub fn replace(&self, collection: &str, id: &Value, doc: Document) -> StoreResult<()> {
        self.mutate(|state| state.replace(collection, id, doc))
    }

    /// Returns every document of a collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NamespaceNotFound`] if the collection is missing.
    pub fn find_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        self.state.read().find_all(collection)
    }

    /// Returns the number of documents in a collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NamespaceNotFound`] if the collection is missing.
    pub fn count(&self, collection: &str) -> StoreResult<usize> {
        self.state.read().count(collection)
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut StoreState) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.state.write();
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.save_catalog(&next)?;
        *guard = next;
        Ok(out)
    }

    /// Writes the catalog with write-then-rename.
    fn save_catalog(&self, state: &StoreState) -> StoreResult<()> {
        let data =
            serde_json::to_vec_pretty(state).map_err(|e| StoreError::Corrupted(e.to_string()))?;
        let temp_path = self.path.join(CATALOG_TEMP);

        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, self.path.join(CATALOG_FILE))?;
        self.sync_directory()
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StoreResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StoreResult<()> {
        Ok(())
    }
}

fn load_catalog(path: &Path) -> StoreResult<StoreState> {
    if !path.exists() {
        return Ok(StoreState::new());
    }
    let mut data = Vec::new();
    File::open(path)?.read_to_end(&mut data)?;
    if data.is_empty() {
        return Ok(StoreState::new());
    }
    serde_json::from_slice(&data).map_err(|e| StoreError::Corrupted(e.to_string()))
}

impl StoreClient for FileStore {
    fn list_collection_names(&self) -> StoreResult<BTreeSet<String>> {
        Ok(self.state.read().collection_names())
    }

    fn create_collection(&self, name: &str, options: &CollectionOptions) -> StoreResult<()> {
        self.mutate(|state| state.create_collection(name, options))
    }

    fn alter_collection(&self, name: &str, options: &CollectionOptions) -> StoreResult<()> {
        self.mutate(|state| state.alter_collection(name, options))
    }

    fn collection_options(&self, name: &str) -> StoreResult<Option<CollectionOptions>> {
        Ok(self.state.read().collection_options(name))
    }

    fn list_indexes(&self, collection: &str) -> StoreResult<Vec<IndexModel>> {
        self.state.read().list_indexes(collection)
    }

    fn create_index(&self, collection: &str, model: &IndexModel) -> StoreResult<()> {
        self.mutate(|state| state.create_index(collection, model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tictac_schema::{IndexOptions, KeySpec, ValidationLevel};

    #[test]
    fn open_creates_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store");
        let store = FileStore::open(&path, true).unwrap();
        assert!(path.join(LOCK_FILE).exists());
        assert!(store.list_collection_names().unwrap().is_empty());
    }

    #[test]
    fn open_missing_without_create_fails() {
        let dir = tempdir().unwrap();
        let result = FileStore::open(&dir.path().join("absent"), false);
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn second_open_is_locked() {
        let dir = tempdir().unwrap();
        let _first = FileStore::open(dir.path(), true).unwrap();
        let second = FileStore::open(dir.path(), true);
        assert!(matches!(second, Err(StoreError::Locked)));
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempdir().unwrap();
        let options = CollectionOptions::default().level(ValidationLevel::Moderate);
        let index = IndexModel::new(KeySpec::new().asc("user"), IndexOptions::new().unique());
        {
            let store = FileStore::open(dir.path(), true).unwrap();
            store.create_collection("scores", &options).unwrap();
            store.create_index("scores", &index).unwrap();
            store
                .insert("scores", Document::new().with("user", "bob").with("wins", 2))
                .unwrap();
        }

        let store = FileStore::open(dir.path(), false).unwrap();
        assert_eq!(store.collection_options("scores").unwrap(), Some(options));
        assert!(store.list_index_names("scores").unwrap().contains("user_1"));
        let docs = store.find_all("scores").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get("wins").and_then(Value::as_i64), Some(2));

        let dup = store.insert("scores", Document::new().with("user", "bob"));
        assert!(matches!(dup, Err(StoreError::DuplicateKey { .. })));
    }

    #[test]
    fn rejected_mutation_is_not_persisted() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path(), true).unwrap();
        store
            .create_collection("games", &CollectionOptions::default())
            .unwrap();
        let before = fs::read(dir.path().join(CATALOG_FILE)).unwrap();

        let result = store.create_collection("games", &CollectionOptions::default());
        assert!(matches!(result, Err(StoreError::NamespaceExists(_))));
        assert_eq!(fs::read(dir.path().join(CATALOG_FILE)).unwrap(), before);
        assert!(!dir.path().join(CATALOG_TEMP).exists());
    }

    #[test]
    fn non_finite_number_never_reaches_catalog() {
        let dir = tempdir().unwrap();
        {
            let store = FileStore::open(dir.path(), true).unwrap();
            store
                .create_collection("scores", &CollectionOptions::default())
                .unwrap();
            store
                .insert("scores", Document::new().with("user", "alice"))
                .unwrap();
            let result = store.insert(
                "scores",
                Document::new().with("user", "bob").with("ratio", f64::NAN),
            );
            assert!(matches!(result, Err(StoreError::Rejected(_))));
        }

        let store = FileStore::open(dir.path(), false).unwrap();
        assert_eq!(store.count("scores").unwrap(), 1);
    }

    #[test]
    fn corrupted_catalog_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CATALOG_FILE), b"{ not json").unwrap();
        let result = FileStore::open(dir.path(), false);
        assert!(matches!(result, Err(StoreError::Corrupted(_))));
    }
}
