//! Fault injection for store clients.
//!
//! [`FaultyStore`] wraps any [`StoreClient`] and can:
//! - Reject alterations, creations or index builds for chosen names
//! - Simulate another process creating a collection first
//! - Go offline after a fixed number of calls
//!
//! Every call that reaches the wrapper is counted, and every write that
//! reaches the inner store is logged.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tictac_schema::{CollectionOptions, IndexModel};
use tictac_store::{StoreClient, StoreError, StoreResult};

/// A write forwarded to the inner store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    /// `create_collection(name)`.
    CreateCollection(String),
    /// `alter_collection(name)`.
    AlterCollection(String),
    /// `create_index(collection, name)`.
    CreateIndex(String, String),
}

/// A store wrapper that fails on demand.
#[derive(Debug)]
pub struct FaultyStore<S> {
    inner: S,
    reject_alter: BTreeSet<String>,
    reject_create: BTreeSet<String>,
    reject_index: BTreeSet<(String, String)>,
    race_create: BTreeSet<String>,
    offline_after: Option<usize>,
    calls: AtomicUsize,
    writes: Mutex<Vec<StoreWrite>>,
}

impl<S: StoreClient> FaultyStore<S> {
    /// Wraps a store without injecting any fault.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reject_alter: BTreeSet::new(),
            reject_create: BTreeSet::new(),
            reject_index: BTreeSet::new(),
            race_create: BTreeSet::new(),
            offline_after: None,
            calls: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Rejects every alteration of a collection.
    #[must_use]
    pub fn reject_alter(mut self, collection: &str) -> Self {
        self.reject_alter.insert(collection.to_string());
        self
    }

    /// Rejects creation of a collection.
    #[must_use]
    pub fn reject_create(mut self, collection: &str) -> Self {
        self.reject_create.insert(collection.to_string());
        self
    }

    /// Rejects creation of an index by resolved name.
    #[must_use]
    pub fn reject_index(mut self, collection: &str, name: &str) -> Self {
        self.reject_index
            .insert((collection.to_string(), name.to_string()));
        self
    }

    /// Makes `create_collection` behave as if another process created the
    /// collection just before this call: the inner store gets the
    /// collection, and the caller gets `NamespaceExists`.
    #[must_use]
    pub fn race_create(mut self, collection: &str) -> Self {
        self.race_create.insert(collection.to_string());
        self
    }

    /// Fails every call after the first `calls` with `Unavailable`.
    #[must_use]
    pub fn offline_after(mut self, calls: usize) -> Self {
        self.offline_after = Some(calls);
        self
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns the number of calls made so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the writes forwarded to the inner store.
    pub fn writes(&self) -> Vec<StoreWrite> {
        self.writes.lock().clone()
    }

    /// Forgets recorded writes and resets the call count.
    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
        self.writes.lock().clear();
    }

    fn enter(&self) -> StoreResult<()> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.offline_after {
            Some(limit) if previous >= limit => {
                Err(StoreError::unavailable("injected: store went offline"))
            }
            _ => Ok(()),
        }
    }

    fn log(&self, write: StoreWrite) {
        self.writes.lock().push(write);
    }
}

impl<S: StoreClient> StoreClient for FaultyStore<S> {
    fn list_collection_names(&self) -> StoreResult<BTreeSet<String>> {
        self.enter()?;
        self.inner.list_collection_names()
    }

    fn create_collection(&self, name: &str, options: &CollectionOptions) -> StoreResult<()> {
        self.enter()?;
        if self.reject_create.contains(name) {
            return Err(StoreError::rejected(format!("injected: create {name} denied")));
        }
        self.log(StoreWrite::CreateCollection(name.to_string()));
        if self.race_create.contains(name) {
            self.inner.create_collection(name, &CollectionOptions::default())?;
            return Err(StoreError::NamespaceExists(name.to_string()));
        }
        self.inner.create_collection(name, options)
    }

    fn alter_collection(&self, name: &str, options: &CollectionOptions) -> StoreResult<()> {
        self.enter()?;
        if self.reject_alter.contains(name) {
            return Err(StoreError::rejected(format!("injected: alter {name} denied")));
        }
        self.log(StoreWrite::AlterCollection(name.to_string()));
        self.inner.alter_collection(name, options)
    }

    fn collection_options(&self, name: &str) -> StoreResult<Option<CollectionOptions>> {
        self.enter()?;
        self.inner.collection_options(name)
    }

    fn list_indexes(&self, collection: &str) -> StoreResult<Vec<IndexModel>> {
        self.enter()?;
        self.inner.list_indexes(collection)
    }

    fn create_index(&self, collection: &str, model: &IndexModel) -> StoreResult<()> {
        self.enter()?;
        let name = model.resolved_name();
        if self
            .reject_index
            .contains(&(collection.to_string(), name.clone()))
        {
            return Err(StoreError::rejected(format!(
                "injected: index {collection}.{name} denied"
            )));
        }
        self.log(StoreWrite::CreateIndex(collection.to_string(), name));
        self.inner.create_index(collection, model)
    }
}
