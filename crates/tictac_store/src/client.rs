//! Store client capability.

use crate::error::StoreResult;
use std::collections::BTreeSet;
use tictac_schema::{CollectionOptions, IndexModel};

/// The operations the reconciliation engine may perform against a store.
///
/// Every call blocks until the store has completed or rejected it. Each call
/// must be atomic on its own: it either fully applies or leaves the store
/// unchanged.
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
pub trait StoreClient {
    /// Returns the names of all collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    fn list_collection_names(&self) -> StoreResult<BTreeSet<String>>;

    /// Creates a collection with its validator, level and action attached.
    ///
    /// # Errors
    ///
    /// Returns [`super::StoreError::NamespaceExists`] if the collection is
    /// already present.
    fn create_collection(&self, name: &str, options: &CollectionOptions) -> StoreResult<()>;

    /// Replaces the validator, level and action of an existing collection.
    ///
    /// # Errors
    ///
    /// Returns [`super::StoreError::NamespaceNotFound`] if the collection is
    /// missing, or [`super::StoreError::Rejected`] if the store refuses the
    /// change.
    fn alter_collection(&self, name: &str, options: &CollectionOptions) -> StoreResult<()>;

    /// Returns the options currently attached to a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    fn collection_options(&self, name: &str) -> StoreResult<Option<CollectionOptions>>;

    /// Returns every index on a collection, each carrying its name.
    ///
    /// # Errors
    ///
    /// Returns [`super::StoreError::NamespaceNotFound`] if the collection is
    /// missing.
    fn list_indexes(&self, collection: &str) -> StoreResult<Vec<IndexModel>>;

    /// Returns the names of every index on a collection.
    ///
    /// # Errors
    ///
    /// Same as [`StoreClient::list_indexes`].
    fn list_index_names(&self, collection: &str) -> StoreResult<BTreeSet<String>> {
        Ok(self
            .list_indexes(collection)?
            .iter()
            .map(IndexModel::resolved_name)
            .collect())
    }

    /// Creates an index. The model's options carry its resolved name.
    ///
    /// # Errors
    ///
    /// Returns [`super::StoreError::IndexConflict`] if an index with the same
    /// name but a different definition exists, and
    /// [`super::StoreError::DuplicateKey`] if existing documents violate a
    /// unique index.
    fn create_index(&self, collection: &str, model: &IndexModel) -> StoreResult<()>;
}

impl<S: StoreClient + ?Sized> StoreClient for &S {
    fn list_collection_names(&self) -> StoreResult<BTreeSet<String>> {
        (**self).list_collection_names()
    }

    fn create_collection(&self, name: &str, options: &CollectionOptions) -> StoreResult<()> {
        (**self).create_collection(name, options)
    }

    fn alter_collection(&self, name: &str, options: &CollectionOptions) -> StoreResult<()> {
        (**self).alter_collection(name, options)
    }

    fn collection_options(&self, name: &str) -> StoreResult<Option<CollectionOptions>> {
        (**self).collection_options(name)
    }

    fn list_indexes(&self, collection: &str) -> StoreResult<Vec<IndexModel>> {
        (**self).list_indexes(collection)
    }

    fn list_index_names(&self, collection: &str) -> StoreResult<BTreeSet<String>> {
        (**self).list_index_names(collection)
    }

    fn create_index(&self, collection: &str, model: &IndexModel) -> StoreResult<()> {
        (**self).create_index(collection, model)
    }
}
