//! In-memory store for testing.

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tictac_schema::{
    CollectionOptions, Document, IndexModel, IndexOptions, KeySpec, ValidationAction, Value,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// Name of the index every collection carries on `_id`.
pub const ID_INDEX_NAME: &str = "_id_";

/// Everything stored for one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionState {
    /// Validator and its enforcement policy.
    pub options: CollectionOptions,
    /// Indexes, each carrying its resolved name.
    pub indexes: Vec<IndexModel>,
    /// Documents in insertion order.
    pub documents: Vec<Document>,
}

impl CollectionState {
    fn new(options: CollectionOptions) -> Self {
        Self {
            options,
            indexes: vec![id_index()],
            documents: Vec::new(),
        }
    }
}

/// The complete contents of a store.
///
/// Every operation either applies fully or returns an error and leaves the
/// state untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    collections: BTreeMap<String, CollectionState>,
}

impl StoreState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a collection's state.
    pub fn collection(&self, name: &str) -> Option<&CollectionState> {
        self.collections.get(name)
    }

    /// Returns the names of all collections.
    pub fn collection_names(&self) -> BTreeSet<String> {
        self.collections.keys().cloned().collect()
    }

    /// Creates a collection.
    pub fn create_collection(
        &mut self,
        name: &str,
        options: &CollectionOptions,
    ) -> StoreResult<()> {
        if name.is_empty() {
            return Err(StoreError::rejected("collection name is empty"));
        }
        if self.collections.contains_key(name) {
            return Err(StoreError::NamespaceExists(name.to_string()));
        }
        options
            .validator
            .verify()
            .map_err(|e| StoreError::rejected(e.to_string()))?;
        self.collections
            .insert(name.to_string(), CollectionState::new(options.clone()));
        debug!(collection = name, "created collection");
        Ok(())
    }

    /// Replaces a collection's options. Existing documents are not
    /// re-validated.
    pub fn alter_collection(&mut self, name: &str, options: &CollectionOptions) -> StoreResult<()> {
        let state = self.collection_mut(name)?;
        options
            .validator
            .verify()
            .map_err(|e| StoreError::rejected(e.to_string()))?;
        state.options = options.clone();
        debug!(
            collection = name,
            level = %options.level,
            action = %options.action,
            "altered collection"
        );
        Ok(())
    }

    /// Returns a collection's options.
    pub fn collection_options(&self, name: &str) -> Option<CollectionOptions> {
        self.collections.get(name).map(|c| c.options.clone())
    }

    /// Returns a collection's indexes.
    pub fn list_indexes(&self, collection: &str) -> StoreResult<Vec<IndexModel>> {
        self.collections
            .get(collection)
            .map(|c| c.indexes.clone())
            .ok_or_else(|| StoreError::NamespaceNotFound(collection.to_string()))
    }

    /// Creates an index, building it over the existing documents.
    pub fn create_index(&mut self, collection: &str, model: &IndexModel) -> StoreResult<()> {
        model
            .verify()
            .map_err(|e| StoreError::rejected(e.to_string()))?;
        let model = model.named();
        let name = model.resolved_name();
        let state = self.collection_mut(collection)?;

        if let Some(existing) = state.indexes.iter().find(|i| i.resolved_name() == name) {
            if existing.same_definition(&model) {
                return Ok(());
            }
            return Err(StoreError::index_conflict(
                collection,
                format!("index {name} already exists with a different definition"),
            ));
        }
        if let Some(existing) = state.indexes.iter().find(|i| i.same_definition(&model)) {
            return Err(StoreError::index_conflict(
                collection,
                format!(
                    "index {} already exists with the same definition as {name}",
                    existing.resolved_name()
                ),
            ));
        }

        if model.options.unique {
            let keys: Vec<_> = state
                .documents
                .iter()
                .filter_map(|doc| index_key(&model, doc))
                .collect();
            for (i, key) in keys.iter().enumerate() {
                if keys[..i].contains(key) {
                    return Err(StoreError::DuplicateKey {
                        collection: collection.to_string(),
                        index: name,
                    });
                }
            }
        }

        debug!(collection, index = %name, keys = %model.keys, "created index");
        state.indexes.push(model);
        Ok(())
    }

    /// Inserts a document, assigning `_id` when missing, and returns its id.
    pub fn insert(&mut self, collection: &str, doc: Document) -> StoreResult<Value> {
        let state = self.collection_mut(collection)?;
        let doc = if doc.contains_key("_id") {
            doc
        } else {
            with_leading_id(Value::Id(Uuid::new_v4()), &doc)
        };
        let id = doc.get("_id").cloned().unwrap_or(Value::Null);

        check_finite(collection, &doc)?;
        validate(collection, &state.options, &doc, None)?;
        check_unique(collection, state, &doc, None)?;
        state.documents.push(doc);
        Ok(id)
    }

    /// Replaces the document whose `_id` equals `id`.
    pub fn replace(&mut self, collection: &str, id: &Value, doc: Document) -> StoreResult<()> {
        let state = self.collection_mut(collection)?;
        let position = state
            .documents
            .iter()
            .position(|d| d.get("_id") == Some(id))
            .ok_or_else(|| {
                StoreError::rejected(format!("no document in {collection} with _id {id:?}"))
            })?;

        let doc = if doc.contains_key("_id") {
            if doc.get("_id") != Some(id) {
                return Err(StoreError::rejected("_id cannot be changed"));
            }
            doc
        } else {
            with_leading_id(id.clone(), &doc)
        };

        check_finite(collection, &doc)?;
        let existing_valid = state.options.validator.is_valid(&state.documents[position]);
        validate(collection, &state.options, &doc, Some(existing_valid))?;
        check_unique(collection, state, &doc, Some(position))?;
        state.documents[position] = doc;
        Ok(())
    }

    /// Returns every document of a collection.
    pub fn find_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        self.collections
            .get(collection)
            .map(|c| c.documents.clone())
            .ok_or_else(|| StoreError::NamespaceNotFound(collection.to_string()))
    }

    /// Returns the number of documents in a collection.
    pub fn count(&self, collection: &str) -> StoreResult<usize> {
        self.collections
            .get(collection)
            .map(|c| c.documents.len())
            .ok_or_else(|| StoreError::NamespaceNotFound(collection.to_string()))
    }

    fn collection_mut(&mut self, name: &str) -> StoreResult<&mut CollectionState> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| StoreError::NamespaceNotFound(name.to_string()))
    }
}

fn with_leading_id(id: Value, doc: &Document) -> Document {
    let mut stored = Document::new().with("_id", id);
    for (key, value) in doc.iter() {
        stored.insert(key, value.clone());
    }
    stored
}

fn id_index() -> IndexModel {
    IndexModel::new(
        KeySpec::new().asc("_id"),
        IndexOptions::new().name(ID_INDEX_NAME).unique(),
    )
}

/// Returns the key tuple a document contributes to an index, or `None` if
/// the index skips it (partial filter not matched, or sparse with every
/// key field absent). Absent fields key as null.
fn index_key(model: &IndexModel, doc: &Document) -> Option<Vec<Value>> {
    if let Some(filter) = &model.options.partial_filter {
        if !filter.matches(doc) {
            return None;
        }
    }
    let values: Vec<Option<&Value>> = model.keys.fields().map(|f| doc.get_path(f)).collect();
    if model.options.sparse && values.iter().all(Option::is_none) {
        return None;
    }
    Some(
        values
            .into_iter()
            .map(|v| v.cloned().unwrap_or(Value::Null))
            .collect(),
    )
}

fn check_unique(
    collection: &str,
    state: &CollectionState,
    doc: &Document,
    skip: Option<usize>,
) -> StoreResult<()> {
    for index in state.indexes.iter().filter(|i| i.options.unique) {
        let Some(key) = index_key(index, doc) else {
            continue;
        };
        let clash = state
            .documents
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .any(|(_, other)| index_key(index, other).as_ref() == Some(&key));
        if clash {
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                index: index.resolved_name(),
            });
        }
    }
    Ok(())
}

/// Rejects documents holding NaN or infinite doubles, which the catalog
/// cannot store.
fn check_finite(collection: &str, doc: &Document) -> StoreResult<()> {
    if doc.is_finite() {
        Ok(())
    } else {
        Err(StoreError::rejected(format!(
            "document for {collection} holds a non-finite number"
        )))
    }
}

fn validate(
    collection: &str,
    options: &CollectionOptions,
    doc: &Document,
    existing_valid: Option<bool>,
) -> StoreResult<()> {
    if !options.level.applies(existing_valid) {
        return Ok(());
    }
    let violations = options.validator.check(doc);
    if violations.is_empty() {
        return Ok(());
    }
    let message = violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    match options.action {
        ValidationAction::Error => Err(StoreError::ValidationFailed {
            collection: collection.to_string(),
            message,
        }),
        ValidationAction::Warn => {
            warn!(collection, %message, "accepted document failing validation");
            Ok(())
        }
    }
}

/// An in-memory store.
///
/// Suitable for unit and integration tests and for ephemeral use. Enforces
/// the same validator and index semantics as [`crate::FileStore`].
///
/// # Thread Safety
///
/// Every operation takes the state lock for its whole duration, so each
/// call is atomic with respect to other callers.
///
/// # Example
///
/// ```rust
/// use tictac_schema::{CollectionOptions, Document, IndexModel, IndexOptions, KeySpec};
/// use tictac_store::{InMemoryStore, StoreClient, StoreError};
///
/// let store = InMemoryStore::new();
/// store.create_collection("players", &CollectionOptions::default()).unwrap();
/// let unique = IndexModel::new(KeySpec::new().asc("username"), IndexOptions::new().unique());
/// store.create_index("players", &unique).unwrap();
///
/// store.insert("players", Document::new().with("username", "alice")).unwrap();
/// let again = store.insert("players", Document::new().with("username", "alice"));
/// assert!(matches!(again, Err(StoreError::DuplicateKey { .. })));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing contents.
    #[must_use]
    pub fn with_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
        }
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
    /// Returns [`StoreError::ValidationFailed`] or
    /// [`StoreError::DuplicateKey`] if the write is refused.
    pub fn insert(&self, collection: &str, doc: Document) -> StoreResult<Value> {
        self.state.write().insert(collection, doc)
    }

    /// Replaces the document with the given `_id`.
    ///
    /// # Errors
    ///
    /// Same as [`InMemoryStore::insert`], plus [`StoreError::Rejected`] if
    /// no document has that id.
    pub fn replace(&self, collection: &str, id: &Value, doc: Document) -> StoreResult<()> {
        self.state.write().replace(collection, id, doc)
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
}

impl StoreClient for InMemoryStore {
    fn list_collection_names(&self) -> StoreResult<BTreeSet<String>> {
        Ok(self.state.read().collection_names())
    }

    fn create_collection(&self, name: &str, options: &CollectionOptions) -> StoreResult<()> {
        self.state.write().create_collection(name, options)
    }

    fn alter_collection(&self, name: &str, options: &CollectionOptions) -> StoreResult<()> {
        self.state.write().alter_collection(name, options)
    }

    fn collection_options(&self, name: &str) -> StoreResult<Option<CollectionOptions>> {
        Ok(self.state.read().collection_options(name))
    }

    fn list_indexes(&self, collection: &str) -> StoreResult<Vec<IndexModel>> {
        self.state.read().list_indexes(collection)
    }

    fn create_index(&self, collection: &str, model: &IndexModel) -> StoreResult<()> {
        self.state.write().create_index(collection, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tictac_schema::{
        BsonType, Filter, ObjectRule, Rule, ValidationLevel, Validator,
    };

    fn strict_players() -> CollectionOptions {
        CollectionOptions::new(Validator::new(
            ObjectRule::new()
                .required(["username"])
                .field("username", Rule::of(BsonType::String)),
        ))
    }

    fn store_with(name: &str, options: CollectionOptions) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.create_collection(name, &options).unwrap();
        store
    }

    #[test]
    fn non_finite_numbers_are_rejected_even_under_warn() {
        let options = strict_players().action(ValidationAction::Warn);
        let store = store_with("players", options);
        let id = store
            .insert("players", Document::new().with("username", "bob"))
            .unwrap();

        let result = store.insert("players", Document::new().with("rating", f64::NAN));
        assert!(matches!(result, Err(StoreError::Rejected(_))));
        let result = store.replace(
            "players",
            &id,
            Document::new().with("username", "bob").with("rating", f64::NEG_INFINITY),
        );
        assert!(matches!(result, Err(StoreError::Rejected(_))));
        assert_eq!(store.count("players").unwrap(), 1);
    }

    #[test]
    fn create_collection_installs_id_index() {
        let store = store_with("players", CollectionOptions::default());
        let names = store.list_index_names("players").unwrap();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec![ID_INDEX_NAME]);
    }

    #[test]
    fn create_existing_collection_fails() {
        let store = store_with("players", CollectionOptions::default());
        let result = store.create_collection("players", &CollectionOptions::default());
        assert!(matches!(result, Err(StoreError::NamespaceExists(_))));
    }

    #[test]
    fn alter_missing_collection_fails() {
        let store = InMemoryStore::new();
        let result = store.alter_collection("games", &CollectionOptions::default());
        assert!(matches!(result, Err(StoreError::NamespaceNotFound(_))));
    }

    #[test]
    fn alter_replaces_options() {
        let store = store_with("players", CollectionOptions::default());
        let options = strict_players().level(ValidationLevel::Moderate);
        store.alter_collection("players", &options).unwrap();
        assert_eq!(store.collection_options("players").unwrap(), Some(options));
    }

    #[test]
    fn create_collection_rejects_bad_validator() {
        let store = InMemoryStore::new();
        let options = CollectionOptions::new(Validator::new(
            ObjectRule::new().field("username", Rule::pattern("(")),
        ));
        let result = store.create_collection("players", &options);
        assert!(matches!(result, Err(StoreError::Rejected(_))));
        assert!(store.list_collection_names().unwrap().is_empty());
    }

    #[test]
    fn insert_assigns_id() {
        let store = store_with("players", CollectionOptions::default());
        let id = store
            .insert("players", Document::new().with("username", "alice"))
            .unwrap();
        assert!(id.as_id().is_some());
        let docs = store.find_all("players").unwrap();
        assert_eq!(docs[0].keys().next(), Some("_id"));
        assert_eq!(docs[0].get("_id"), Some(&id));
    }

    #[test]
    fn strict_error_rejects_invalid_insert() {
        let store = store_with("players", strict_players());
        let result = store.insert("players", Document::new().with("email", "a@b.co"));
        assert!(matches!(result, Err(StoreError::ValidationFailed { .. })));
        assert_eq!(store.count("players").unwrap(), 0);
    }

    #[test]
    fn warn_action_accepts_invalid_insert() {
        let store = store_with(
            "players",
            strict_players().action(ValidationAction::Warn),
        );
        store
            .insert("players", Document::new().with("email", "a@b.co"))
            .unwrap();
        assert_eq!(store.count("players").unwrap(), 1);
    }

    #[test]
    fn moderate_tolerates_updates_to_invalid_documents() {
        let store = store_with("players", CollectionOptions::default());
        let id = store
            .insert("players", Document::new().with("nickname", "legacy"))
            .unwrap();
        store
            .alter_collection("players", &strict_players().level(ValidationLevel::Moderate))
            .unwrap();

        // Existing document was already invalid, so its update is not checked.
        store
            .replace("players", &id, Document::new().with("nickname", "still legacy"))
            .unwrap();

        // New inserts are checked.
        let result = store.insert("players", Document::new().with("nickname", "new"));
        assert!(matches!(result, Err(StoreError::ValidationFailed { .. })));
    }

    #[test]
    fn moderate_checks_updates_to_valid_documents() {
        let store = store_with("players", strict_players().level(ValidationLevel::Moderate));
        let id = store
            .insert("players", Document::new().with("username", "alice"))
            .unwrap();
        let result = store.replace("players", &id, Document::new().with("nickname", "al"));
        assert!(matches!(result, Err(StoreError::ValidationFailed { .. })));
    }

    #[test]
    fn replace_keeps_id() {
        let store = store_with("players", CollectionOptions::default());
        let id = store
            .insert("players", Document::new().with("username", "alice"))
            .unwrap();
        store
            .replace("players", &id, Document::new().with("username", "alicia"))
            .unwrap();
        let docs = store.find_all("players").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get("_id"), Some(&id));
        assert_eq!(docs[0].get("username").and_then(Value::as_str), Some("alicia"));

        let moved = Document::new().with("_id", Uuid::new_v4());
        assert!(matches!(
            store.replace("players", &id, moved),
            Err(StoreError::Rejected(_))
        ));
    }

    #[test]
    fn unique_index_rejects_duplicates() {
        let store = store_with("players", CollectionOptions::default());
        store
            .create_index(
                "players",
                &IndexModel::new(KeySpec::new().asc("username"), IndexOptions::new().unique()),
            )
            .unwrap();
        store
            .insert("players", Document::new().with("username", "alice"))
            .unwrap();
        let result = store.insert("players", Document::new().with("username", "alice"));
        assert!(matches!(
            result,
            Err(StoreError::DuplicateKey { ref index, .. }) if index == "username_1"
        ));
    }

    #[test]
    fn unique_without_sparse_treats_missing_as_null() {
        let store = store_with("players", CollectionOptions::default());
        store
            .create_index(
                "players",
                &IndexModel::new(KeySpec::new().asc("email"), IndexOptions::new().unique()),
            )
            .unwrap();
        store.insert("players", Document::new().with("username", "a")).unwrap();
        let result = store.insert("players", Document::new().with("username", "b"));
        assert!(matches!(result, Err(StoreError::DuplicateKey { .. })));
    }

    #[test]
    fn sparse_unique_skips_missing_fields() {
        let store = store_with("players", CollectionOptions::default());
        store
            .create_index(
                "players",
                &IndexModel::new(
                    KeySpec::new().asc("email"),
                    IndexOptions::new().unique().sparse(),
                ),
            )
            .unwrap();
        store.insert("players", Document::new().with("username", "a")).unwrap();
        store.insert("players", Document::new().with("username", "b")).unwrap();
        store
            .insert("players", Document::new().with("email", "x@y.io"))
            .unwrap();
        let result = store.insert("players", Document::new().with("email", "x@y.io"));
        assert!(matches!(result, Err(StoreError::DuplicateKey { .. })));
    }

    #[test]
    fn partial_unique_only_covers_matching_documents() {
        let store = store_with("games", CollectionOptions::default());
        let model = IndexModel::new(
            KeySpec::new().asc("playerX"),
            IndexOptions::new()
                .unique()
                .partial_filter(Filter::Exists {
                    field: "ended_at".into(),
                    exists: false,
                }),
        );
        store.create_index("games", &model).unwrap();

        let finished = Document::new()
            .with("playerX", "alice")
            .with("ended_at", Value::Timestamp(1));
        store.insert("games", finished.clone()).unwrap();
        store.insert("games", finished).unwrap();

        store.insert("games", Document::new().with("playerX", "alice")).unwrap();
        let result = store.insert("games", Document::new().with("playerX", "alice"));
        assert!(matches!(result, Err(StoreError::DuplicateKey { .. })));
    }

    #[test]
    fn create_index_is_idempotent_for_same_definition() {
        let store = store_with("scores", CollectionOptions::default());
        let model = IndexModel::new(KeySpec::new().asc("user"), IndexOptions::new().unique());
        store.create_index("scores", &model).unwrap();
        store.create_index("scores", &model).unwrap();
        assert_eq!(store.list_indexes("scores").unwrap().len(), 2);
    }

    #[test]
    fn create_index_conflicts_on_same_name() {
        let store = store_with("scores", CollectionOptions::default());
        let named = IndexOptions::new().name("ux_scores_user");
        store
            .create_index("scores", &IndexModel::new(KeySpec::new().asc("user"), named.clone()))
            .unwrap();
        let result = store.create_index(
            "scores",
            &IndexModel::new(KeySpec::new().asc("user"), named.unique()),
        );
        assert!(matches!(result, Err(StoreError::IndexConflict { .. })));
    }

    #[test]
    fn create_index_conflicts_on_same_keys_other_name() {
        let store = store_with("scores", CollectionOptions::default());
        store
            .create_index("scores", &IndexModel::on(KeySpec::new().asc("user")))
            .unwrap();
        let result = store.create_index(
            "scores",
            &IndexModel::new(KeySpec::new().asc("user"), IndexOptions::new().name("by_user")),
        );
        assert!(matches!(result, Err(StoreError::IndexConflict { .. })));
    }

    #[test]
    fn unique_index_build_fails_over_duplicates() {
        let store = store_with("scores", CollectionOptions::default());
        store.insert("scores", Document::new().with("user", "bob")).unwrap();
        store.insert("scores", Document::new().with("user", "bob")).unwrap();
        let result = store.create_index(
            "scores",
            &IndexModel::new(KeySpec::new().asc("user"), IndexOptions::new().unique()),
        );
        assert!(matches!(result, Err(StoreError::DuplicateKey { .. })));
        assert_eq!(store.list_indexes("scores").unwrap().len(), 1);
    }

    #[test]
    fn create_index_on_missing_collection_fails() {
        let store = InMemoryStore::new();
        let result = store.create_index("games", &IndexModel::on(KeySpec::new().desc("ended_at")));
        assert!(matches!(result, Err(StoreError::NamespaceNotFound(_))));
    }

    #[test]
    fn listed_indexes_carry_names() {
        let store = store_with("games", CollectionOptions::default());
        store
            .create_index(
                "games",
                &IndexModel::on(KeySpec::new().asc("winner").desc("ended_at")),
            )
            .unwrap();
        let names = store.list_index_names("games").unwrap();
        assert!(names.contains("winner_1_ended_at_-1"));
        for index in store.list_indexes("games").unwrap() {
            assert!(index.options.name.is_some());
        }
    }

    #[test]
    fn with_state_round_trips_snapshot() {
        let store = store_with("players", strict_players());
        store
            .insert("players", Document::new().with("username", "alice"))
            .unwrap();
        let copy = InMemoryStore::with_state(store.snapshot());
        assert_eq!(copy.snapshot(), store.snapshot());
    }
}
