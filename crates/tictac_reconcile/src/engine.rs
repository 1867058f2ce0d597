//! The reconciliation pass.

use crate::config::{IndexCheck, ReconcileConfig, ValidatorWrites};
use crate::error::{ReconcileError, ReconcileResult};
use crate::report::{Outcome, ReconcileReport, Target};
use std::collections::BTreeSet;
use tictac_schema::{CollectionDeclaration, IndexModel, SchemaDeclaration};
use tictac_store::{StoreClient, StoreError};
use tracing::{debug, info, warn};

/// Converges a store towards a declaration set.
///
/// The reconciler holds the store it was given and nothing else: every pass
/// starts from live state.
///
/// # Algorithm
///
/// For each declared collection, in order:
/// 1. If the collection is missing, create it with its validator, level and
///    action.
/// 2. Otherwise rewrite its validator, level and action in place (or, with
///    [`ValidatorWrites::WhenChanged`], only when they differ).
///
/// Then for each declared index of that collection:
/// 1. Resolve its name (explicit, or derived from the keys).
/// 2. If an index of that name exists, leave it alone.
/// 3. Otherwise create it under the resolved name.
///
/// Declaration errors fail their item without reaching the store. Store
/// rejections fail their item and the pass continues. A fatal store error
/// ends the pass.
pub struct Reconciler<S: StoreClient> {
    config: ReconcileConfig,
    store: S,
}

impl<S: StoreClient> Reconciler<S> {
    /// Creates a reconciler over a store.
    pub fn new(config: ReconcileConfig, store: S) -> Self {
        Self { config, store }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Returns the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one pass and reports every declared item's outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Connectivity`] if the store becomes
    /// unusable. No report is returned in that case.
    pub fn reconcile(&self, declaration: &SchemaDeclaration) -> ReconcileResult<ReconcileReport> {
        info!(
            version = declaration.version,
            collections = declaration.collections.len(),
            indexes = declaration.index_count(),
            "starting reconciliation"
        );
        let mut report = ReconcileReport::new(declaration.version);
        let mut seen = BTreeSet::new();

        for collection in &declaration.collections {
            let target = Target::collection(&collection.name);
            let outcome = if !seen.insert(collection.name.as_str()) {
                Outcome::Failed(format!(
                    "collection {} is declared more than once",
                    collection.name
                ))
            } else if let Err(e) = verify_collection(collection) {
                Outcome::Failed(e)
            } else {
                settle(&target, self.converge_collection(collection))?
            };
            record(&mut report, target, outcome);

            self.reconcile_indexes(collection, &mut report)?;
        }

        info!(summary = %report.summary(), "reconciliation finished");
        Ok(report)
    }

    fn reconcile_indexes(
        &self,
        collection: &CollectionDeclaration,
        report: &mut ReconcileReport,
    ) -> ReconcileResult<()> {
        let mut seen = BTreeSet::new();
        for model in &collection.indexes {
            let name = model.resolved_name();
            let target = Target::index(&collection.name, &name);
            let outcome = if let Err(e) = model.verify() {
                Outcome::Failed(e.to_string())
            } else if !seen.insert(name.clone()) {
                Outcome::Failed(format!("index {name} is declared more than once"))
            } else {
                settle(&target, self.converge_index(&collection.name, model))?
            };
            record(report, target, outcome);
        }
        Ok(())
    }

    fn converge_collection(
        &self,
        collection: &CollectionDeclaration,
    ) -> Result<Outcome, StoreError> {
        let name = collection.name.as_str();
        let existing = self.store.list_collection_names()?;

        if !existing.contains(name) {
            match self.store.create_collection(name, &collection.options) {
                Ok(()) => return Ok(Outcome::Created),
                Err(StoreError::NamespaceExists(_))
                    if self.config.adopt_existing_on_create_race =>
                {
                    debug!(
                        collection = name,
                        "collection appeared during the pass, altering it instead"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        if self.config.validator_writes == ValidatorWrites::WhenChanged
            && self.store.collection_options(name)?.as_ref() == Some(&collection.options)
        {
            return Ok(Outcome::Unchanged);
        }

        self.store.alter_collection(name, &collection.options)?;
        Ok(Outcome::Updated)
    }

    fn converge_index(&self, collection: &str, model: &IndexModel) -> Result<Outcome, StoreError> {
        let name = model.resolved_name();

        match self.config.index_check {
            IndexCheck::ByName => {
                if self.store.list_index_names(collection)?.contains(&name) {
                    return Ok(Outcome::Unchanged);
                }
            }
            IndexCheck::FullSpec => {
                let live = self.store.list_indexes(collection)?;
                if let Some(live) = live.iter().find(|i| i.resolved_name() == name) {
                    if live.same_definition(model) {
                        return Ok(Outcome::Unchanged);
                    }
                    return Ok(Outcome::Failed(format!(
                        "index {name} diverges from declaration: live {}, declared {}",
                        describe(live),
                        describe(model)
                    )));
                }
            }
        }

        self.store.create_index(collection, &model.named())?;
        Ok(Outcome::Created)
    }
}

/// Runs one pass with the default configuration.
///
/// # Errors
///
/// See [`Reconciler::reconcile`].
pub fn reconcile<S: StoreClient>(
    declaration: &SchemaDeclaration,
    store: S,
) -> ReconcileResult<ReconcileReport> {
    Reconciler::new(ReconcileConfig::default(), store).reconcile(declaration)
}

/// Checks the parts of a collection declaration the collection item owns.
/// Index declarations are checked per index.
fn verify_collection(collection: &CollectionDeclaration) -> Result<(), String> {
    if collection.name.is_empty() {
        return Err("collection name is empty".to_string());
    }
    collection
        .options
        .validator
        .verify()
        .map_err(|e| e.to_string())
}

/// Splits a store result into a per-item outcome or a pass-ending error.
fn settle(target: &Target, result: Result<Outcome, StoreError>) -> ReconcileResult<Outcome> {
    match result {
        Ok(outcome) => Ok(outcome),
        Err(source) if source.is_fatal() => {
            warn!(%target, error = %source, "store unusable, aborting reconciliation");
            Err(ReconcileError::Connectivity {
                target: target.clone(),
                source,
            })
        }
        Err(e) => Ok(Outcome::Failed(e.to_string())),
    }
}

fn record(report: &mut ReconcileReport, target: Target, outcome: Outcome) {
    match &outcome {
        Outcome::Created | Outcome::Updated => info!(%target, %outcome, "converged"),
        Outcome::Unchanged => debug!(%target, "already converged"),
        Outcome::Failed(reason) => warn!(%target, %reason, "failed to converge"),
    }
    report.push(target, outcome);
}

fn describe(model: &IndexModel) -> String {
    let options = &model.options;
    let mut text = model.keys.to_string();
    if options.unique {
        text.push_str(" unique");
    }
    if options.sparse {
        text.push_str(" sparse");
    }
    if options.partial_filter.is_some() {
        text.push_str(" partial");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::OutcomeKind;
    use tictac_schema::{
        CollectionOptions, IndexOptions, KeySpec, ObjectRule, Rule, Validator,
    };
    use tictac_store::InMemoryStore;

    fn one_collection(indexes: Vec<IndexModel>) -> SchemaDeclaration {
        let mut collection = CollectionDeclaration::new("games", CollectionOptions::default());
        collection.indexes = indexes;
        SchemaDeclaration::new(7).collection(collection)
    }

    #[test]
    fn creates_then_updates() {
        let store = InMemoryStore::new();
        let reconciler = Reconciler::new(ReconcileConfig::default(), &store);
        let decl = one_collection(vec![IndexModel::on(KeySpec::new().desc("ended_at"))]);

        let first = reconciler.reconcile(&decl).unwrap();
        assert_eq!(first.schema_version, 7);
        assert_eq!(first.count(OutcomeKind::Created), 2);

        let second = reconciler.reconcile(&decl).unwrap();
        assert_eq!(
            second.outcome(&Target::collection("games")),
            Some(&Outcome::Updated)
        );
        assert_eq!(
            second.outcome(&Target::index("games", "ended_at_-1")),
            Some(&Outcome::Unchanged)
        );
    }

    #[test]
    fn declaration_error_fails_only_its_item() {
        let store = InMemoryStore::new();
        let decl = one_collection(vec![
            IndexModel::on(KeySpec::new()),
            IndexModel::new(
                KeySpec::new().asc("winner"),
                IndexOptions::new()
                    .sparse()
                    .partial_filter(tictac_schema::Filter::Exists {
                        field: "winner".into(),
                        exists: true,
                    }),
            ),
            IndexModel::on(KeySpec::new().asc("playerX")),
        ]);

        let report = reconcile(&decl, &store).unwrap();
        assert_eq!(report.count(OutcomeKind::Failed), 2);
        assert_eq!(
            report.outcome(&Target::index("games", "playerX_1")),
            Some(&Outcome::Created)
        );
        // Only _id_ and playerX_1 reached the store.
        assert_eq!(store.list_indexes("games").unwrap().len(), 2);
    }

    #[test]
    fn invalid_validator_never_reaches_store() {
        let store = InMemoryStore::new();
        let options = CollectionOptions::new(Validator::new(
            ObjectRule::new().field("cell", Rule::between(8.0, 0.0)),
        ));
        let decl =
            SchemaDeclaration::new(1).collection(CollectionDeclaration::new("games", options));

        let report = reconcile(&decl, &store).unwrap();
        assert!(report.outcome(&Target::collection("games")).unwrap().is_failed());
        assert!(store.list_collection_names().unwrap().is_empty());
    }

    #[test]
    fn non_finite_bound_never_reaches_store() {
        let store = InMemoryStore::new();
        let options = CollectionOptions::new(Validator::new(
            ObjectRule::new().field("wins", Rule::minimum(f64::NAN)),
        ));
        let decl =
            SchemaDeclaration::new(1).collection(CollectionDeclaration::new("scores", options));

        let report = reconcile(&decl, &store).unwrap();
        assert!(report.outcome(&Target::collection("scores")).unwrap().is_failed());
        assert!(store.list_collection_names().unwrap().is_empty());
    }

    #[test]
    fn duplicate_declarations_fail_second_occurrence() {
        let store = InMemoryStore::new();
        let model = IndexModel::on(KeySpec::new().asc("user"));
        let mut scores = CollectionDeclaration::new("scores", CollectionOptions::default());
        scores.indexes = vec![model.clone(), model];
        let decl = SchemaDeclaration::new(1)
            .collection(scores.clone())
            .collection(CollectionDeclaration::new("scores", CollectionOptions::default()));

        let report = reconcile(&decl, &store).unwrap();
        let kinds: Vec<_> = report.items.iter().map(|i| i.outcome.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                OutcomeKind::Created,
                OutcomeKind::Created,
                OutcomeKind::Failed,
                OutcomeKind::Failed,
            ]
        );
    }

    #[test]
    fn describe_lists_options() {
        let model = IndexModel::new(
            KeySpec::new().asc("email"),
            IndexOptions::new().unique().sparse(),
        );
        assert_eq!(describe(&model), "{email: 1} unique sparse");
    }
}
