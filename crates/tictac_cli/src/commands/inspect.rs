//! Inspect command implementation.

use serde::Serialize;
use std::path::Path;
use tictac_store::{FileStore, StoreClient, StoreResult};

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Per-collection details, ordered by name.
    pub collections: Vec<CollectionInfo>,
}

/// Details of one collection.
#[derive(Debug, Serialize)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: String,
    /// Validation level.
    pub level: String,
    /// Validation action.
    pub action: String,
    /// Number of top-level properties the validator declares.
    pub validated_fields: usize,
    /// Number of stored documents.
    pub documents: usize,
    /// Indexes with their key specs and flags.
    pub indexes: Vec<IndexInfo>,
}

/// Details of one index.
#[derive(Debug, Serialize)]
pub struct IndexInfo {
    /// Index name.
    pub name: String,
    /// Key spec, e.g. `{winner: 1, ended_at: -1}`.
    pub keys: String,
    /// Whether the index is unique.
    pub unique: bool,
    /// Whether the index is sparse.
    pub sparse: bool,
    /// Whether the index has a partial filter.
    pub partial: bool,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {:?}", path).into());
    }
    let store = FileStore::open(path, false)?;
    let result = inspect(&store)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Collects collection details from an open store.
pub fn inspect(store: &FileStore) -> StoreResult<InspectResult> {
    let mut collections = Vec::new();
    for name in store.list_collection_names()? {
        let Some(options) = store.collection_options(&name)? else {
            continue;
        };
        let indexes = store
            .list_indexes(&name)?
            .into_iter()
            .map(|index| IndexInfo {
                name: index.resolved_name(),
                keys: index.keys.to_string(),
                unique: index.options.unique,
                sparse: index.options.sparse,
                partial: index.options.partial_filter.is_some(),
            })
            .collect();
        collections.push(CollectionInfo {
            documents: store.count(&name)?,
            level: options.level.to_string(),
            action: options.action.to_string(),
            validated_fields: options.validator.root.properties.len(),
            name,
            indexes,
        });
    }

    Ok(InspectResult {
        path: store.path().display().to_string(),
        collections,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("Tictac Store Inspection");
    println!("=======================");
    println!();
    println!("Path: {}", result.path);

    if result.collections.is_empty() {
        println!();
        println!("No collections (run `tictac reconcile` first)");
        return;
    }

    for col in &result.collections {
        println!();
        println!("{}:", col.name);
        println!(
            "  Validator: {} fields, level {}, action {}",
            col.validated_fields, col.level, col.action
        );
        println!("  Documents: {}", col.documents);
        println!("  Indexes:");
        for index in &col.indexes {
            let mut flags = Vec::new();
            if index.unique {
                flags.push("unique");
            }
            if index.sparse {
                flags.push("sparse");
            }
            if index.partial {
                flags.push("partial");
            }
            println!("    {:<28} {} {}", index.name, index.keys, flags.join(" "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tictac_reconcile::reconcile;
    use tictac_schema::declarations::{game_store, PLAYERS};
    use tictac_testkit::{sample_players, TestFileStore};

    #[test]
    fn inspect_lists_declared_structure() {
        let store = TestFileStore::new();
        reconcile(&game_store(), &*store).unwrap();
        for player in sample_players() {
            store.insert(PLAYERS, player.to_document()).unwrap();
        }

        let result = inspect(&store).unwrap();
        let names: Vec<_> = result.collections.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["games", "players", "scores"]);

        let players = &result.collections[1];
        assert_eq!(players.documents, 3);
        assert_eq!(players.level, "moderate");
        assert_eq!(players.action, "warn");
        let email = players
            .indexes
            .iter()
            .find(|i| i.name == "ux_players_email")
            .unwrap();
        assert!(email.unique && email.sparse && !email.partial);
        assert_eq!(email.keys, "{email: 1}");
    }

    #[test]
    fn inspect_empty_store() {
        let store = TestFileStore::new();
        assert!(inspect(&store).unwrap().collections.is_empty());
    }
}
