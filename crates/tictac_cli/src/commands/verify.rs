//! Verify command implementation.

use std::path::Path;
use tictac_schema::declarations::game_store;
use tictac_store::{FileStore, StoreClient, StoreResult};

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of documents checked.
    pub documents_checked: usize,
    /// Number of documents failing their collection's validator.
    pub invalid_documents: usize,
    /// List of problems found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.invalid_documents == 0 && self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying store at {:?}", path);
    println!();

    let store = FileStore::open(path, false)?;
    let result = verify(&store)?;

    println!("  Documents checked: {}", result.documents_checked);
    println!("  Invalid documents: {}", result.invalid_documents);
    for error in &result.errors {
        println!("  - {error}");
    }

    println!();
    if result.is_ok() {
        println!("✓ Store verification passed");
        Ok(())
    } else {
        println!("✗ Store verification failed");
        Err("Verification failed".into())
    }
}

/// Checks that every declared collection exists and re-checks each stored
/// document against the validator currently attached to its collection.
///
/// Read-only: nothing is written to the store.
pub fn verify(store: &FileStore) -> StoreResult<VerifyResult> {
    let mut result = VerifyResult::default();
    let existing = store.list_collection_names()?;

    for declared in &game_store().collections {
        if !existing.contains(&declared.name) {
            result
                .errors
                .push(format!("collection {} is missing", declared.name));
        }
    }

    for name in &existing {
        let Some(options) = store.collection_options(name)? else {
            continue;
        };
        for doc in store.find_all(name)? {
            result.documents_checked += 1;
            let violations = options.validator.check(&doc);
            if violations.is_empty() {
                continue;
            }
            result.invalid_documents += 1;
            let id = doc
                .get("_id")
                .and_then(|v| v.as_id())
                .map_or_else(|| "<no _id>".to_string(), |id| id.to_string());
            for violation in violations {
                result.errors.push(format!("{name} {id}: {violation}"));
            }
        }
    }

    Ok(result)
}
