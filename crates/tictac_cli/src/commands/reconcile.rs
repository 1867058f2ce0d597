//! Reconcile command implementation.

use std::path::Path;
use tictac_reconcile::{
    IndexCheck, OutcomeKind, ReconcileConfig, ReconcileReport, Reconciler, ValidatorWrites,
};
use tictac_schema::declarations::game_store;
use tictac_store::FileStore;
use tracing::info;

/// Runs the reconcile command.
///
/// Fails when any item failed to converge, after printing the full report.
pub fn run(
    path: &Path,
    diff_validators: bool,
    full_index_check: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Reconciling store at {:?}", path);
    let report = reconcile_at(path, config(diff_validators, full_index_check))?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => println!("{report}"),
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(format!(
            "{} item(s) failed to converge",
            report.count(OutcomeKind::Failed)
        )
        .into())
    }
}

/// Builds the engine configuration from the command's flags.
pub fn config(diff_validators: bool, full_index_check: bool) -> ReconcileConfig {
    let validator_writes = if diff_validators {
        ValidatorWrites::WhenChanged
    } else {
        ValidatorWrites::Always
    };
    let index_check = if full_index_check {
        IndexCheck::FullSpec
    } else {
        IndexCheck::ByName
    };
    ReconcileConfig::new()
        .validator_writes(validator_writes)
        .index_check(index_check)
}

/// Opens (creating if needed) the store at `path` and reconciles it with
/// the game-store declarations.
pub fn reconcile_at(
    path: &Path,
    config: ReconcileConfig,
) -> Result<ReconcileReport, Box<dyn std::error::Error>> {
    let store = FileStore::open(path, true)?;
    Ok(Reconciler::new(config, &store).reconcile(&game_store())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn flags_map_to_config() {
        let plain = config(false, false);
        assert_eq!(plain.validator_writes, ValidatorWrites::Always);
        assert_eq!(plain.index_check, IndexCheck::ByName);

        let strict = config(true, true);
        assert_eq!(strict.validator_writes, ValidatorWrites::WhenChanged);
        assert_eq!(strict.index_check, IndexCheck::FullSpec);
    }

    #[test]
    fn reconcile_creates_then_settles() {
        let dir = tempdir().unwrap();
        let first = reconcile_at(dir.path(), config(true, true)).unwrap();
        assert_eq!(first.count(OutcomeKind::Created), first.items.len());

        let second = reconcile_at(dir.path(), config(true, true)).unwrap();
        assert_eq!(second.count(OutcomeKind::Unchanged), second.items.len());
    }

    #[test]
    fn run_succeeds_on_fresh_directory() {
        let dir = tempdir().unwrap();
        run(&dir.path().join("store"), false, false, "json").unwrap();
        assert!(dir.path().join("store").join("CATALOG.json").exists());
    }
}
