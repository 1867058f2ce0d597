//! Per-item results of a reconciliation pass.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A declared item the pass converges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// A collection and its validator.
    Collection {
        /// Collection name.
        name: String,
    },
    /// An index, identified by its resolved name.
    Index {
        /// Collection name.
        collection: String,
        /// Resolved index name.
        name: String,
    },
}

impl Target {
    /// Creates a collection target.
    pub fn collection(name: impl Into<String>) -> Self {
        Self::Collection { name: name.into() }
    }

    /// Creates an index target.
    pub fn index(collection: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Index {
            collection: collection.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Collection { name } => write!(f, "collection {name}"),
            Target::Index { collection, name } => write!(f, "index {collection}.{name}"),
        }
    }
}

/// What a pass did to one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    /// The item was missing and has been created.
    Created,
    /// The collection's validator, level and action were rewritten.
    Updated,
    /// The item already matched; nothing was written.
    Unchanged,
    /// The item could not be converged.
    Failed(String),
}

impl Outcome {
    /// Returns the outcome's kind.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Created => OutcomeKind::Created,
            Outcome::Updated => OutcomeKind::Updated,
            Outcome::Unchanged => OutcomeKind::Unchanged,
            Outcome::Failed(_) => OutcomeKind::Failed,
        }
    }

    /// Returns true if the item failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Failed(reason) => write!(f, "failed: {reason}"),
            other => f.write_str(other.kind().as_str()),
        }
    }
}

/// An [`Outcome`] without its failure reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// See [`Outcome::Created`].
    Created,
    /// See [`Outcome::Updated`].
    Updated,
    /// See [`Outcome::Unchanged`].
    Unchanged,
    /// See [`Outcome::Failed`].
    Failed,
}

impl OutcomeKind {
    /// Returns the lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Created => "created",
            OutcomeKind::Updated => "updated",
            OutcomeKind::Unchanged => "unchanged",
            OutcomeKind::Failed => "failed",
        }
    }
}

/// One line of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileItem {
    /// The declared item.
    pub target: Target,
    /// What happened to it.
    pub outcome: Outcome,
}

/// Result of a reconciliation pass: one entry per declared collection and
/// per declared index, in the order they were reconciled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Version of the declaration set that was applied.
    pub schema_version: u32,
    /// Per-item outcomes.
    pub items: Vec<ReconcileItem>,
}

impl ReconcileReport {
    /// Creates an empty report.
    pub fn new(schema_version: u32) -> Self {
        Self {
            schema_version,
            items: Vec::new(),
        }
    }

    /// Appends an item.
    pub fn push(&mut self, target: Target, outcome: Outcome) {
        self.items.push(ReconcileItem { target, outcome });
    }

    /// Returns true if no item failed.
    pub fn is_success(&self) -> bool {
        !self.items.iter().any(|i| i.outcome.is_failed())
    }

    /// Iterates over failed items.
    pub fn failures(&self) -> impl Iterator<Item = &ReconcileItem> {
        self.items.iter().filter(|i| i.outcome.is_failed())
    }

    /// Returns the number of items with the given outcome kind.
    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.items
            .iter()
            .filter(|i| i.outcome.kind() == kind)
            .count()
    }

    /// Returns the outcome recorded for a target.
    pub fn outcome(&self, target: &Target) -> Option<&Outcome> {
        self.items
            .iter()
            .find(|i| &i.target == target)
            .map(|i| &i.outcome)
    }

    /// Returns a one-line summary of the counts.
    pub fn summary(&self) -> String {
        format!(
            "schema v{}: {} created, {} updated, {} unchanged, {} failed",
            self.schema_version,
            self.count(OutcomeKind::Created),
            self.count(OutcomeKind::Updated),
            self.count(OutcomeKind::Unchanged),
            self.count(OutcomeKind::Failed),
        )
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{:<48} {}", item.target.to_string(), item.outcome)?;
        }
        write!(f, "{}", self.summary())
    }
}
