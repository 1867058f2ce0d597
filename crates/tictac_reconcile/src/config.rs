//! Reconciliation configuration.

/// When an existing collection's validator is rewritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidatorWrites {
    /// Always issue the alteration, even when nothing changed.
    #[default]
    Always,
    /// Read the live options first and skip the write when they already
    /// equal the declaration.
    WhenChanged,
}

/// How an existing index is matched against its declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexCheck {
    /// An index with the resolved name counts as present.
    #[default]
    ByName,
    /// A same-named index must also have the declared keys and options.
    /// A mismatch is reported as a failure; the index is left in place.
    FullSpec,
}

/// Configuration for a reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// When existing validators are rewritten.
    pub validator_writes: ValidatorWrites,

    /// How existing indexes are matched.
    pub index_check: IndexCheck,

    /// Whether a collection that appears between listing and creation is
    /// altered instead of reported as failed.
    pub adopt_existing_on_create_race: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            validator_writes: ValidatorWrites::Always,
            index_check: IndexCheck::ByName,
            adopt_existing_on_create_race: true,
        }
    }
}

impl ReconcileConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets when existing validators are rewritten.
    #[must_use]
    pub const fn validator_writes(mut self, value: ValidatorWrites) -> Self {
        self.validator_writes = value;
        self
    }

    /// Sets how existing indexes are matched.
    #[must_use]
    pub const fn index_check(mut self, value: IndexCheck) -> Self {
        self.index_check = value;
        self
    }

    /// Sets whether a concurrently created collection is adopted.
    #[must_use]
    pub const fn adopt_existing_on_create_race(mut self, value: bool) -> Self {
        self.adopt_existing_on_create_race = value;
        self
    }
}
