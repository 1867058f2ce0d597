//! Index key specifications, options, and name derivation.
//!
//! An index's identity is its name. When no explicit name is given, the
//! name is derived from the key spec by [`derive_index_name`], which is the
//! only mechanism for recognizing an existing index across runs. The
//! derivation must therefore stay pure and stable.

use crate::error::{SchemaError, SchemaResult};
use crate::value::{Document, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Sort direction or special type of one index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexDirection {
    /// Ascending order (`1`).
    Ascending,
    /// Descending order (`-1`).
    Descending,
    /// Full-text index (`text`).
    Text,
    /// Hashed index (`hashed`).
    Hashed,
}

impl IndexDirection {
    /// Returns the token used in derived index names.
    pub fn token(&self) -> &'static str {
        match self {
            IndexDirection::Ascending => "1",
            IndexDirection::Descending => "-1",
            IndexDirection::Text => "text",
            IndexDirection::Hashed => "hashed",
        }
    }
}

impl fmt::Display for IndexDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// An ordered list of `(field, direction)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeySpec {
    keys: Vec<(String, IndexDirection)>,
}

impl KeySpec {
    /// Creates an empty key spec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an ascending key.
    #[must_use]
    pub fn asc(self, field: impl Into<String>) -> Self {
        self.key(field, IndexDirection::Ascending)
    }

    /// Appends a descending key.
    #[must_use]
    pub fn desc(self, field: impl Into<String>) -> Self {
        self.key(field, IndexDirection::Descending)
    }

    /// Appends a key with an explicit direction.
    #[must_use]
    pub fn key(mut self, field: impl Into<String>, direction: IndexDirection) -> Self {
        self.keys.push((field.into(), direction));
        self
    }

    /// Iterates over keys in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, IndexDirection)> {
        self.keys.iter().map(|(f, d)| (f.as_str(), *d))
    }

    /// Returns the field names in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|(f, _)| f.as_str())
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns true if any key uses the given direction.
    pub fn has_direction(&self, direction: IndexDirection) -> bool {
        self.keys.iter().any(|(_, d)| *d == direction)
    }

    /// Checks that the key spec is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidKeySpec`] if the spec is empty, names a
    /// field twice, has an empty field name, or has more than one text key.
    pub fn verify(&self) -> SchemaResult<()> {
        if self.keys.is_empty() {
            return Err(SchemaError::invalid_key_spec("key spec has no fields"));
        }
        for (i, (field, _)) in self.keys.iter().enumerate() {
            if field.is_empty() || field.split('.').any(str::is_empty) {
                return Err(SchemaError::invalid_key_spec(format!(
                    "invalid field name {field:?}"
                )));
            }
            if self.keys[..i].iter().any(|(f, _)| f == field) {
                return Err(SchemaError::invalid_key_spec(format!(
                    "field {field:?} appears twice"
                )));
            }
        }
        let text_keys = self
            .keys
            .iter()
            .filter(|(_, d)| *d == IndexDirection::Text)
            .count();
        if text_keys > 1 {
            return Err(SchemaError::invalid_key_spec(
                "at most one text key is allowed",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (field, dir)) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}: {dir}")?;
        }
        f.write_str("}")
    }
}

/// Derives the canonical name of an index from its keys.
///
/// Each field is joined with its direction token, and the pairs are joined
/// with `_`: `{a: 1, b: -1}` becomes `a_1_b_-1`.
pub fn derive_index_name(keys: &KeySpec) -> String {
    keys.iter()
        .map(|(field, dir)| format!("{field}_{}", dir.token()))
        .collect::<Vec<_>>()
        .join("_")
}

/// Partial-filter predicate over a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Field presence test.
    Exists {
        /// Field path.
        field: String,
        /// Whether the field must be present (true) or absent (false).
        exists: bool,
    },
    /// Field equals value.
    Eq(String, Value),
    /// Field greater than value.
    Gt(String, Value),
    /// Field greater than or equal to value.
    Gte(String, Value),
    /// Field less than value.
    Lt(String, Value),
    /// Field less than or equal to value.
    Lte(String, Value),
    /// Every predicate must hold.
    And(Vec<Filter>),
}

impl Filter {
    /// Returns true if `doc` satisfies the predicate.
    pub fn matches(&self, doc: &Document) -> bool {
        let cmp = |field: &String, value: &Value| {
            doc.get_path(field).and_then(|v| v.compare(value))
        };
        match self {
            Filter::Exists { field, exists } => doc.get_path(field).is_some() == *exists,
            Filter::Eq(field, value) => doc.get_path(field) == Some(value),
            Filter::Gt(field, value) => cmp(field, value) == Some(Ordering::Greater),
            Filter::Gte(field, value) => {
                matches!(cmp(field, value), Some(Ordering::Greater | Ordering::Equal))
            }
            Filter::Lt(field, value) => cmp(field, value) == Some(Ordering::Less),
            Filter::Lte(field, value) => {
                matches!(cmp(field, value), Some(Ordering::Less | Ordering::Equal))
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            Filter::Exists { .. } => true,
            Filter::Eq(_, value)
            | Filter::Gt(_, value)
            | Filter::Gte(_, value)
            | Filter::Lt(_, value)
            | Filter::Lte(_, value) => value.is_finite(),
            Filter::And(filters) => filters.iter().all(Filter::is_finite),
        }
    }
}

/// Options of an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexOptions {
    /// Explicit index name. When absent the name is derived from the keys.
    pub name: Option<String>,
    /// Whether indexed key tuples must be unique.
    pub unique: bool,
    /// Whether documents missing the indexed fields are left out.
    pub sparse: bool,
    /// Only documents matching the filter are indexed.
    pub partial_filter: Option<Filter>,
}

impl IndexOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Makes the index unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Makes the index sparse.
    #[must_use]
    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    /// Sets a partial-filter predicate.
    #[must_use]
    pub fn partial_filter(mut self, filter: Filter) -> Self {
        self.partial_filter = Some(filter);
        self
    }
}

/// A complete index definition: keys plus options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexModel {
    /// Key specification.
    pub keys: KeySpec,
    /// Options.
    pub options: IndexOptions,
}

impl IndexModel {
    /// Creates an index definition.
    pub fn new(keys: KeySpec, options: IndexOptions) -> Self {
        Self { keys, options }
    }

    /// Creates an index definition with default options.
    pub fn on(keys: KeySpec) -> Self {
        Self::new(keys, IndexOptions::default())
    }

    /// Returns the index's identity: the explicit name if given, otherwise
    /// the name derived from the keys.
    pub fn resolved_name(&self) -> String {
        match &self.options.name {
            Some(name) => name.clone(),
            None => derive_index_name(&self.keys),
        }
    }

    /// Returns a copy whose options carry the resolved name.
    #[must_use]
    pub fn named(&self) -> Self {
        let mut model = self.clone();
        model.options.name = Some(self.resolved_name());
        model
    }

    /// Returns true if both definitions index the same keys with the same
    /// options, ignoring how the name was arrived at.
    pub fn same_definition(&self, other: &IndexModel) -> bool {
        self.keys == other.keys
            && self.options.unique == other.options.unique
            && self.options.sparse == other.options.sparse
            && self.options.partial_filter == other.options.partial_filter
    }

    /// Checks keys and options for declaration errors.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidKeySpec`] for malformed keys and
    /// [`SchemaError::ConflictingOptions`] for contradictory options.
    pub fn verify(&self) -> SchemaResult<()> {
        self.keys.verify()?;
        if matches!(&self.options.name, Some(name) if name.is_empty()) {
            return Err(SchemaError::conflicting_options("explicit name is empty"));
        }
        if self.options.sparse && self.options.partial_filter.is_some() {
            return Err(SchemaError::conflicting_options(
                "sparse and partial filter cannot be combined",
            ));
        }
        if matches!(&self.options.partial_filter, Some(filter) if !filter.is_finite()) {
            return Err(SchemaError::conflicting_options(
                "partial filter compares against a non-finite number",
            ));
        }
        if self.options.unique && self.keys.has_direction(IndexDirection::Hashed) {
            return Err(SchemaError::conflicting_options(
                "hashed indexes cannot be unique",
            ));
        }
        Ok(())
    }
}
