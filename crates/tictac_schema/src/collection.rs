//! Collection options: validator plus enforcement policy.

use crate::rule::Validator;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which writes a validator is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationLevel {
    /// No validation.
    Off,
    /// Inserts are validated; updates only when the existing document was
    /// already valid. Pre-existing non-conforming documents are tolerated.
    Moderate,
    /// Every insert and update is validated.
    #[default]
    Strict,
}

impl ValidationLevel {
    /// Returns true if a write should be validated.
    ///
    /// `existing_valid` is `None` for inserts and `Some(valid)` for updates
    /// of a document whose current state is `valid`.
    pub fn applies(&self, existing_valid: Option<bool>) -> bool {
        match self {
            ValidationLevel::Off => false,
            ValidationLevel::Strict => true,
            ValidationLevel::Moderate => existing_valid.unwrap_or(true),
        }
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationLevel::Off => "off",
            ValidationLevel::Moderate => "moderate",
            ValidationLevel::Strict => "strict",
        })
    }
}

/// What happens to a write that fails validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationAction {
    /// The write is rejected.
    #[default]
    Error,
    /// The write is accepted and the violation is logged.
    Warn,
}

impl fmt::Display for ValidationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationAction::Error => "error",
            ValidationAction::Warn => "warn",
        })
    }
}

/// Options attached to a collection: its validator and how it is enforced.
///
/// Level and action are passed through to the store unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionOptions {
    /// Structural validator.
    pub validator: Validator,
    /// Enforcement level.
    pub level: ValidationLevel,
    /// Enforcement action.
    pub action: ValidationAction,
}

impl CollectionOptions {
    /// Creates options with the store's default policy (strict, error).
    pub fn new(validator: Validator) -> Self {
        Self {
            validator,
            level: ValidationLevel::default(),
            action: ValidationAction::default(),
        }
    }

    /// Sets the enforcement level.
    #[must_use]
    pub fn level(mut self, level: ValidationLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the enforcement action.
    #[must_use]
    pub fn action(mut self, action: ValidationAction) -> Self {
        self.action = action;
        self
    }
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self::new(Validator::accept_all())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderate_skips_updates_of_invalid_documents() {
        let level = ValidationLevel::Moderate;
        assert!(level.applies(None));
        assert!(level.applies(Some(true)));
        assert!(!level.applies(Some(false)));
    }

    #[test]
    fn strict_and_off() {
        assert!(ValidationLevel::Strict.applies(Some(false)));
        assert!(!ValidationLevel::Off.applies(None));
    }

    #[test]
    fn defaults_match_store_defaults() {
        let options = CollectionOptions::default();
        assert_eq!(options.level, ValidationLevel::Strict);
        assert_eq!(options.action, ValidationAction::Error);
    }
}
