//! Validator rule trees.
//!
//! A validator is a tree of [`Rule`]s rooted at an [`ObjectRule`]. Rules
//! follow JSON-schema semantics: a rule that does not apply to a value's
//! type passes (a length rule on an integer is vacuous), so type
//! constraints are always stated explicitly with [`Rule::Type`].
//!
//! Evaluation collects every violation instead of stopping at the first,
//! so a caller can report all problems with a document at once.

use crate::error::{SchemaError, SchemaResult};
use crate::value::{Document, Value};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// BSON type names understood by [`Rule::Type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BsonType {
    /// `null`
    Null,
    /// `bool`
    Bool,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    Long,
    /// `double`
    Double,
    /// `string`
    String,
    /// `date`
    Date,
    /// `objectId`
    ObjectId,
    /// `array`
    Array,
    /// `object`
    Object,
}

impl BsonType {
    /// Returns the BSON alias for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            BsonType::Null => "null",
            BsonType::Bool => "bool",
            BsonType::Int => "int",
            BsonType::Long => "long",
            BsonType::Double => "double",
            BsonType::String => "string",
            BsonType::Date => "date",
            BsonType::ObjectId => "objectId",
            BsonType::Array => "array",
            BsonType::Object => "object",
        }
    }
}

impl fmt::Display for BsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single node in a validator tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rule {
    /// The value's type must be one of the listed types.
    Type(Vec<BsonType>),
    /// Inclusive numeric bounds.
    Range {
        /// Lower bound.
        min: Option<f64>,
        /// Upper bound.
        max: Option<f64>,
    },
    /// Inclusive string length bounds, in characters.
    Length {
        /// Minimum length.
        min: Option<usize>,
        /// Maximum length.
        max: Option<usize>,
    },
    /// Regular expression the string must match.
    Pattern(String),
    /// The value must equal one of the listed values.
    Enum(Vec<Value>),
    /// Structural rule for nested documents.
    Object(ObjectRule),
    /// Every array element must satisfy the rule.
    Items(Box<Rule>),
    /// Every rule must hold.
    All(Vec<Rule>),
}

impl Rule {
    /// Type rule accepting any of `types`.
    pub fn types(types: impl IntoIterator<Item = BsonType>) -> Self {
        Rule::Type(types.into_iter().collect())
    }

    /// Type rule accepting exactly one type.
    pub fn of(ty: BsonType) -> Self {
        Rule::Type(vec![ty])
    }

    /// Numeric lower bound.
    pub fn minimum(min: f64) -> Self {
        Rule::Range {
            min: Some(min),
            max: None,
        }
    }

    /// Inclusive numeric range.
    pub fn between(min: f64, max: f64) -> Self {
        Rule::Range {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Inclusive string length range.
    pub fn length(min: usize, max: usize) -> Self {
        Rule::Length {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Regular expression rule.
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Rule::Pattern(pattern.into())
    }

    /// Enumeration rule.
    pub fn one_of(values: impl IntoIterator<Item = Value>) -> Self {
        Rule::Enum(values.into_iter().collect())
    }

    /// Array element rule.
    pub fn items(rule: Rule) -> Self {
        Rule::Items(Box::new(rule))
    }

    /// Conjunction of rules.
    pub fn all(rules: impl IntoIterator<Item = Rule>) -> Self {
        Rule::All(rules.into_iter().collect())
    }

    /// Evaluates the rule against `value`, appending violations to `out`.
    pub fn check(&self, value: &Value, path: &str, out: &mut Vec<Violation>) {
        match self {
            Rule::Type(types) => {
                let actual = value.bson_type();
                if !types.contains(&actual) {
                    let expected: Vec<_> = types.iter().map(BsonType::as_str).collect();
                    out.push(Violation::new(
                        path,
                        format!("expected {}, found {actual}", expected.join("|")),
                    ));
                }
            }
            Rule::Range { min, max } => {
                let Some(n) = value.as_f64() else { return };
                if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                    out.push(Violation::new(
                        path,
                        format!("{n} is outside {}", describe_bounds(*min, *max)),
                    ));
                }
            }
            Rule::Length { min, max } => {
                let Some(s) = value.as_str() else { return };
                let len = s.chars().count();
                if min.is_some_and(|m| len < m) || max.is_some_and(|m| len > m) {
                    out.push(Violation::new(
                        path,
                        format!(
                            "length {len} is outside {}",
                            describe_bounds(min.map(|m| m as f64), max.map(|m| m as f64))
                        ),
                    ));
                }
            }
            Rule::Pattern(pattern) => {
                let Some(s) = value.as_str() else { return };
                match Regex::new(pattern) {
                    Ok(re) if re.is_match(s) => {}
                    Ok(_) => out.push(Violation::new(
                        path,
                        format!("{s:?} does not match /{pattern}/"),
                    )),
                    Err(e) => out.push(Violation::new(path, format!("unusable pattern: {e}"))),
                }
            }
            Rule::Enum(allowed) => {
                if !allowed.contains(value) {
                    out.push(Violation::new(path, "value is not in the enumeration"));
                }
            }
            Rule::Object(object) => {
                if let Value::Document(doc) = value {
                    object.check_document(doc, path, out);
                }
            }
            Rule::Items(rule) => {
                if let Value::Array(items) = value {
                    for (i, item) in items.iter().enumerate() {
                        rule.check(item, &format!("{path}[{i}]"), out);
                    }
                }
            }
            Rule::All(rules) => {
                for rule in rules {
                    rule.check(value, path, out);
                }
            }
        }
    }

    /// Checks that the rule itself is well formed.
    pub fn verify(&self, path: &str) -> SchemaResult<()> {
        match self {
            Rule::Type(types) if types.is_empty() => {
                Err(SchemaError::invalid_rule(path, "type rule lists no types"))
            }
            Rule::Range { min, max } if min.iter().chain(max).any(|b| !b.is_finite()) => Err(
                SchemaError::invalid_rule(path, "numeric bounds must be finite"),
            ),
            Rule::Range {
                min: Some(min),
                max: Some(max),
            } if min > max => Err(SchemaError::invalid_rule(
                path,
                format!("minimum {min} exceeds maximum {max}"),
            )),
            Rule::Length {
                min: Some(min),
                max: Some(max),
            } if min > max => Err(SchemaError::invalid_rule(
                path,
                format!("minimum length {min} exceeds maximum length {max}"),
            )),
            Rule::Pattern(pattern) => Regex::new(pattern)
                .map(|_| ())
                .map_err(|e| SchemaError::invalid_rule(path, format!("bad pattern: {e}"))),
            Rule::Enum(values) if values.is_empty() => {
                Err(SchemaError::invalid_rule(path, "enumeration is empty"))
            }
            Rule::Enum(values) if !values.iter().all(Value::is_finite) => Err(
                SchemaError::invalid_rule(path, "enumeration holds a non-finite number"),
            ),
            Rule::Object(object) => object.verify(path),
            Rule::Items(rule) => rule.verify(&format!("{path}[]")),
            Rule::All(rules) => rules.iter().try_for_each(|r| r.verify(path)),
            _ => Ok(()),
        }
    }
}

fn describe_bounds(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("[{min}, {max}]"),
        (Some(min), None) => format!("[{min}, ∞)"),
        (None, Some(max)) => format!("(-∞, {max}]"),
        (None, None) => "(-∞, ∞)".to_string(),
    }
}

/// A named property of an object rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Field name.
    pub name: String,
    /// Rule the field's value must satisfy when present.
    pub rule: Rule,
    /// Human-readable description.
    pub description: Option<String>,
}

/// Structural rule for a document: required fields and per-field rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRule {
    /// Fields that must be present.
    pub required: Vec<String>,
    /// Per-field rules, in declaration order.
    pub properties: Vec<Property>,
    /// Whether fields not listed in `properties` are allowed.
    pub additional_properties: bool,
}

impl Default for ObjectRule {
    fn default() -> Self {
        Self {
            required: Vec::new(),
            properties: Vec::new(),
            additional_properties: true,
        }
    }
}

impl ObjectRule {
    /// Creates an object rule that allows additional properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the required fields.
    #[must_use]
    pub fn required<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.required = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a described property.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, rule: Rule, description: &str) -> Self {
        self.properties.push(Property {
            name: name.into(),
            rule,
            description: Some(description.to_string()),
        });
        self
    }

    /// Adds a property without a description.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, rule: Rule) -> Self {
        self.properties.push(Property {
            name: name.into(),
            rule,
            description: None,
        });
        self
    }

    /// Sets whether unlisted fields are allowed.
    #[must_use]
    pub fn additional_properties(mut self, allowed: bool) -> Self {
        self.additional_properties = allowed;
        self
    }

    /// Returns the rule for a property.
    pub fn property_rule(&self, name: &str) -> Option<&Rule> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.rule)
    }

    fn check_document(&self, doc: &Document, path: &str, out: &mut Vec<Violation>) {
        for field in &self.required {
            if !doc.contains_key(field) {
                out.push(Violation::new(
                    path,
                    format!("missing required field {field:?}"),
                ));
            }
        }
        for (key, value) in doc.iter() {
            match self.property_rule(key) {
                Some(rule) => rule.check(value, &join(path, key), out),
                None if !self.additional_properties => {
                    out.push(Violation::new(path, format!("unexpected field {key:?}")));
                }
                None => {}
            }
        }
    }

    fn verify(&self, path: &str) -> SchemaResult<()> {
        for (i, property) in self.properties.iter().enumerate() {
            if property.name.is_empty() {
                return Err(SchemaError::invalid_rule(path, "property with empty name"));
            }
            if self.properties[..i].iter().any(|p| p.name == property.name) {
                return Err(SchemaError::invalid_rule(
                    path,
                    format!("property {:?} declared twice", property.name),
                ));
            }
            property.rule.verify(&join(path, &property.name))?;
        }
        if !self.additional_properties {
            if let Some(field) = self
                .required
                .iter()
                .find(|f| self.property_rule(f).is_none())
            {
                return Err(SchemaError::invalid_rule(
                    path,
                    format!("required field {field:?} is not an allowed property"),
                ));
            }
        }
        Ok(())
    }
}

fn join(path: &str, key: &str) -> String {
    format!("{path}.{key}")
}

/// A collection validator: the root object rule of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    /// Root rule.
    pub root: ObjectRule,
}

impl Validator {
    /// Creates a validator from its root rule.
    pub fn new(root: ObjectRule) -> Self {
        Self { root }
    }

    /// Returns a validator that accepts every document.
    pub fn accept_all() -> Self {
        Self::new(ObjectRule::new())
    }

    /// Returns every violation in `doc`. Empty means the document is valid.
    pub fn check(&self, doc: &Document) -> Vec<Violation> {
        let mut out = Vec::new();
        self.root.check_document(doc, "$", &mut out);
        out
    }

    /// Returns true if `doc` satisfies the validator.
    pub fn is_valid(&self, doc: &Document) -> bool {
        self.check(doc).is_empty()
    }

    /// Checks that the validator is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidRule`] naming the first malformed rule.
    pub fn verify(&self) -> SchemaResult<()> {
        self.root.verify("$")
    }
}

/// A single rule violation found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Path to the offending value (`$.moves[2].cell`).
    pub path: String,
    /// What is wrong with it.
    pub message: String,
}

impl Violation {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn username_rule() -> Rule {
        Rule::all([Rule::of(BsonType::String), Rule::length(3, 64)])
    }

    fn violations(rule: &Rule, value: Value) -> Vec<Violation> {
        let mut out = Vec::new();
        rule.check(&value, "$.x", &mut out);
        out
    }

    #[test]
    fn type_rule_accepts_listed_types() {
        let rule = Rule::types([BsonType::String, BsonType::Null]);
        assert!(violations(&rule, Value::from("a")).is_empty());
        assert!(violations(&rule, Value::Null).is_empty());
        let found = violations(&rule, Value::Int(1));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].message, "expected string|null, found int");
    }

    #[test]
    fn range_rule_is_inclusive() {
        let rule = Rule::between(0.0, 8.0);
        assert!(violations(&rule, Value::Int(0)).is_empty());
        assert!(violations(&rule, Value::Int(8)).is_empty());
        assert_eq!(violations(&rule, Value::Int(9)).len(), 1);
        assert_eq!(violations(&rule, Value::Int(-1)).len(), 1);
    }

    #[test]
    fn range_rule_ignores_non_numbers() {
        assert!(violations(&Rule::minimum(0.0), Value::from("x")).is_empty());
    }

    #[test]
    fn length_counts_characters() {
        let rule = username_rule();
        assert!(violations(&rule, Value::from("ålø")).is_empty());
        assert_eq!(violations(&rule, Value::from("ab")).len(), 1);
        assert_eq!(violations(&rule, Value::from("a".repeat(65))).len(), 1);
    }

    #[test]
    fn pattern_rule() {
        let rule = Rule::pattern(r"^[^\s@]+@[^\s@]+\.[^\s@]+$");
        assert!(violations(&rule, Value::from("alice@example.com")).is_empty());
        assert_eq!(violations(&rule, Value::from("alice@example")).len(), 1);
        assert!(violations(&rule, Value::Null).is_empty());
    }

    #[test]
    fn enum_rule_includes_null() {
        let rule = Rule::one_of([
            Value::from("X"),
            Value::from("O"),
            Value::from("draw"),
            Value::Null,
        ]);
        assert!(violations(&rule, Value::Null).is_empty());
        assert!(violations(&rule, Value::from("draw")).is_empty());
        assert_eq!(violations(&rule, Value::from("Y")).len(), 1);
    }

    #[test]
    fn object_rule_reports_missing_and_unexpected_fields() {
        let rule = ObjectRule::new()
            .required(["cell", "player"])
            .field("cell", Rule::of(BsonType::Int))
            .field("player", Rule::of(BsonType::String))
            .additional_properties(false);
        let validator = Validator::new(rule);

        let doc = Document::new().with("cell", 3).with("extra", true);
        let found = validator.check(&doc);
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|v| v.message.contains("\"player\"")));
        assert!(found.iter().any(|v| v.message.contains("\"extra\"")));
    }

    #[test]
    fn items_rule_reports_element_paths() {
        let rule = Rule::items(Rule::Object(
            ObjectRule::new().field("cell", Rule::between(0.0, 8.0)),
        ));
        let moves = Value::Array(vec![
            Document::new().with("cell", 4).into(),
            Document::new().with("cell", 12).into(),
        ]);
        let found = violations(&rule, moves);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "$.x[1].cell");
    }

    #[test]
    fn all_violations_are_collected() {
        let validator = Validator::new(
            ObjectRule::new()
                .required(["a", "b", "c"])
                .field("d", Rule::of(BsonType::Int)),
        );
        let doc = Document::new().with("d", "nope");
        assert_eq!(validator.check(&doc).len(), 4);
    }

    #[test]
    fn verify_rejects_inverted_bounds() {
        let validator = Validator::new(ObjectRule::new().field("n", Rule::between(5.0, 1.0)));
        let err = validator.verify().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidRule { ref path, .. } if path == "$.n"));
    }

    #[test]
    fn verify_rejects_non_finite_bounds() {
        for rule in [
            Rule::minimum(f64::NAN),
            Rule::between(0.0, f64::INFINITY),
            Rule::between(f64::NAN, f64::NAN),
        ] {
            let validator = Validator::new(ObjectRule::new().field("wins", rule));
            let err = validator.verify().unwrap_err();
            assert!(matches!(err, SchemaError::InvalidRule { ref path, .. } if path == "$.wins"));
        }
        let validator = Validator::new(
            ObjectRule::new().field("ratio", Rule::one_of([Value::Double(f64::NAN)])),
        );
        assert!(validator.verify().is_err());
    }

    #[test]
    fn verify_rejects_bad_pattern() {
        let validator = Validator::new(ObjectRule::new().field("s", Rule::pattern("(")));
        assert!(validator.verify().is_err());
    }

    #[test]
    fn verify_rejects_required_field_that_cannot_appear() {
        let validator = Validator::new(
            ObjectRule::new()
                .required(["a"])
                .field("b", Rule::of(BsonType::Int))
                .additional_properties(false),
        );
        assert!(validator.verify().is_err());
    }

    #[test]
    fn verify_rejects_duplicate_property() {
        let validator = Validator::new(
            ObjectRule::new()
                .field("a", Rule::of(BsonType::Int))
                .field("a", Rule::of(BsonType::String)),
        );
        assert!(validator.verify().is_err());
    }

    #[test]
    fn bson_type_serializes_as_alias() {
        let json = serde_json::to_string(&BsonType::ObjectId).unwrap();
        assert_eq!(json, "\"objectId\"");
    }
}
