//! Dynamic document value type.

use crate::rule::BsonType;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Milliseconds since the Unix epoch.
pub type UnixMillis = i64;

/// A dynamic document value.
///
/// This is the value model the game store persists. It mirrors the subset
/// of BSON the schema uses: identifiers are UUIDs and timestamps are Unix
/// milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Point in time, in Unix milliseconds.
    Timestamp(UnixMillis),
    /// Store-assigned identifier or a reference to one.
    Id(Uuid),
    /// Ordered list of values.
    Array(Vec<Value>),
    /// Nested document.
    Document(Document),
}

impl Value {
    /// Returns the BSON type name this value reports to validators.
    ///
    /// Integers that fit in 32 bits report as `int`, wider ones as `long`.
    pub fn bson_type(&self) -> BsonType {
        match self {
            Value::Null => BsonType::Null,
            Value::Bool(_) => BsonType::Bool,
            Value::Int(n) if i32::try_from(*n).is_ok() => BsonType::Int,
            Value::Int(_) => BsonType::Long,
            Value::Double(_) => BsonType::Double,
            Value::String(_) => BsonType::String,
            Value::Timestamp(_) => BsonType::Date,
            Value::Id(_) => BsonType::ObjectId,
            Value::Array(_) => BsonType::Array,
            Value::Document(_) => BsonType::Object,
        }
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the string slice if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the numeric value of integers and doubles.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the timestamp if this is a timestamp.
    pub fn as_timestamp(&self) -> Option<UnixMillis> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Returns the identifier if this is an identifier.
    pub fn as_id(&self) -> Option<Uuid> {
        match self {
            Value::Id(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the elements if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the nested document if this is a document.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Returns false if this value is, or contains, a NaN or infinite double.
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Double(d) => d.is_finite(),
            Value::Array(items) => items.iter().all(Value::is_finite),
            Value::Document(doc) => doc.is_finite(),
            _ => true,
        }
    }

    /// Compares two values of comparable kinds.
    ///
    /// Integers and doubles compare numerically with each other. Strings,
    /// timestamps and booleans compare within their own kind. Any other
    /// pairing is incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Id(a), Value::Id(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Value::Id(id)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Document(doc)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A document: an ordered map of field names to values.
///
/// Field order is insertion order. Setting an existing field replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field and returns the document, for chained construction.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a field, returning the previous value if there was one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.fields.push((key, value));
        None
    }

    /// Returns a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Resolves a dotted path (`a.b.c`) through nested documents.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.get(parts.next()?)?;
        for part in parts {
            current = current.as_document()?.get(part)?;
        }
        Some(current)
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(pos).1)
    }

    /// Returns true if the field is present (even if null).
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns false if any field holds a NaN or infinite double.
    pub fn is_finite(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.is_finite())
    }

    /// Iterates over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_width_determines_bson_type() {
        assert_eq!(Value::Int(8).bson_type(), BsonType::Int);
        assert_eq!(Value::Int(i64::from(i32::MAX) + 1).bson_type(), BsonType::Long);
    }

    #[test]
    fn non_finite_doubles_are_found_when_nested() {
        let nested = Document::new().with("ratio", f64::INFINITY);
        let doc = Document::new()
            .with("wins", 3)
            .with("history", Value::Array(vec![Value::Document(nested)]));
        assert!(!doc.is_finite());
        assert!(Document::new().with("ratio", 0.5).is_finite());
        assert!(!Value::Double(f64::NAN).is_finite());
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut doc = Document::new().with("a", 1).with("b", 2);
        let old = doc.insert("a", 10);
        assert_eq!(old, Some(Value::Int(1)));
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(doc.get("a"), Some(&Value::Int(10)));
    }

    #[test]
    fn dotted_path_lookup() {
        let inner = Document::new().with("city", "Oslo");
        let doc = Document::new().with("address", inner);
        assert_eq!(doc.get_path("address.city"), Some(&Value::from("Oslo")));
        assert_eq!(doc.get_path("address.zip"), None);
        assert_eq!(doc.get_path("missing.city"), None);
    }

    #[test]
    fn option_none_becomes_null() {
        let v: Value = Option::<String>::None.into();
        assert!(v.is_null());
    }

    #[test]
    fn numeric_comparison_crosses_int_and_double() {
        assert_eq!(
            Value::Int(2).compare(&Value::Double(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::from("a").compare(&Value::Int(1)), None);
    }

    #[test]
    fn remove_field() {
        let mut doc = Document::new().with("a", 1);
        assert_eq!(doc.remove("a"), Some(Value::Int(1)));
        assert!(doc.is_empty());
        assert_eq!(doc.remove("a"), None);
    }
}
