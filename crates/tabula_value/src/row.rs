//! Row records.

use crate::value::{Value, UNDEFINED};
use std::collections::BTreeMap;

/// A structured record: a mapping of field name to value.
///
/// Fields that are not present read as [`Value::Undefined`].
///
/// # Example
///
/// ```
/// use tabula_value::{Row, Value};
///
/// let row = Row::new().with("id", 1).with("name", "Alice");
/// assert_eq!(row.get("name"), &Value::from("Alice"));
/// assert!(row.get("age").is_undefined());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: BTreeMap<String, Value>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a row from a field map.
    #[must_use]
    pub fn from_fields(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }

    /// Sets a field, returning the row (builder style).
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Returns the value of a field, or `Undefined` when absent.
    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&UNDEFINED)
    }

    /// Returns true if the field is present (even if null).
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Sets a field, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Returns a copy of this row with every field of `diff` written over it.
    #[must_use]
    pub fn merged(&self, diff: &Row) -> Row {
        let mut fields = self.fields.clone();
        for (name, value) in &diff.fields {
            fields.insert(name.clone(), value.clone());
        }
        Row { fields }
    }

    /// Iterates over fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the underlying field map.
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Consumes the row, returning it as an object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<BTreeMap<String, Value>> for Row {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
