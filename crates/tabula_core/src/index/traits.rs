//! Index traits and key types.

use std::cmp::Ordering;
use tabula_value::Value;

/// A key stored in an ordered index.
///
/// Wraps a [`Value`] and orders it with [`Value::total_cmp`], so keys of
/// mixed types can share one index. Equality follows the same order:
/// `-0` and `0` are the same key.
#[derive(Debug, Clone)]
pub struct IndexKey(Value);

impl IndexKey {
    /// Creates a key from a value.
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// Returns the wrapped value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Consumes the key, returning the wrapped value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for IndexKey {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<&Value> for IndexKey {
    fn from(value: &Value) -> Self {
        Self(value.clone())
    }
}

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexKey {}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Core index trait.
///
/// The point operations every ordered index provides. Range iteration lives
/// on the concrete types because it is generic over the visitor.
pub trait Index<V>: Send + Sync {
    /// Returns the value stored under a key.
    fn get(&self, key: &IndexKey) -> Option<&V>;

    /// Stores a value under a key, returning the previous one.
    fn set(&mut self, key: IndexKey, value: V) -> Option<V>;

    /// Removes a key, returning its value.
    fn delete(&mut self, key: &IndexKey) -> Option<V>;

    /// Checks if the index contains a key.
    fn has(&self, key: &IndexKey) -> bool {
        self.get(key).is_some()
    }

    /// Returns the number of keys in the index.
    fn len(&self) -> usize;

    /// Returns true if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears the index.
    fn clear(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_total_order() {
        assert!(IndexKey::new(Value::Null) < IndexKey::new(0));
        assert!(IndexKey::new(10) < IndexKey::new("a"));
        assert_eq!(IndexKey::new(-0.0), IndexKey::new(0.0));
    }

    #[test]
    fn number_and_bigint_are_distinct_keys() {
        assert_ne!(IndexKey::new(1), IndexKey::new(Value::BigInt(1)));
    }
}
