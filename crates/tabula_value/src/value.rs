//! Dynamic value type.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A dynamic field value.
///
/// This type represents any value a row field can hold. `Undefined` is the
/// value of a field that is absent from a row; `Null` is an explicit null.
///
/// `PartialEq` is structural. Matchers use [`Value::deep_eq`] instead, which
/// treats arrays as multisets.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Undefined,
    /// Explicit null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Double precision number.
    Number(f64),
    /// Arbitrary precision integer (up to 128 bits).
    BigInt(i128),
    /// Text string (UTF-8).
    Text(String),
    /// Instant in time, milliseconds since the Unix epoch.
    Date(i64),
    /// Array of values.
    Array(Vec<Value>),
    /// Nested object with named fields.
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Compare two values under the total order used by indexes and sorting.
    ///
    /// Values of different types are ordered by type rank:
    /// `Undefined < Null < Bool < Number < BigInt < Date < Text < Array < Object`.
    /// Within a type the natural order applies. Numbers treat `-0` and `0` as
    /// equal and place NaN after every other number.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        let self_rank = self.type_rank();
        let other_rank = other.type_rank();

        if self_rank != other_rank {
            return self_rank.cmp(&other_rank);
        }

        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => Self::cmp_numbers(*a, *b),
            (Value::BigInt(a), Value::BigInt(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => {
                for (av, bv) in a.iter().zip(b.iter()) {
                    let ord = av.total_cmp(bv);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Object(a), Value::Object(b)) => {
                for ((ak, av), (bk, bv)) in a.iter().zip(b.iter()) {
                    let key_ord = ak.cmp(bk);
                    if key_ord != Ordering::Equal {
                        return key_ord;
                    }
                    let val_ord = av.total_cmp(bv);
                    if val_ord != Ordering::Equal {
                        return val_ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => Ordering::Equal, // Unreachable with equal ranks
        }
    }

    /// Compare two values when both belong to the same ordering class.
    ///
    /// Returns `None` when the values are of different types, or when either
    /// is `Null`/`Undefined`. Range matchers are only satisfiable when this
    /// returns `Some`.
    pub fn class_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.is_nullish() || other.is_nullish() {
            return None;
        }
        if self.type_rank() != other.type_rank() {
            return None;
        }
        Some(self.total_cmp(other))
    }

    fn cmp_numbers(a: f64, b: f64) -> Ordering {
        if a == b {
            Ordering::Equal
        } else {
            a.total_cmp(&b)
        }
    }

    /// Rank of this value's type in the total order.
    fn type_rank(&self) -> u8 {
        match self {
            Value::Undefined => 0,
            Value::Null => 1,
            Value::Bool(_) => 2,
            Value::Number(_) => 3,
            Value::BigInt(_) => 4,
            Value::Date(_) => 5,
            Value::Text(_) => 6,
            Value::Array(_) => 7,
            Value::Object(_) => 8,
        }
    }

    /// Returns the name of this value's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::Date(_) => "date",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Check if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is null or undefined.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    /// Check if this value is a scalar (not an array or object).
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as a number, if it is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is a number without fraction.
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            Value::BigInt(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get this value as an object, if it is one.
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a field in this object value.
    ///
    /// Returns `Undefined` for missing fields and for non-object values.
    pub fn get(&self, key: &str) -> &Value {
        match self {
            Value::Object(fields) => fields.get(key).unwrap_or(&UNDEFINED),
            _ => &UNDEFINED,
        }
    }
}

/// Shared `Undefined` returned for missing fields.
pub(crate) static UNDEFINED: Value = Value::Undefined;

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i128> for Value {
    fn from(n: i128) -> Self {
        Value::BigInt(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(m: BTreeMap<String, Value>) -> Self {
        Value::Object(m)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_rank_ordering() {
        let mut values = vec![
            Value::Text("a".into()),
            Value::Number(1.0),
            Value::Null,
            Value::Date(5),
            Value::Undefined,
            Value::Bool(false),
            Value::BigInt(1),
        ];
        values.sort_by(Value::total_cmp);

        assert_eq!(values[0], Value::Undefined);
        assert_eq!(values[1], Value::Null);
        assert_eq!(values[2], Value::Bool(false));
        assert_eq!(values[3], Value::Number(1.0));
        assert_eq!(values[4], Value::BigInt(1));
        assert_eq!(values[5], Value::Date(5));
        assert_eq!(values[6], Value::Text("a".into()));
    }

    #[test]
    fn numbers_compare_numerically() {
        assert_eq!(Value::from(2).total_cmp(&Value::from(10)), Ordering::Less);
        assert_eq!(Value::from(-0.0).total_cmp(&Value::from(0.0)), Ordering::Equal);
        assert_eq!(
            Value::from(f64::NAN).total_cmp(&Value::from(f64::INFINITY)),
            Ordering::Greater
        );
    }

    #[test]
    fn arrays_compare_lexicographically() {
        let short = Value::from(vec![1, 2]);
        let long = Value::from(vec![1, 2, 0]);
        let bigger = Value::from(vec![1, 3]);
        assert_eq!(short.total_cmp(&long), Ordering::Less);
        assert_eq!(long.total_cmp(&bigger), Ordering::Less);
    }

    #[test]
    fn class_cmp_rejects_mixed_and_nullish() {
        assert_eq!(Value::from(1).class_cmp(&Value::from(2)), Some(Ordering::Less));
        assert_eq!(Value::from(1).class_cmp(&Value::from("2")), None);
        assert_eq!(Value::from(1).class_cmp(&Value::BigInt(2)), None);
        assert_eq!(Value::Null.class_cmp(&Value::Null), None);
        assert_eq!(Value::Undefined.class_cmp(&Value::from(0)), None);
    }

    #[test]
    fn value_accessors() {
        assert!(Value::Null.is_null());
        assert!(Value::Undefined.is_nullish());
        assert!(!Value::Bool(true).is_nullish());

        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::from(42).as_integer(), Some(42));
        assert_eq!(Value::from(4.5).as_integer(), None);
        assert_eq!(Value::from("hello").as_text(), Some("hello"));
        assert_eq!(Value::from(4.5).as_number(), Some(4.5));
    }

    #[test]
    fn object_get() {
        let mut fields = BTreeMap::new();
        fields.insert("city".to_string(), Value::from("Oslo"));
        let object = Value::Object(fields);

        assert_eq!(object.get("city"), &Value::from("Oslo"));
        assert_eq!(object.get("zip"), &Value::Undefined);
        assert_eq!(Value::from(1).get("city"), &Value::Undefined);
    }

    #[test]
    fn from_impls() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i64), Value::Number(42.0));
        assert_eq!(Value::from(42i32), Value::Number(42.0));
        assert_eq!(Value::from(7i128), Value::BigInt(7));
        assert_eq!(Value::from("hello"), Value::Text("hello".to_string()));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(()), Value::Null);
    }

    mod ordering {
        use super::*;
        use proptest::prelude::*;

        fn value_strategy() -> impl Strategy<Value = Value> {
            let leaf = prop_oneof![
                Just(Value::Undefined),
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
                (-5i32..5).prop_map(Value::from),
                prop_oneof![Just(0.0), Just(-0.0), Just(2.5)].prop_map(Value::Number),
                (-3i128..3).prop_map(Value::BigInt),
                (0i64..3).prop_map(Value::Date),
                prop::sample::select(vec!["", "a", "b"]).prop_map(Value::from),
            ];
            leaf.prop_recursive(2, 8, 3, |inner| {
                prop::collection::vec(inner, 0..3).prop_map(Value::Array)
            })
        }

        proptest! {
            #[test]
            fn total_order_is_antisymmetric(a in value_strategy(), b in value_strategy()) {
                prop_assert_eq!(a.total_cmp(&b), b.total_cmp(&a).reverse());
            }

            #[test]
            fn total_order_is_transitive(
                a in value_strategy(),
                b in value_strategy(),
                c in value_strategy(),
            ) {
                let mut sorted = [a, b, c];
                sorted.sort_by(|x, y| x.total_cmp(y));
                prop_assert_ne!(sorted[0].total_cmp(&sorted[2]), Ordering::Greater);
            }

            #[test]
            fn class_order_agrees_with_total_order(a in value_strategy(), b in value_strategy()) {
                if let Some(ordering) = a.class_cmp(&b) {
                    prop_assert_eq!(ordering, a.total_cmp(&b));
                }
            }
        }
    }
}
