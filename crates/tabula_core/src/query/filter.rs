//! Filter expressions.
//!
//! A [`Filter`] is a tree of [`Where`], `And` and `Or` nodes. A [`Where`] maps
//! field names to [`Matcher`]s. Filters are plain data: build them with the
//! builder methods or parse the structured JSON form once with
//! [`Filter::from_json`].
//!
//! ```
//! use tabula_core::query::{Filter, Where};
//! use serde_json::json;
//!
//! let built = Filter::or(vec![
//!     Where::new().eq("id", "10").into(),
//!     Where::new().eq("id", "50").into(),
//! ]);
//! let parsed = Filter::from_json(&json!({"OR": [{"id": "10"}, {"id": "50"}]})).unwrap();
//! assert_eq!(built, parsed);
//! ```

use crate::error::{DbError, DbResult};
use serde_json::Value as Json;
use tabula_value::Value;

/// A single-field predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Deep equality (arrays as multisets, dates by instant).
    Equals(Value),
    /// Strictly greater than the bound.
    Gt(Value),
    /// Greater than or equal to the bound.
    Gte(Value),
    /// Strictly less than the bound.
    Lt(Value),
    /// Less than or equal to the bound.
    Lte(Value),
    /// Inclusive range `[lo, hi]`.
    Between(Value, Value),
    /// Deep-equal to one of the listed values. An empty list never matches.
    In(Vec<Value>),
    /// The value is an array with an element deep-equal to the operand.
    Contains(Value),
    /// The value is an object whose fields match every sub-matcher.
    Nested(Where),
    /// Never matches. Produced for a `null` matcher.
    Never,
}

impl Matcher {
    /// Parses a matcher from its JSON form.
    ///
    /// - `null` becomes [`Matcher::Never`]
    /// - an object with one operator key (`equals`, `gt`, `gte`, `lt`, `lte`,
    ///   `between`, `in`, `contains`) becomes that operator
    /// - any other object becomes a [`Matcher::Nested`] sub-object matcher
    /// - anything else is implicit equality
    pub fn from_json(json: &Json) -> DbResult<Self> {
        let object = match json {
            Json::Null => return Ok(Matcher::Never),
            Json::Object(object) => object,
            other => return Ok(Matcher::Equals(Value::from(other.clone()))),
        };

        let operators: Vec<&str> = object
            .keys()
            .map(String::as_str)
            .filter(|key| OPERATORS.contains(key))
            .collect();

        match operators.as_slice() {
            [] => Ok(Matcher::Nested(Where::from_json(json)?)),
            [op] if object.len() == 1 => {
                let operand = &object[*op];
                Self::from_operator(op, operand)
            }
            _ => Err(DbError::invalid_filter(format!(
                "matcher must have exactly one operator, found {}",
                object.keys().cloned().collect::<Vec<_>>().join(", ")
            ))),
        }
    }

    fn from_operator(op: &str, operand: &Json) -> DbResult<Self> {
        let value = || Value::from(operand.clone());
        Ok(match op {
            "equals" => Matcher::Equals(value()),
            "gt" => Matcher::Gt(value()),
            "gte" => Matcher::Gte(value()),
            "lt" => Matcher::Lt(value()),
            "lte" => Matcher::Lte(value()),
            "contains" => Matcher::Contains(value()),
            "between" => match operand.as_array().map(Vec::as_slice) {
                Some([lo, hi]) => {
                    Matcher::Between(Value::from(lo.clone()), Value::from(hi.clone()))
                }
                _ => {
                    return Err(DbError::invalid_filter(
                        "between expects a two-element array",
                    ))
                }
            },
            "in" => match operand.as_array() {
                Some(items) => Matcher::In(items.iter().cloned().map(Value::from).collect()),
                None => return Err(DbError::invalid_filter("in expects an array")),
            },
            other => {
                return Err(DbError::invalid_filter(format!(
                    "unknown operator {other:?}"
                )))
            }
        })
    }
}

const OPERATORS: &[&str] = &[
    "equals", "gt", "gte", "lt", "lte", "between", "in", "contains",
];

/// Field-to-matcher mapping. All fields must match.
///
/// Fields keep insertion order; setting a field twice replaces its matcher.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Where {
    fields: Vec<(String, Matcher)>,
}

impl Where {
    /// Creates an empty `Where`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the matcher for a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, matcher: Matcher) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, existing)) => *existing = matcher,
            None => self.fields.push((name, matcher)),
        }
        self
    }

    /// Field equals value.
    #[must_use]
    pub fn eq(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.field(name, Matcher::Equals(value.into()))
    }

    /// Field greater than bound.
    #[must_use]
    pub fn gt(self, name: impl Into<String>, bound: impl Into<Value>) -> Self {
        self.field(name, Matcher::Gt(bound.into()))
    }

    /// Field greater than or equal to bound.
    #[must_use]
    pub fn gte(self, name: impl Into<String>, bound: impl Into<Value>) -> Self {
        self.field(name, Matcher::Gte(bound.into()))
    }

    /// Field less than bound.
    #[must_use]
    pub fn lt(self, name: impl Into<String>, bound: impl Into<Value>) -> Self {
        self.field(name, Matcher::Lt(bound.into()))
    }

    /// Field less than or equal to bound.
    #[must_use]
    pub fn lte(self, name: impl Into<String>, bound: impl Into<Value>) -> Self {
        self.field(name, Matcher::Lte(bound.into()))
    }

    /// Field within `[lo, hi]`.
    #[must_use]
    pub fn between(
        self,
        name: impl Into<String>,
        lo: impl Into<Value>,
        hi: impl Into<Value>,
    ) -> Self {
        self.field(name, Matcher::Between(lo.into(), hi.into()))
    }

    /// Field equal to one of the values.
    #[must_use]
    pub fn any_of<V: Into<Value>>(
        self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.field(name, Matcher::In(values.into_iter().map(Into::into).collect()))
    }

    /// Array field containing the element.
    #[must_use]
    pub fn contains(self, name: impl Into<String>, element: impl Into<Value>) -> Self {
        self.field(name, Matcher::Contains(element.into()))
    }

    /// Returns the matcher for a field.
    pub fn get(&self, name: &str) -> Option<&Matcher> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, matcher)| matcher)
    }

    /// Iterates over `(field, matcher)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Matcher)> {
        self.fields.iter().map(|(name, m)| (name.as_str(), m))
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field is constrained.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parses a `Where` from a JSON object of field matchers.
    pub fn from_json(json: &Json) -> DbResult<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| DbError::invalid_filter("where clause must be an object"))?;
        let mut clause = Where::new();
        for (name, matcher) in object {
            clause = clause.field(name.clone(), Matcher::from_json(matcher)?);
        }
        Ok(clause)
    }
}

/// A filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field matchers, all of which must pass.
    Where(Where),
    /// All children must match.
    And(Vec<Filter>),
    /// At least one child must match.
    Or(Vec<Filter>),
}

impl Filter {
    /// Creates an `And` node.
    pub fn and(children: Vec<Filter>) -> Self {
        Filter::And(children)
    }

    /// Creates an `Or` node.
    pub fn or(children: Vec<Filter>) -> Self {
        Filter::Or(children)
    }

    /// Returns true for an empty `Where`, `And` or `Or`.
    pub fn is_vacuous(&self) -> bool {
        match self {
            Filter::Where(clause) => clause.is_empty(),
            Filter::And(children) | Filter::Or(children) => children.is_empty(),
        }
    }

    /// Parses a filter from its structured JSON form.
    ///
    /// An object whose only key is `AND` or `OR` (holding an array of child
    /// filters) is a logical node; any other object is a [`Where`].
    pub fn from_json(json: &Json) -> DbResult<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| DbError::invalid_filter("filter must be an object"))?;

        let logical = ["AND", "OR"]
            .into_iter()
            .find(|key| object.contains_key(*key));

        let Some(key) = logical else {
            return Ok(Filter::Where(Where::from_json(json)?));
        };
        if object.len() != 1 {
            return Err(DbError::invalid_filter(format!(
                "{key} cannot be combined with other keys"
            )));
        }
        let children = object[key]
            .as_array()
            .ok_or_else(|| DbError::invalid_filter(format!("{key} expects an array")))?
            .iter()
            .map(Filter::from_json)
            .collect::<DbResult<Vec<_>>>()?;

        Ok(if key == "AND" {
            Filter::And(children)
        } else {
            Filter::Or(children)
        })
    }
}

impl From<Where> for Filter {
    fn from(clause: Where) -> Self {
        Filter::Where(clause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_value_is_equality() {
        assert_eq!(
            Matcher::from_json(&json!(5)).unwrap(),
            Matcher::Equals(Value::from(5))
        );
        assert_eq!(
            Matcher::from_json(&json!([1, 2])).unwrap(),
            Matcher::Equals(Value::from(vec![1, 2]))
        );
    }

    #[test]
    fn null_matcher_never_matches() {
        assert_eq!(Matcher::from_json(&json!(null)).unwrap(), Matcher::Never);
    }

    #[test]
    fn tagged_operators() {
        assert_eq!(
            Matcher::from_json(&json!({"gt": 5})).unwrap(),
            Matcher::Gt(Value::from(5))
        );
        assert_eq!(
            Matcher::from_json(&json!({"between": [5, 10]})).unwrap(),
            Matcher::Between(Value::from(5), Value::from(10))
        );
        assert_eq!(
            Matcher::from_json(&json!({"in": ["a", "b"]})).unwrap(),
            Matcher::In(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(
            Matcher::from_json(&json!({"equals": {"gt": 1}})).unwrap(),
            Matcher::Equals(Value::from(json!({"gt": 1})))
        );
    }

    #[test]
    fn plain_object_is_nested() {
        let matcher = Matcher::from_json(&json!({"city": "Oslo", "zip": {"gte": 100}})).unwrap();
        let expected = Where::new().eq("city", "Oslo").gte("zip", 100);
        assert_eq!(matcher, Matcher::Nested(expected));
    }

    #[test]
    fn malformed_matchers_are_rejected() {
        assert!(Matcher::from_json(&json!({"between": [1]})).is_err());
        assert!(Matcher::from_json(&json!({"in": 3})).is_err());
        assert!(Matcher::from_json(&json!({"gt": 1, "lt": 5})).is_err());
        assert!(Matcher::from_json(&json!({"gt": 1, "name": "x"})).is_err());
    }

    #[test]
    fn logical_nodes() {
        let filter = Filter::from_json(&json!({
            "AND": [{"id": "0"}, {"OR": [{"age": {"gt": 999}}, {}]}]
        }))
        .unwrap();

        let expected = Filter::and(vec![
            Where::new().eq("id", "0").into(),
            Filter::or(vec![
                Where::new().gt("age", 999).into(),
                Where::new().into(),
            ]),
        ]);
        assert_eq!(filter, expected);
    }

    #[test]
    fn logical_keys_cannot_mix_with_fields() {
        assert!(Filter::from_json(&json!({"AND": [], "id": 1})).is_err());
        assert!(Filter::from_json(&json!({"OR": {"id": 1}})).is_err());
        assert!(Filter::from_json(&json!([1])).is_err());
    }

    #[test]
    fn where_keeps_insertion_order() {
        let clause = Where::new().eq("b", 1).eq("a", 2).eq("b", 3);
        let names: Vec<_> = clause.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(clause.get("b"), Some(&Matcher::Equals(Value::from(3))));
    }

    #[test]
    fn vacuous_filters() {
        assert!(Filter::Where(Where::new()).is_vacuous());
        assert!(Filter::and(vec![]).is_vacuous());
        assert!(Filter::or(vec![]).is_vacuous());
        assert!(!Filter::or(vec![Where::new().into()]).is_vacuous());
    }
}
