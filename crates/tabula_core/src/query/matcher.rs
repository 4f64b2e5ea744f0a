//! Matcher evaluation.
//!
//! Ordering matchers (`gt`, `gte`, `lt`, `lte`, `between`) compare only
//! values of the same type class, using [`Value::class_cmp`]. A null or
//! undefined value or bound never satisfies an ordering matcher, so
//! `null >= null` and `null >= 0` are both false.

use crate::query::filter::{Matcher, Where};
use std::cmp::Ordering;
use tabula_value::{Row, Value};

impl Matcher {
    /// Returns true if `value` satisfies this matcher.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Matcher::Equals(expected) => value.deep_eq(expected),
            Matcher::Gt(bound) => value.class_cmp(bound) == Some(Ordering::Greater),
            Matcher::Gte(bound) => matches!(
                value.class_cmp(bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Matcher::Lt(bound) => value.class_cmp(bound) == Some(Ordering::Less),
            Matcher::Lte(bound) => matches!(
                value.class_cmp(bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Matcher::Between(lo, hi) => {
                matches!(
                    value.class_cmp(lo),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(value.class_cmp(hi), Some(Ordering::Less | Ordering::Equal))
            }
            Matcher::In(candidates) => candidates.iter().any(|c| value.deep_eq(c)),
            Matcher::Contains(element) => value
                .as_array()
                .is_some_and(|items| items.iter().any(|item| item.deep_eq(element))),
            Matcher::Nested(clause) => {
                value.as_object().is_some() && clause.matches_fields(|name| value.get(name))
            }
            Matcher::Never => false,
        }
    }
}

impl Where {
    /// Returns true if every field matcher passes against the row.
    ///
    /// An empty `Where` matches every row here; the top-level rule that an
    /// empty filter selects nothing is applied by [`admits`](super::admits).
    pub fn matches(&self, row: &Row) -> bool {
        self.matches_fields(|name| row.get(name))
    }

    fn matches_fields<'v>(&self, get: impl Fn(&str) -> &'v Value) -> bool {
        self.iter().all(|(name, matcher)| matcher.matches(get(name)))
    }
}
