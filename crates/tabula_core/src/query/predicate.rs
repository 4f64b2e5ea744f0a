//! Predicate evaluation over rows.

use crate::query::filter::Filter;
use tabula_value::Row;

impl Filter {
    /// Returns true if the row satisfies the filter.
    ///
    /// `And` stops at the first failing child and `Or` at the first passing
    /// one. Empty nodes are vacuous: an empty `Where` or `And` passes, and so
    /// does an empty `Or`.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::Where(clause) => clause.matches(row),
            Filter::And(children) => children.iter().all(|child| child.matches(row)),
            Filter::Or(children) => {
                children.is_empty() || children.iter().any(|child| child.matches(row))
            }
        }
    }
}

/// Top-level membership test used by queries and live queries.
///
/// No filter admits every row. A vacuous filter (empty `Where`, `And` or
/// `Or`) at the top level admits none.
pub fn admits(filter: Option<&Filter>, row: &Row) -> bool {
    match filter {
        None => true,
        Some(filter) if filter.is_vacuous() => false,
        Some(filter) => filter.matches(row),
    }
}
