//! Row ordering.

use crate::query::model::{Order, SortSpec};
use std::cmp::Ordering;
use std::sync::Arc;
use tabula_value::Row;

/// Comparator shared by queries and live queries.
///
/// Rows compare by the sort key (total order, reversed for descending) and
/// then by primary key ascending. Without a sort key, rows compare by
/// primary key only.
#[derive(Debug, Clone)]
pub(crate) struct RowOrder {
    sort: Option<SortSpec>,
    primary_key: String,
}

impl RowOrder {
    pub(crate) fn new(sort: Option<SortSpec>, primary_key: &str) -> Self {
        Self {
            sort,
            primary_key: primary_key.to_string(),
        }
    }

    /// True when rows are ordered by primary key alone.
    pub(crate) fn is_key_order(&self) -> bool {
        self.sort.is_none()
    }

    pub(crate) fn sort_key(&self) -> Option<&str> {
        self.sort.as_ref().map(|sort| sort.key.as_str())
    }

    pub(crate) fn compare(&self, a: &Row, b: &Row) -> Ordering {
        let by_sort = match &self.sort {
            Some(SortSpec { key, order }) => {
                let ord = a.get(key).total_cmp(b.get(key));
                match order {
                    Order::Asc => ord,
                    Order::Desc => ord.reverse(),
                }
            }
            None => Ordering::Equal,
        };
        by_sort.then_with(|| {
            a.get(&self.primary_key)
                .total_cmp(b.get(&self.primary_key))
        })
    }

    /// Stable sort.
    pub(crate) fn sort(&self, rows: &mut [Arc<Row>]) {
        rows.sort_by(|a, b| self.compare(a, b));
    }

    /// Index at which `row` keeps `rows` ordered.
    pub(crate) fn insertion_point(&self, rows: &[Arc<Row>], row: &Row) -> usize {
        rows.partition_point(|existing| self.compare(existing, row) == Ordering::Less)
    }
}
