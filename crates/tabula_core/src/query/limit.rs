//! Pagination.

use crate::query::model::Limit;
use std::cmp::Ordering;
use std::sync::Arc;
use tabula_value::Row;

/// Applies cursor, skip and take to ordered rows.
///
/// The cursor drops every row before the first one whose primary key is
/// `>=` it. When `key_ordered` is set the rows are sorted by primary key and
/// the cursor is found by binary search; otherwise by linear search.
pub(crate) fn paginate(
    mut rows: Vec<Arc<Row>>,
    limit: &Limit,
    primary_key: &str,
    key_ordered: bool,
) -> Vec<Arc<Row>> {
    let start = match &limit.from {
        None => 0,
        Some(cursor) => {
            let before = |row: &Arc<Row>| row.get(primary_key).total_cmp(cursor) == Ordering::Less;
            if key_ordered {
                rows.partition_point(before)
            } else {
                rows.iter().position(|row| !before(row)).unwrap_or(rows.len())
            }
        }
    };

    let start = start.saturating_add(limit.skip).min(rows.len());
    let end = match limit.take {
        Some(take) => start.saturating_add(take).min(rows.len()),
        None => rows.len(),
    };
    rows.truncate(end);
    rows.drain(..start);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_value::Value;

    fn rows(ids: &[i32]) -> Vec<Arc<Row>> {
        ids.iter()
            .map(|id| Arc::new(Row::new().with("id", *id)))
            .collect()
    }

    fn ids(rows: &[Arc<Row>]) -> Vec<Value> {
        rows.iter().map(|r| r.get("id").clone()).collect()
    }

    fn values(ids: &[i32]) -> Vec<Value> {
        ids.iter().map(|id| Value::from(*id)).collect()
    }

    #[test]
    fn skip_and_take() {
        let out = paginate(rows(&[1, 2, 3, 4, 5]), &Limit::new().skip(1).take(2), "id", true);
        assert_eq!(ids(&out), values(&[2, 3]));

        let out = paginate(rows(&[1, 2]), &Limit::new().skip(5), "id", true);
        assert!(out.is_empty());

        let out = paginate(rows(&[1, 2]), &Limit::new().take(0), "id", true);
        assert!(out.is_empty());
    }

    #[test]
    fn cursor_seeks_first_key_at_or_after() {
        let out = paginate(rows(&[1, 3, 5, 7]), &Limit::new().from(3).take(2), "id", true);
        assert_eq!(ids(&out), values(&[3, 5]));

        let out = paginate(rows(&[1, 3, 5, 7]), &Limit::new().from(4), "id", true);
        assert_eq!(ids(&out), values(&[5, 7]));

        let out = paginate(rows(&[1, 3]), &Limit::new().from(9), "id", true);
        assert!(out.is_empty());
    }

    #[test]
    fn cursor_on_unordered_rows_is_linear() {
        let out = paginate(rows(&[9, 1, 5, 2]), &Limit::new().from(5), "id", false);
        assert_eq!(ids(&out), values(&[9, 1, 5, 2]));

        let out = paginate(rows(&[1, 9, 5, 2]), &Limit::new().from(5).skip(1), "id", false);
        assert_eq!(ids(&out), values(&[5, 2]));
    }
}
