//! Matcher-to-index translation and bounded index scans.

use crate::index::{BucketIndex, Index, IndexKey};
use crate::query::filter::Matcher;
use crate::table::state::{is_key_value, TableState};
use std::collections::BTreeSet;
use std::ops::{Bound, ControlFlow};
use std::sync::Arc;
use tabula_value::{Row, Value};

/// Keys to visit in one index.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum KeyScan {
    /// Point lookups, sorted and deduplicated.
    Points(Vec<IndexKey>),
    /// One contiguous key range.
    Range(Bound<IndexKey>, Bound<IndexKey>),
}

impl KeyScan {
    /// Translates a matcher into the keys it can match.
    ///
    /// Returns `None` when the index could miss a matching row: equality on
    /// arrays or objects (deep equality is order-insensitive), `contains`,
    /// nested matchers, and on secondary indexes equality with null or
    /// undefined (those rows are not indexed). Matchers that can never match
    /// translate to an empty point set.
    pub(crate) fn for_matcher(matcher: &Matcher, primary: bool) -> Option<Self> {
        let scan = match matcher {
            Matcher::Equals(value) => KeyScan::Points(point(value, primary)?.into_iter().collect()),
            Matcher::In(values) => {
                let mut keys = BTreeSet::new();
                for value in values {
                    keys.extend(point(value, primary)?);
                }
                KeyScan::Points(keys.into_iter().collect())
            }
            Matcher::Gt(bound) => one_sided(bound, |k| (Bound::Excluded(k), Bound::Unbounded)),
            Matcher::Gte(bound) => one_sided(bound, |k| (Bound::Included(k), Bound::Unbounded)),
            Matcher::Lt(bound) => one_sided(bound, |k| (Bound::Unbounded, Bound::Excluded(k))),
            Matcher::Lte(bound) => one_sided(bound, |k| (Bound::Unbounded, Bound::Included(k))),
            Matcher::Between(lo, hi) => {
                if lo.is_nullish() || hi.is_nullish() {
                    KeyScan::Points(Vec::new())
                } else {
                    KeyScan::Range(
                        Bound::Included(IndexKey::from(lo)),
                        Bound::Included(IndexKey::from(hi)),
                    )
                }
            }
            Matcher::Never => KeyScan::Points(Vec::new()),
            Matcher::Contains(_) | Matcher::Nested(_) => return None,
        };
        Some(scan)
    }

    fn bounds<'a>(
        lower: &'a Bound<IndexKey>,
        upper: &'a Bound<IndexKey>,
    ) -> (Bound<&'a IndexKey>, Bound<&'a IndexKey>) {
        (lower.as_ref(), upper.as_ref())
    }
}

/// Key for an equality operand. `Some(None)` means no row can match.
fn point(value: &Value, primary: bool) -> Option<Option<IndexKey>> {
    if primary {
        return Some(is_key_value(value).then(|| IndexKey::from(value)));
    }
    if value.is_nullish() || !value.is_scalar() {
        return None;
    }
    Some(Some(IndexKey::from(value)))
}

fn one_sided(
    bound: &Value,
    make: impl FnOnce(IndexKey) -> (Bound<IndexKey>, Bound<IndexKey>),
) -> KeyScan {
    if bound.is_nullish() {
        return KeyScan::Points(Vec::new());
    }
    let (lower, upper) = make(IndexKey::from(bound));
    KeyScan::Range(lower, upper)
}

/// The index a scan reads.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Target<'s> {
    Primary,
    Secondary(&'s BucketIndex),
}

/// A bounded scan over one index.
#[derive(Debug, Clone)]
pub(crate) struct IndexScan<'s> {
    pub field: &'s str,
    target: Target<'s>,
    keys: KeyScan,
}

impl<'s> IndexScan<'s> {
    /// Plans a scan for `field` if it is indexed and the matcher translates.
    pub(crate) fn plan(state: &'s TableState, field: &'s str, matcher: &Matcher) -> Option<Self> {
        let target = if field == state.primary_key() {
            Target::Primary
        } else {
            Target::Secondary(state.secondary(field)?)
        };
        let keys = KeyScan::for_matcher(matcher, matches!(target, Target::Primary))?;
        Some(Self {
            field,
            target,
            keys,
        })
    }

    /// True when candidates come out in primary key order.
    pub(crate) fn is_primary(&self) -> bool {
        matches!(self.target, Target::Primary)
    }

    /// Estimated number of rows the scan yields.
    ///
    /// Exact for point lookups. For ranges on a secondary index, the number
    /// of distinct keys in range is scaled by the average bucket size.
    pub(crate) fn estimate(&self, state: &TableState) -> usize {
        match (&self.keys, self.target) {
            (KeyScan::Points(keys), Target::Primary) => {
                keys.iter().filter(|key| state.primary().has(key)).count()
            }
            (KeyScan::Points(keys), Target::Secondary(index)) => {
                keys.iter().map(|key| index.bucket_len(key)).sum()
            }
            (KeyScan::Range(lower, upper), Target::Primary) => {
                let (lower, upper) = KeyScan::bounds(lower, upper);
                state.primary().count_range(lower, upper)
            }
            (KeyScan::Range(lower, upper), Target::Secondary(index)) => {
                let distinct = index.key_count();
                if distinct == 0 {
                    return 0;
                }
                let (lower, upper) = KeyScan::bounds(lower, upper);
                let in_range = index.keys().count_range(lower, upper);
                (in_range * index.row_count()).div_ceil(distinct)
            }
        }
    }

    /// Visits every candidate row. Stops as soon as `visit` breaks.
    pub(crate) fn run(
        &self,
        state: &TableState,
        visit: &mut dyn FnMut(&Arc<Row>) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        match (&self.keys, self.target) {
            (KeyScan::Points(keys), Target::Primary) => {
                for key in keys {
                    if let Some(row) = state.primary().get(key) {
                        visit(row)?;
                    }
                }
                ControlFlow::Continue(())
            }
            (KeyScan::Points(keys), Target::Secondary(index)) => {
                for key in keys {
                    for row in index.get(key).into_iter().flat_map(|bucket| bucket.values()) {
                        visit(row)?;
                    }
                }
                ControlFlow::Continue(())
            }
            (KeyScan::Range(lower, upper), Target::Primary) => {
                let (lower, upper) = KeyScan::bounds(lower, upper);
                state.primary().range_scan(lower, upper, |_, row| visit(row))
            }
            (KeyScan::Range(lower, upper), Target::Secondary(index)) => {
                let (lower, upper) = KeyScan::bounds(lower, upper);
                index.range_scan(lower, upper, |row| visit(row))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> TableState {
        let mut state = TableState::new("users", "id", &["age".to_string(), "tags".to_string()]);
        let rows = (0..10)
            .map(|i| {
                Row::try_from(json!({"id": i, "age": (i % 5) * 10, "tags": ["t"]})).unwrap()
            })
            .collect();
        state.insert_many(rows).unwrap();
        state
    }

    fn m(json: serde_json::Value) -> Matcher {
        Matcher::from_json(&json).unwrap()
    }

    fn collect(scan: &IndexScan<'_>, state: &TableState) -> Vec<Value> {
        let mut out = Vec::new();
        let _ = scan.run(state, &mut |row| {
            out.push(row.get("id").clone());
            ControlFlow::Continue(())
        });
        out
    }

    #[test]
    fn equality_and_in_are_points() {
        assert_eq!(
            KeyScan::for_matcher(&m(json!({"in": [3, 1, 3]})), false),
            Some(KeyScan::Points(vec![IndexKey::new(1), IndexKey::new(3)]))
        );
        assert_eq!(
            KeyScan::for_matcher(&m(json!("a")), false),
            Some(KeyScan::Points(vec![IndexKey::new("a")]))
        );
    }

    #[test]
    fn untranslatable_matchers() {
        assert_eq!(KeyScan::for_matcher(&m(json!([1, 2])), false), None);
        assert_eq!(KeyScan::for_matcher(&m(json!({"equals": null})), false), None);
        assert_eq!(KeyScan::for_matcher(&m(json!({"in": [1, null]})), false), None);
        assert_eq!(KeyScan::for_matcher(&m(json!({"contains": 1})), false), None);
        assert_eq!(KeyScan::for_matcher(&m(json!({"a": 1})), false), None);
    }

    #[test]
    fn impossible_matchers_scan_nothing() {
        let empty = Some(KeyScan::Points(Vec::new()));
        assert_eq!(KeyScan::for_matcher(&m(json!({"gt": null})), false), empty);
        assert_eq!(KeyScan::for_matcher(&m(json!({"between": [1, null]})), false), empty);
        assert_eq!(KeyScan::for_matcher(&Matcher::Never, false), empty);
        assert_eq!(KeyScan::for_matcher(&m(json!({"equals": null})), true), empty);
        assert_eq!(KeyScan::for_matcher(&m(json!([1])), true), empty);
    }

    #[test]
    fn primary_point_lookup() {
        let state = state();
        let scan = IndexScan::plan(&state, "id", &m(json!({"in": [4, 2, 42]}))).unwrap();
        assert!(scan.is_primary());
        assert_eq!(scan.estimate(&state), 2);
        assert_eq!(collect(&scan, &state), vec![Value::from(2), Value::from(4)]);
    }

    #[test]
    fn secondary_range_yields_buckets() {
        let state = state();
        let scan = IndexScan::plan(&state, "age", &m(json!({"between": [10, 20]}))).unwrap();
        assert!(!scan.is_primary());
        assert_eq!(scan.estimate(&state), 4);
        assert_eq!(
            collect(&scan, &state),
            vec![Value::from(1), Value::from(6), Value::from(2), Value::from(7)]
        );
    }

    #[test]
    fn range_estimates() {
        let state = state();
        let gt = IndexScan::plan(&state, "id", &m(json!({"gt": 6}))).unwrap();
        assert_eq!(gt.estimate(&state), 3);
        let lt = IndexScan::plan(&state, "age", &m(json!({"lt": 10}))).unwrap();
        assert_eq!(lt.estimate(&state), 2);

        let empty = TableState::new("empty", "id", &["age".to_string()]);
        let scan = IndexScan::plan(&empty, "age", &m(json!({"gt": 1}))).unwrap();
        assert_eq!(scan.estimate(&empty), 0);
    }

    #[test]
    fn unindexed_or_untranslatable_fields_have_no_plan() {
        let state = state();
        assert!(IndexScan::plan(&state, "name", &m(json!("x"))).is_none());
        assert!(IndexScan::plan(&state, "tags", &m(json!({"contains": "t"}))).is_none());
    }

    #[test]
    fn scan_honours_cancel() {
        let state = state();
        let scan = IndexScan::plan(&state, "id", &m(json!({"gte": 0}))).unwrap();
        let mut seen = 0;
        let flow = scan.run(&state, &mut |_| {
            seen += 1;
            if seen == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(flow, ControlFlow::Break(()));
        assert_eq!(seen, 3);
    }
}
