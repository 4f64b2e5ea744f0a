//! Index selection and candidate scans.

use crate::index::IndexKey;
use crate::query::analyze::analyze;
use crate::query::filter::{Filter, Where};
use crate::query::scan::IndexScan;
use crate::table::state::TableState;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use tabula_value::Row;

/// The access path a selection took.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanReport {
    /// Indexed fields that were scanned, in scan order.
    pub indexes: Vec<String>,
    /// True when every row of the primary index was visited.
    pub full_scan: bool,
    /// True when candidates were emitted in primary key order.
    pub key_ordered: bool,
}

/// How candidates for a filter are produced.
#[derive(Debug)]
pub(crate) enum Access<'s> {
    /// No candidates.
    Nothing,
    /// One bounded index scan.
    Index(IndexScan<'s>),
    /// Union of several accesses, deduplicated by primary key.
    Union(Vec<Access<'s>>),
    /// Every row.
    FullScan,
}

impl<'s> Access<'s> {
    /// Chooses the access path for a top-level filter.
    ///
    /// A vacuous top-level filter selects nothing.
    pub(crate) fn plan(state: &'s TableState, filter: &'s Filter) -> Self {
        if filter.is_vacuous() {
            Access::Nothing
        } else {
            choose(state, filter)
        }
    }

    pub(crate) fn is_full_scan(&self) -> bool {
        matches!(self, Access::FullScan)
    }

    pub(crate) fn is_key_ordered(&self) -> bool {
        match self {
            Access::Index(scan) => scan.is_primary(),
            _ => true,
        }
    }

    /// Visits candidate rows. Stops as soon as `visit` breaks.
    pub(crate) fn run(
        &self,
        state: &TableState,
        visit: &mut dyn FnMut(&Arc<Row>) -> ControlFlow<()>,
    ) -> ScanReport {
        let mut report = ScanReport {
            key_ordered: self.is_key_ordered(),
            ..ScanReport::default()
        };
        let _ = self.run_into(state, visit, &mut report);
        report
    }

    fn run_into(
        &self,
        state: &TableState,
        visit: &mut dyn FnMut(&Arc<Row>) -> ControlFlow<()>,
        report: &mut ScanReport,
    ) -> ControlFlow<()> {
        match self {
            Access::Nothing => ControlFlow::Continue(()),
            Access::Index(scan) => {
                report.indexes.push(scan.field.to_string());
                scan.run(state, visit)
            }
            Access::FullScan => {
                report.full_scan = true;
                for row in state.primary().values() {
                    visit(row)?;
                }
                ControlFlow::Continue(())
            }
            Access::Union(parts) => {
                let primary_key = state.primary_key();
                let mut candidates: BTreeMap<IndexKey, Arc<Row>> = BTreeMap::new();
                for part in parts {
                    let _ = part.run_into(
                        state,
                        &mut |row| {
                            candidates
                                .entry(IndexKey::from(row.get(primary_key)))
                                .or_insert_with(|| Arc::clone(row));
                            ControlFlow::Continue(())
                        },
                        report,
                    );
                }
                for row in candidates.values() {
                    visit(row)?;
                }
                ControlFlow::Continue(())
            }
        }
    }
}

fn choose<'s>(state: &'s TableState, filter: &'s Filter) -> Access<'s> {
    match filter {
        Filter::Where(clause) => choose_where(state, clause),
        Filter::And(children) => {
            let cheapest = children
                .iter()
                .filter_map(|child| analyze(state, child).map(|cost| (cost, child)))
                .min_by_key(|(cost, _)| *cost);
            match cheapest {
                Some((_, child)) => choose(state, child),
                None => Access::FullScan,
            }
        }
        Filter::Or(children) => {
            let parts: Vec<Access<'s>> = children.iter().map(|c| choose(state, c)).collect();
            if parts.is_empty() || parts.iter().any(Access::is_full_scan) {
                Access::FullScan
            } else {
                Access::Union(parts)
            }
        }
    }
}

/// Primary key first, then the first indexed field in clause order.
fn choose_where<'s>(state: &'s TableState, clause: &'s Where) -> Access<'s> {
    let primary_key = state.primary_key();
    if let Some(scan) = clause
        .get(primary_key)
        .and_then(|matcher| IndexScan::plan(state, primary_key, matcher))
    {
        return Access::Index(scan);
    }
    clause
        .iter()
        .filter(|(field, _)| *field != primary_key)
        .find_map(|(field, matcher)| IndexScan::plan(state, field, matcher))
        .map_or(Access::FullScan, Access::Index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabula_value::Value;

    fn select(
        state: &TableState,
        filter: &Filter,
        visit: &mut dyn FnMut(&Arc<Row>) -> ControlFlow<()>,
    ) -> ScanReport {
        Access::plan(state, filter).run(state, visit)
    }

    fn state() -> TableState {
        let mut state = TableState::new("users", "id", &["age".to_string(), "city".to_string()]);
        let rows = (0..20)
            .map(|i| {
                Row::try_from(json!({
                    "id": i,
                    "age": i % 4,
                    "city": if i % 2 == 0 { "Oslo" } else { "Rome" },
                    "name": format!("u{i}"),
                }))
                .unwrap()
            })
            .collect();
        state.insert_many(rows).unwrap();
        state
    }

    fn run(state: &TableState, filter: serde_json::Value) -> (Vec<Value>, ScanReport) {
        let filter = Filter::from_json(&filter).unwrap();
        let mut ids = Vec::new();
        let report = select(state, &filter, &mut |row| {
            ids.push(row.get("id").clone());
            ControlFlow::Continue(())
        });
        (ids, report)
    }

    #[test]
    fn where_prefers_primary_key() {
        let state = state();
        let (ids, report) = run(&state, json!({"age": 1, "id": 5}));
        assert_eq!(ids, vec![Value::from(5)]);
        assert_eq!(report.indexes, vec!["id".to_string()]);
        assert!(!report.full_scan);
    }

    #[test]
    fn where_falls_back_to_first_secondary() {
        let state = state();
        let (ids, report) = run(&state, json!({"age": 1, "city": "Rome"}));
        assert_eq!(ids.len(), 5);
        assert_eq!(report.indexes, vec!["age".to_string()]);
        assert!(!report.key_ordered);
    }

    #[test]
    fn unindexed_where_is_full_scan() {
        let state = state();
        let (ids, report) = run(&state, json!({"name": "u3"}));
        assert_eq!(ids.len(), 20);
        assert!(report.full_scan);
        assert!(report.indexes.is_empty());
    }

    #[test]
    fn empty_filters_select_nothing() {
        let state = state();
        for filter in [json!({}), json!({"AND": []}), json!({"OR": []})] {
            let (ids, report) = run(&state, filter);
            assert!(ids.is_empty());
            assert!(!report.full_scan);
        }
    }

    #[test]
    fn and_scans_only_cheapest_branch() {
        let state = state();
        let (ids, report) = run(&state, json!({"AND": [{"id": "0"}, {"age": {"gt": 999}}]}));
        assert!(ids.is_empty());
        assert_eq!(report.indexes, vec!["id".to_string()]);

        let (ids, report) = run(&state, json!({"AND": [{"city": "Oslo"}, {"age": 3}]}));
        assert_eq!(ids.len(), 5);
        assert_eq!(report.indexes, vec!["age".to_string()]);
    }

    #[test]
    fn and_without_indexed_branch_is_full_scan() {
        let state = state();
        let (ids, report) = run(&state, json!({"AND": [{"name": "u1"}, {}]}));
        assert_eq!(ids.len(), 20);
        assert!(report.full_scan);
    }

    #[test]
    fn or_unions_and_deduplicates() {
        let state = state();
        let (ids, report) = run(&state, json!({"OR": [{"id": 10}, {"age": 2}, {"id": {"in": [2, 6]}}]}));
        let expected: Vec<Value> = [2, 6, 10, 14, 18].into_iter().map(Value::from).collect();
        assert_eq!(ids, expected);
        assert!(report.key_ordered);
        assert!(!report.full_scan);
    }

    #[test]
    fn or_with_unindexed_branch_degrades_to_full_scan() {
        let state = state();
        let (ids, report) = run(&state, json!({"OR": [{"id": 10}, {"name": "u3"}]}));
        assert_eq!(ids.len(), 20);
        assert!(report.full_scan);
        assert!(report.indexes.is_empty());
    }

    #[test]
    fn nested_or_inside_and() {
        let state = state();
        let (ids, report) = run(
            &state,
            json!({"AND": [{"name": "u4"}, {"OR": [{"id": 4}, {"id": 5}]}]}),
        );
        assert_eq!(ids, vec![Value::from(4), Value::from(5)]);
        assert_eq!(report.indexes, vec!["id".to_string(), "id".to_string()]);
    }

    #[test]
    fn cancel_stops_full_scan() {
        let state = state();
        let filter = Filter::from_json(&json!({"name": "x"})).unwrap();
        let mut seen = 0;
        select(&state, &filter, &mut |_| {
            seen += 1;
            if seen == 4 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(seen, 4);
    }
}
