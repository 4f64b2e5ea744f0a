//! Index cost analysis.
//!
//! Estimates how many rows an index-driven scan of a filter subtree would
//! produce. `None` means no index applies and the subtree needs a full table
//! scan.

use crate::query::filter::{Filter, Where};
use crate::query::scan::IndexScan;
use crate::table::state::TableState;

/// Estimated candidate rows for scanning `filter` through indexes.
///
/// - `Where`: the cheapest indexed field
/// - `And`: the cheapest child, since only that branch is scanned
/// - `Or`: the sum of children; any unindexable child makes the whole `Or`
///   unindexable
///
/// Empty nodes have no estimate.
pub(crate) fn analyze(state: &TableState, filter: &Filter) -> Option<usize> {
    match filter {
        Filter::Where(clause) => analyze_where(state, clause),
        Filter::And(children) => children
            .iter()
            .filter_map(|child| analyze(state, child))
            .min(),
        Filter::Or(children) if children.is_empty() => None,
        Filter::Or(children) => children.iter().try_fold(0usize, |total, child| {
            analyze(state, child).map(|cost| total.saturating_add(cost))
        }),
    }
}

fn analyze_where(state: &TableState, clause: &Where) -> Option<usize> {
    clause
        .iter()
        .filter_map(|(field, matcher)| IndexScan::plan(state, field, matcher))
        .map(|scan| scan.estimate(state))
        .min()
}
