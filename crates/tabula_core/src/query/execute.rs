//! Query orchestration: select, re-check, sort, paginate.

use crate::error::{DbError, DbResult};
use crate::query::analyze::analyze;
use crate::query::limit::paginate;
use crate::query::model::Query;
use crate::query::select::{Access, ScanReport};
use crate::query::sort::RowOrder;
use crate::table::state::TableState;
use std::ops::ControlFlow;
use std::sync::Arc;
use tabula_value::Row;

/// Result of running a query.
#[derive(Debug)]
pub(crate) struct Execution {
    pub rows: Vec<Arc<Row>>,
    pub report: ScanReport,
    /// Candidate rows visited before the re-check.
    pub scanned: usize,
}

/// Runs a query against the table's indexes.
///
/// With `forbid_full_scans`, a filter that needs a full table scan fails
/// before any row is visited. A query without a filter reads the primary
/// index in order and is always allowed.
pub(crate) fn execute(
    state: &TableState,
    query: &Query,
    forbid_full_scans: bool,
) -> DbResult<Execution> {
    let order = RowOrder::new(query.sort.clone(), state.primary_key());

    let (mut rows, report, scanned) = match &query.filter {
        None => {
            let rows: Vec<Arc<Row>> = state.primary().values().cloned().collect();
            let scanned = rows.len();
            let report = ScanReport {
                indexes: Vec::new(),
                full_scan: true,
                key_ordered: true,
            };
            (rows, report, scanned)
        }
        Some(filter) => {
            let access = Access::plan(state, filter);
            if forbid_full_scans && access.is_full_scan() {
                return Err(DbError::full_scan_forbidden(state.name()));
            }

            // Without an explicit sort a key-ordered scan can stop early.
            let cap = match &query.limit {
                Some(limit)
                    if order.is_key_order() && access.is_key_ordered() && limit.from.is_none() =>
                {
                    limit.take.map(|take| limit.skip.saturating_add(take))
                }
                _ => None,
            };

            let mut rows = Vec::new();
            let mut scanned = 0;
            let report = access.run(state, &mut |row| {
                if cap.is_some_and(|cap| rows.len() >= cap) {
                    return ControlFlow::Break(());
                }
                scanned += 1;
                if filter.matches(row) {
                    rows.push(Arc::clone(row));
                }
                ControlFlow::Continue(())
            });
            (rows, report, scanned)
        }
    };

    if !order.is_key_order() || !report.key_ordered {
        order.sort(&mut rows);
    }

    if let Some(limit) = &query.limit {
        rows = paginate(rows, limit, state.primary_key(), order.is_key_order());
    }

    Ok(Execution {
        rows,
        report,
        scanned,
    })
}

/// Counts matching rows without materialising them when an index estimate
/// is available.
///
/// The estimate is capped at the table size. Filters with no usable index
/// are counted exactly.
pub(crate) fn estimate(
    state: &TableState,
    query: &Query,
    forbid_full_scans: bool,
) -> DbResult<usize> {
    let estimated = match &query.filter {
        None => Some(state.len()),
        Some(filter) if filter.is_vacuous() => Some(0),
        Some(filter) => analyze(state, filter),
    };
    match estimated {
        Some(count) => Ok(count.min(state.len())),
        None => Ok(execute(state, query, forbid_full_scans)?.rows.len()),
    }
}
