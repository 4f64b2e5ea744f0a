//! Live queries.
//!
//! [`Table::watch`] runs a query once, hands the result to a callback, and
//! then keeps that result up to date from the table's change events. The
//! unpaginated result is maintained incrementally:
//!
//! - inserted rows that match are placed at their sorted position
//! - updated rows are removed, inserted, or patched depending on whether the
//!   old and new versions match (a changed sort key moves the row)
//! - removed rows are dropped by primary key
//! - a clear empties the result
//!
//! The callback receives the paginated view whenever a change affected the
//! result. A clear always notifies.
//!
//! ```rust,ignore
//! let handle = users.watch(Query::new().filter(Where::new().gt("age", 5)), |rows| {
//!     println!("{} adults", rows.len());
//! })?;
//! users.insert(row)?;
//! handle.dispose();
//! ```

use crate::change_feed::{Change, ChangeEvent, ChangeKind, SubscriptionId};
use crate::error::DbResult;
use crate::query::execute::{execute, Execution};
use crate::query::limit::paginate;
use crate::query::sort::RowOrder;
use crate::query::{admits, Filter, Limit, Query};
use crate::stats::TableStats;
use crate::table::{Table, TableInner};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};
use tabula_value::Row;
use tracing::{debug, trace};

/// Callback invoked with the current view of a live query.
pub type WatchCallback = Box<dyn Fn(&[Arc<Row>]) + Send + Sync>;

/// The maintained result of a live query.
#[derive(Debug)]
struct LiveQuery {
    filter: Option<Filter>,
    order: RowOrder,
    limit: Option<Limit>,
    primary_key: String,
    rows: Vec<Arc<Row>>,
    /// Sequence of the last event reflected in `rows`.
    since: u64,
}

impl LiveQuery {
    fn new(query: &Query, primary_key: &str, seed: Execution, since: u64) -> Self {
        Self {
            filter: query.filter.clone(),
            order: RowOrder::new(query.sort.clone(), primary_key),
            limit: query.limit.clone(),
            primary_key: primary_key.to_string(),
            rows: seed.rows,
            since,
        }
    }

    /// Applies an event. Returns true if the watcher should be notified.
    fn apply(&mut self, event: &ChangeEvent) -> bool {
        if event.sequence <= self.since {
            return false;
        }
        self.since = event.sequence;

        match &event.kind {
            ChangeKind::Insert(rows) => {
                let mut changed = false;
                for row in rows {
                    if !self.admits(row) {
                        continue;
                    }
                    self.remove(row);
                    self.insert(row);
                    changed = true;
                }
                changed
            }
            ChangeKind::Update(changes) => changes
                .iter()
                .fold(false, |changed, change| self.update(change) || changed),
            ChangeKind::Remove(rows) => rows
                .iter()
                .fold(false, |changed, row| self.remove(row) || changed),
            ChangeKind::Clear => {
                self.rows.clear();
                true
            }
        }
    }

    fn update(&mut self, change: &Change) -> bool {
        match (self.admits(&change.old), self.admits(&change.new)) {
            (false, false) => false,
            (true, false) => self.remove(&change.old),
            (false, true) => {
                self.remove(&change.new);
                self.insert(&change.new);
                true
            }
            (true, true) => {
                match self.locate(&change.old) {
                    Some(at) if !self.sort_key_changed(&change.old, &change.new) => {
                        self.rows[at] = Arc::clone(&change.new);
                    }
                    _ => {
                        self.remove(&change.old);
                        self.insert(&change.new);
                    }
                }
                true
            }
        }
    }

    fn admits(&self, row: &Row) -> bool {
        admits(self.filter.as_ref(), row)
    }

    fn insert(&mut self, row: &Arc<Row>) {
        let at = self.order.insertion_point(&self.rows, row);
        self.rows.insert(at, Arc::clone(row));
    }

    fn remove(&mut self, row: &Row) -> bool {
        match self.locate(row) {
            Some(at) => {
                self.rows.remove(at);
                true
            }
            None => false,
        }
    }

    /// Finds the entry with `row`'s primary key. Tries the sorted position
    /// first, since the stored entry usually sorts like `row`.
    fn locate(&self, row: &Row) -> Option<usize> {
        let key = row.get(&self.primary_key);
        let same_key = |entry: &Arc<Row>| entry.get(&self.primary_key).total_cmp(key) == Ordering::Equal;

        let at = self.order.insertion_point(&self.rows, row);
        if self.rows.get(at).is_some_and(same_key) {
            return Some(at);
        }
        self.rows.iter().position(same_key)
    }

    fn sort_key_changed(&self, old: &Row, new: &Row) -> bool {
        self.order
            .sort_key()
            .is_some_and(|key| old.get(key).total_cmp(new.get(key)) != Ordering::Equal)
    }

    /// The result with pagination applied.
    fn view(&self) -> Vec<Arc<Row>> {
        match &self.limit {
            Some(limit) => paginate(
                self.rows.clone(),
                limit,
                &self.primary_key,
                self.order.is_key_order(),
            ),
            None => self.rows.clone(),
        }
    }
}

/// A registered live query.
struct Watcher {
    table: String,
    live: Mutex<LiveQuery>,
    callback: WatchCallback,
    active: AtomicBool,
    stats: Arc<TableStats>,
}

impl Watcher {
    fn on_event(&self, event: &ChangeEvent) {
        if !self.is_active() {
            return;
        }
        let view = {
            let mut live = self.live.lock();
            if !live.apply(event) {
                return;
            }
            live.view()
        };
        trace!(table = %self.table, sequence = event.sequence, rows = view.len(), "live query changed");
        self.notify(&view);
    }

    /// Runs the callback without holding any lock, so it may use the table.
    fn notify(&self, view: &[Arc<Row>]) {
        if !self.is_active() {
            return;
        }
        self.stats.record_notification();
        (self.callback)(view);
    }

    fn is_active(&self) -> bool {
        self.active.load(AtomicOrdering::Acquire)
    }
}

/// Handle to a live query.
///
/// Dropping the handle disposes the live query.
#[must_use = "dropping a WatchHandle disposes the live query"]
pub struct WatchHandle {
    id: SubscriptionId,
    watcher: Arc<Watcher>,
    table: Weak<TableInner>,
}

impl WatchHandle {
    /// Stops the live query. No notification is delivered afterwards, also
    /// when called from inside the callback.
    pub fn dispose(self) {}

    /// Returns false once the live query has been disposed.
    pub fn is_active(&self) -> bool {
        self.watcher.is_active()
    }

    /// Returns the current view without waiting for a notification.
    pub fn rows(&self) -> Vec<Arc<Row>> {
        self.watcher.live.lock().view()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if !self.watcher.active.swap(false, AtomicOrdering::AcqRel) {
            return;
        }
        if let Some(table) = self.table.upgrade() {
            table.feed.unsubscribe(self.id);
        }
        debug!(table = %self.watcher.table, "live query disposed");
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("table", &self.watcher.table)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl Table {
    /// Registers a live query.
    ///
    /// The callback runs once immediately with the current result, then after
    /// every change that affects it. Callbacks run on the mutating thread and
    /// may use the table; a panic propagates out of the mutating call.
    ///
    /// # Errors
    ///
    /// `FullScanForbidden` in strict mode when no index serves the filter.
    pub fn watch<F>(&self, query: Query, callback: F) -> DbResult<WatchHandle>
    where
        F: Fn(&[Arc<Row>]) + Send + Sync + 'static,
    {
        let inner = &self.inner;
        // Seed and subscribe with no event in between.
        let _dispatch = inner.dispatch.lock();

        let seed_query = query.unlimited();
        let (execution, since) = {
            let state = inner.state.read();
            let execution = execute(&state, &seed_query, inner.config.forbid_full_scans)?;
            (execution, state.sequence())
        };
        self.record(&seed_query, &execution);

        let live = LiveQuery::new(&query, &inner.primary_key, execution, since);
        let view = live.view();
        let watcher = Arc::new(Watcher {
            table: inner.name.clone(),
            live: Mutex::new(live),
            callback: Box::new(callback),
            active: AtomicBool::new(true),
            stats: Arc::clone(&inner.stats),
        });

        let listener = Arc::clone(&watcher);
        let id = inner
            .feed
            .subscribe(Arc::new(move |event: &ChangeEvent| listener.on_event(event)));
        debug!(table = %inner.name, rows = view.len(), "live query registered");

        let handle = WatchHandle {
            id,
            watcher,
            table: Arc::downgrade(inner),
        };
        handle.watcher.notify(&view);
        Ok(handle)
    }
}
