//! Tables.
//!
//! A [`Table`] is a cheap, clonable handle to one table's indexes. Every
//! operation is described as an [`Operation`], passed through the hook
//! chain, and finally performed against the indexes:
//!
//! - mutations validate the whole batch, update every index under the write
//!   lock, then emit a change event after the lock is released
//! - reads run the query orchestrator under the read lock
//!
//! ```rust,ignore
//! let users = db.create_table("users", TableConfig::new().index("age"))?;
//! users.insert(Row::new().with("id", 1).with("age", 30))?;
//!
//! let adults = users.many(Query::new().filter(Where::new().gte("age", 18)))?;
//! ```

pub(crate) mod state;

use crate::change_feed::{ChangeEvent, ChangeFeed, ChangeKind};
use crate::config::{Config, TableConfig};
use crate::error::{DbError, DbResult};
use crate::hook::{Hook, HookContext, Next, Operation, Outcome};
use crate::index::IndexKey;
use crate::query::execute::{estimate, execute, Execution};
use crate::query::{CountOptions, Filter, Limit, Lookup, Query, ScanReport};
use crate::stats::{StatsSnapshot, TableStats};
use parking_lot::{ReentrantMutex, RwLock};
use state::TableState;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tabula_value::{Row, Value};
use tracing::{debug, trace, warn};

/// Shared, ordered list of hooks.
pub(crate) type HookList = Arc<RwLock<Vec<Arc<dyn Hook>>>>;

pub(crate) struct TableInner {
    pub(crate) name: String,
    pub(crate) primary_key: String,
    pub(crate) indexes: Vec<String>,
    pub(crate) config: Arc<Config>,
    pub(crate) state: RwLock<TableState>,
    /// Serialises mutation+emit and watch registration per table. Reentrant
    /// so listeners and hooks may call back into the table.
    pub(crate) dispatch: ReentrantMutex<()>,
    pub(crate) feed: ChangeFeed,
    pub(crate) hooks: RwLock<Vec<Arc<dyn Hook>>>,
    pub(crate) database_hooks: HookList,
    pub(crate) stats: Arc<TableStats>,
}

/// Handle to a table.
///
/// Clones share the same table.
#[derive(Clone)]
pub struct Table {
    pub(crate) inner: Arc<TableInner>,
}

impl Table {
    pub(crate) fn new(
        name: &str,
        table_config: &TableConfig,
        config: Arc<Config>,
        database_hooks: HookList,
    ) -> DbResult<Self> {
        if name.is_empty() {
            return Err(DbError::invalid_config("table name is empty"));
        }
        let (primary_key, indexes) = table_config.resolve(&config)?;
        debug!(table = name, primary_key = %primary_key, indexes = ?indexes, "creating table");

        let state = TableState::new(name, &primary_key, &indexes);
        Ok(Self {
            inner: Arc::new(TableInner {
                name: name.to_string(),
                primary_key,
                indexes,
                config,
                state: RwLock::new(state),
                dispatch: ReentrantMutex::new(()),
                feed: ChangeFeed::new(),
                hooks: RwLock::new(Vec::new()),
                database_hooks,
                stats: Arc::new(TableStats::new()),
            }),
        })
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the primary key field.
    pub fn primary_key(&self) -> &str {
        &self.inner.primary_key
    }

    /// Returns the secondary index fields.
    pub fn indexes(&self) -> &[String] {
        &self.inner.indexes
    }

    /// Adds a table-local hook. It runs after all database hooks.
    pub fn add_hook(&self, hook: impl Hook + 'static) {
        self.inner.hooks.write().push(Arc::new(hook));
    }

    /// Returns the primary key value of a row.
    pub fn key(&self, row: &Row) -> Value {
        row.get(&self.inner.primary_key).clone()
    }

    /// Inserts a row, returning its primary key.
    ///
    /// # Errors
    ///
    /// `PrimaryKeyAlreadyInUse` if the key exists, `InvalidPrimaryKey` if it
    /// is missing or not text or a number.
    pub fn insert(&self, row: Row) -> DbResult<Value> {
        single(self.insert_many(vec![row])?, "insert")
    }

    /// Inserts rows. Either every row is inserted or none is.
    pub fn insert_many(&self, rows: Vec<Row>) -> DbResult<Vec<Value>> {
        self.dispatch(Operation::Insert(rows))?.into_keys("insert")
    }

    /// Merges a diff into the stored row with the same primary key.
    ///
    /// # Errors
    ///
    /// `InvalidPrimaryKey` if the diff has no valid key, `ItemNotFound` if no
    /// row has it.
    pub fn update(&self, diff: Row) -> DbResult<Value> {
        single(self.update_many(vec![diff])?, "update")
    }

    /// Merges diffs. Either every diff is applied or none is.
    pub fn update_many(&self, diffs: Vec<Row>) -> DbResult<Vec<Value>> {
        self.dispatch(Operation::Update(diffs))?.into_keys("update")
    }

    /// Replaces every row matching `filter` with `f(row)`.
    ///
    /// Returns the number of rows replaced.
    ///
    /// # Errors
    ///
    /// `PrimaryKeyCannotBeModified` if `f` changes a row's primary key; no
    /// row is changed in that case.
    pub fn update_where<F>(&self, filter: &Filter, mut f: F) -> DbResult<usize>
    where
        F: FnMut(&Row) -> Row,
    {
        let matching = self.read(&Query::new().filter(filter.clone()))?;
        if matching.is_empty() {
            return Ok(0);
        }

        let mut replacements = Vec::with_capacity(matching.len());
        for old in &matching {
            let new = f(old);
            let old_key = old.get(&self.inner.primary_key);
            if IndexKey::from(new.get(&self.inner.primary_key)) != IndexKey::from(old_key) {
                return Err(DbError::key_modified(&self.inner.name, old_key.clone()));
            }
            replacements.push(new);
        }

        let keys = self
            .dispatch(Operation::Replace(replacements))?
            .into_keys("replace")?;
        Ok(keys.len())
    }

    /// Inserts the row, or merges it into the existing row with its key.
    pub fn upsert(&self, row: Row) -> DbResult<Value> {
        single(self.upsert_many(vec![row])?, "upsert")
    }

    /// Upserts rows. Returned keys follow input order.
    pub fn upsert_many(&self, rows: Vec<Row>) -> DbResult<Vec<Value>> {
        self.dispatch(Operation::Upsert(rows))?.into_keys("upsert")
    }

    /// Removes a row by primary key. Returns false if it was absent.
    pub fn remove(&self, key: impl Into<Value>) -> DbResult<bool> {
        self.remove_many(vec![key.into()])
    }

    /// Removes rows by primary key. Returns true only if every key was found.
    pub fn remove_many(&self, keys: Vec<Value>) -> DbResult<bool> {
        let requested = keys.len();
        let removed = self
            .dispatch(Operation::Remove(keys))?
            .into_removed("remove")?;
        Ok(removed == requested)
    }

    /// Removes every row matching `filter`, returning how many were removed.
    pub fn remove_where(&self, filter: &Filter) -> DbResult<usize> {
        let keys: Vec<Value> = self
            .read(&Query::new().filter(filter.clone()))?
            .iter()
            .map(|row| self.key(row))
            .collect();
        if keys.is_empty() {
            return Ok(0);
        }
        self.dispatch(Operation::Remove(keys))?
            .into_removed("remove")
    }

    /// Removes every row.
    pub fn clear(&self) -> DbResult<()> {
        self.dispatch(Operation::Clear)?.into_cleared("clear")
    }

    /// Runs a query.
    pub fn many(&self, query: Query) -> DbResult<Vec<Arc<Row>>> {
        self.dispatch(Operation::Many(query))?.into_rows("many")
    }

    /// Returns the first row of a lookup, or `None`.
    pub fn first(&self, lookup: impl Into<Lookup>) -> DbResult<Option<Arc<Row>>> {
        self.dispatch(Operation::First(lookup.into()))?
            .into_row("first")
    }

    /// Returns the row with this primary key, or `None`.
    pub fn get(&self, key: impl Into<Value>) -> DbResult<Option<Arc<Row>>> {
        self.first(Lookup::Key(key.into()))
    }

    /// Returns the single row of a lookup.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` when nothing matches, `MoreThanOneItemFound` when a
    /// query matches several rows.
    pub fn one(&self, lookup: impl Into<Lookup>) -> DbResult<Arc<Row>> {
        self.dispatch(Operation::One(lookup.into()))?
            .into_row("one")?
            .ok_or_else(|| DbError::item_not_found(&self.inner.name))
    }

    /// Counts rows matching `filter` (all rows when `None`).
    ///
    /// An inexact count uses the index cost estimate, capped at the table
    /// size, and counts exactly when no index applies.
    pub fn count(&self, filter: Option<&Filter>, options: CountOptions) -> DbResult<usize> {
        self.dispatch(Operation::Count(filter.cloned(), options))?
            .into_count("count")
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.inner.state.read().len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs a query and reports which access path served it.
    pub fn explain(&self, query: &Query) -> DbResult<ScanReport> {
        let state = self.inner.state.read();
        Ok(execute(&state, query, self.inner.config.forbid_full_scans)?.report)
    }

    /// Subscribes to change events through a channel.
    pub fn changes(&self) -> Receiver<ChangeEvent> {
        self.inner.feed.channel()
    }

    /// Returns a snapshot of the table statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    fn dispatch(&self, op: Operation) -> DbResult<Outcome> {
        let hooks: Vec<Arc<dyn Hook>> = {
            let database_hooks = self.inner.database_hooks.read();
            let table_hooks = self.inner.hooks.read();
            database_hooks.iter().chain(table_hooks.iter()).cloned().collect()
        };
        let ctx = HookContext::new(self);
        let terminal = |op: Operation| self.perform(op);
        Next::new(&hooks, &ctx, &terminal).run(op)
    }

    /// Performs an operation against the indexes. The end of the hook chain.
    fn perform(&self, op: Operation) -> DbResult<Outcome> {
        trace!(table = %self.inner.name, op = op.name(), "perform");
        let primary_key = self.inner.primary_key.as_str();
        let key_of = |row: &Arc<Row>| row.get(primary_key).clone();

        match op {
            Operation::Insert(rows) => {
                let keys = self.mutate(|state| {
                    let inserted = state.insert_many(rows)?;
                    let keys: Vec<Value> = inserted.iter().map(key_of).collect();
                    Ok((keys, vec![ChangeKind::Insert(inserted)]))
                })?;
                self.inner.stats.record_inserts(keys.len());
                Ok(Outcome::Keys(keys))
            }
            Operation::Update(diffs) => {
                let keys = self.mutate(|state| {
                    let changes = state.update_many(diffs)?;
                    let keys: Vec<Value> = changes.iter().map(|c| key_of(&c.new)).collect();
                    Ok((keys, vec![ChangeKind::Update(changes)]))
                })?;
                self.inner.stats.record_updates(keys.len());
                Ok(Outcome::Keys(keys))
            }
            Operation::Replace(rows) => {
                let keys = self.mutate(|state| {
                    let changes = state.replace_many(rows)?;
                    let keys: Vec<Value> = changes.iter().map(|c| key_of(&c.new)).collect();
                    Ok((keys, vec![ChangeKind::Update(changes)]))
                })?;
                self.inner.stats.record_updates(keys.len());
                Ok(Outcome::Keys(keys))
            }
            Operation::Upsert(rows) => {
                let (keys, inserted, updated) = self.mutate(|state| {
                    let result = state.upsert_many(rows)?;
                    let counts = (result.inserted.len(), result.updated.len());
                    let events = vec![
                        ChangeKind::Insert(result.inserted),
                        ChangeKind::Update(result.updated),
                    ];
                    Ok(((result.keys, counts.0, counts.1), events))
                })?;
                self.inner.stats.record_inserts(inserted);
                self.inner.stats.record_updates(updated);
                Ok(Outcome::Keys(keys))
            }
            Operation::Remove(keys) => {
                let removed = self.mutate(|state| {
                    let removed = state.remove_many(&keys);
                    Ok((removed.len(), vec![ChangeKind::Remove(removed)]))
                })?;
                self.inner.stats.record_removes(removed);
                Ok(Outcome::Removed(removed))
            }
            Operation::Clear => {
                let removed =
                    self.mutate(|state| Ok((state.clear(), vec![ChangeKind::Clear])))?;
                self.inner.stats.record_removes(removed);
                Ok(Outcome::Cleared)
            }
            Operation::Many(query) => Ok(Outcome::Rows(self.read(&query)?)),
            Operation::First(Lookup::Key(key)) => {
                self.inner.stats.record_query();
                Ok(Outcome::Row(self.inner.state.read().get(&key).cloned()))
            }
            Operation::First(Lookup::Query(mut query)) => {
                let limit = query.limit.get_or_insert_with(Limit::new);
                limit.take = Some(limit.take.map_or(1, |take| take.min(1)));
                Ok(Outcome::Row(self.read(&query)?.into_iter().next()))
            }
            Operation::One(Lookup::Key(key)) => {
                self.inner.stats.record_query();
                match self.inner.state.read().get(&key) {
                    Some(row) => Ok(Outcome::Row(Some(Arc::clone(row)))),
                    None => Err(DbError::item_not_found(&self.inner.name)),
                }
            }
            Operation::One(Lookup::Query(query)) => {
                let mut rows = self.read(&query)?;
                match rows.len() {
                    0 => Err(DbError::item_not_found(&self.inner.name)),
                    1 => Ok(Outcome::Row(rows.pop())),
                    count => Err(DbError::more_than_one(&self.inner.name, count)),
                }
            }
            Operation::Count(filter, options) => {
                let query = Query {
                    filter,
                    ..Query::default()
                };
                let count = if options.exact {
                    self.read(&query)?.len()
                } else {
                    self.inner.stats.record_query();
                    let state = self.inner.state.read();
                    estimate(&state, &query, self.inner.config.forbid_full_scans)?
                };
                Ok(Outcome::Count(count))
            }
        }
    }

    /// Applies a mutation under the write lock and emits its events once the
    /// lock is released. Empty inserts, updates and removals emit nothing.
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut TableState) -> DbResult<(T, Vec<ChangeKind>)>,
    ) -> DbResult<T> {
        let _dispatch = self.inner.dispatch.lock();
        let (value, events) = {
            let mut state = self.inner.state.write();
            let (value, kinds) = apply(&mut state)?;
            let events: Vec<ChangeEvent> = kinds
                .into_iter()
                .filter(|kind| !is_empty_change(kind))
                .map(|kind| ChangeEvent {
                    sequence: state.next_sequence(),
                    table: self.inner.name.clone(),
                    kind,
                })
                .collect();
            (value, events)
        };
        for event in events {
            self.inner.feed.emit(event);
        }
        Ok(value)
    }

    /// Runs a query under the read lock and records statistics.
    pub(crate) fn read(&self, query: &Query) -> DbResult<Vec<Arc<Row>>> {
        let execution = {
            let state = self.inner.state.read();
            execute(&state, query, self.inner.config.forbid_full_scans)?
        };
        self.record(query, &execution);
        Ok(execution.rows)
    }

    pub(crate) fn record(&self, query: &Query, execution: &Execution) {
        let stats = &self.inner.stats;
        let report = &execution.report;
        stats.record_query();
        stats.record_rows_scanned(execution.scanned);
        if report.full_scan {
            stats.record_full_scan();
        } else if !report.indexes.is_empty() {
            stats.record_index_scan();
        }

        let threshold = self.inner.config.scan_warning_threshold;
        if report.full_scan
            && query.filter.is_some()
            && threshold > 0
            && execution.scanned > threshold
        {
            warn!(
                table = %self.inner.name,
                rows = execution.scanned,
                "full table scan; no index applies to this filter"
            );
        }
        debug!(
            table = %self.inner.name,
            indexes = ?report.indexes,
            full_scan = report.full_scan,
            scanned = execution.scanned,
            matched = execution.rows.len(),
            "query executed"
        );
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.inner.name)
            .field("primary_key", &self.inner.primary_key)
            .field("indexes", &self.inner.indexes)
            .finish_non_exhaustive()
    }
}

fn is_empty_change(kind: &ChangeKind) -> bool {
    match kind {
        ChangeKind::Insert(rows) | ChangeKind::Remove(rows) => rows.is_empty(),
        ChangeKind::Update(changes) => changes.is_empty(),
        ChangeKind::Clear => false,
    }
}

fn single(keys: Vec<Value>, operation: &'static str) -> DbResult<Value> {
    keys.into_iter().next().ok_or(DbError::UnexpectedOutcome {
        operation,
        outcome: "no keys",
    })
}
