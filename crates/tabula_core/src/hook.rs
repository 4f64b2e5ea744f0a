//! Operation hooks.
//!
//! Every table operation is described as an [`Operation`] and passed
//! through a chain of [`Hook`]s before it reaches the table. Each hook
//! receives a [`Next`] token and decides what happens:
//!
//! - call `next.run(op)` once to continue (possibly with a rewritten op)
//! - return without calling it to short-circuit with its own [`Outcome`]
//! - call it several times to retry
//!
//! Database-wide hooks run before table hooks, each in registration order.
//!
//! ```rust,ignore
//! users.add_hook(hook_fn(|ctx, op, next| {
//!     tracing::info!(table = ctx.table_name(), op = op.name(), "operation");
//!     next.run(op)
//! }));
//! ```

use crate::error::{DbError, DbResult};
use crate::query::{CountOptions, Filter, Lookup, Query};
use crate::table::Table;
use std::sync::Arc;
use tabula_value::{Row, Value};

/// A table operation as seen by hooks.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Insert rows. Yields [`Outcome::Keys`].
    Insert(Vec<Row>),
    /// Merge diffs into existing rows. Yields [`Outcome::Keys`].
    Update(Vec<Row>),
    /// Replace existing rows whole. Yields [`Outcome::Keys`].
    Replace(Vec<Row>),
    /// Insert or merge rows. Yields [`Outcome::Keys`].
    Upsert(Vec<Row>),
    /// Remove rows by primary key. Yields [`Outcome::Removed`].
    Remove(Vec<Value>),
    /// Remove every row. Yields [`Outcome::Cleared`].
    Clear,
    /// Run a query. Yields [`Outcome::Rows`].
    Many(Query),
    /// First row of a lookup. Yields [`Outcome::Row`].
    First(Lookup),
    /// Exactly one row of a lookup. Yields [`Outcome::Row`].
    One(Lookup),
    /// Count rows. Yields [`Outcome::Count`].
    Count(Option<Filter>, CountOptions),
}

impl Operation {
    /// Returns the operation name, for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Insert(_) => "insert",
            Operation::Update(_) => "update",
            Operation::Replace(_) => "replace",
            Operation::Upsert(_) => "upsert",
            Operation::Remove(_) => "remove",
            Operation::Clear => "clear",
            Operation::Many(_) => "many",
            Operation::First(_) => "first",
            Operation::One(_) => "one",
            Operation::Count(..) => "count",
        }
    }

    /// True for operations that change the table.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Operation::Insert(_)
                | Operation::Update(_)
                | Operation::Replace(_)
                | Operation::Upsert(_)
                | Operation::Remove(_)
                | Operation::Clear
        )
    }
}

/// The result of an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Primary keys of written rows, in input order.
    Keys(Vec<Value>),
    /// Number of rows removed.
    Removed(usize),
    /// Query results.
    Rows(Vec<Arc<Row>>),
    /// A single lookup result.
    Row(Option<Arc<Row>>),
    /// A row count.
    Count(usize),
    /// The table was cleared.
    Cleared,
}

impl Outcome {
    /// Returns the outcome kind, for errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Keys(_) => "keys",
            Outcome::Removed(_) => "removed",
            Outcome::Rows(_) => "rows",
            Outcome::Row(_) => "row",
            Outcome::Count(_) => "count",
            Outcome::Cleared => "cleared",
        }
    }

    fn unexpected(self, operation: &'static str) -> DbError {
        DbError::UnexpectedOutcome {
            operation,
            outcome: self.kind(),
        }
    }

    pub(crate) fn into_keys(self, operation: &'static str) -> DbResult<Vec<Value>> {
        match self {
            Outcome::Keys(keys) => Ok(keys),
            other => Err(other.unexpected(operation)),
        }
    }

    pub(crate) fn into_removed(self, operation: &'static str) -> DbResult<usize> {
        match self {
            Outcome::Removed(n) => Ok(n),
            other => Err(other.unexpected(operation)),
        }
    }

    pub(crate) fn into_rows(self, operation: &'static str) -> DbResult<Vec<Arc<Row>>> {
        match self {
            Outcome::Rows(rows) => Ok(rows),
            other => Err(other.unexpected(operation)),
        }
    }

    pub(crate) fn into_row(self, operation: &'static str) -> DbResult<Option<Arc<Row>>> {
        match self {
            Outcome::Row(row) => Ok(row),
            other => Err(other.unexpected(operation)),
        }
    }

    pub(crate) fn into_count(self, operation: &'static str) -> DbResult<usize> {
        match self {
            Outcome::Count(n) => Ok(n),
            other => Err(other.unexpected(operation)),
        }
    }

    pub(crate) fn into_cleared(self, operation: &'static str) -> DbResult<()> {
        match self {
            Outcome::Cleared => Ok(()),
            other => Err(other.unexpected(operation)),
        }
    }
}

/// What a hook can see about the call.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    table: &'a Table,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(table: &'a Table) -> Self {
        Self { table }
    }

    /// The table the operation targets.
    ///
    /// Calling its operations from a hook runs the whole chain again.
    pub fn table(&self) -> &'a Table {
        self.table
    }

    /// Name of the table.
    pub fn table_name(&self) -> &'a str {
        self.table.name()
    }
}

/// Interceptor around table operations.
pub trait Hook: Send + Sync {
    /// Handles an operation; call `next.run` to continue the chain.
    fn call(&self, ctx: &HookContext<'_>, op: Operation, next: Next<'_>) -> DbResult<Outcome>;
}

/// A hook built from a closure. See [`hook_fn`].
pub struct FnHook<F>(F);

impl<F> Hook for FnHook<F>
where
    F: Fn(&HookContext<'_>, Operation, Next<'_>) -> DbResult<Outcome> + Send + Sync,
{
    fn call(&self, ctx: &HookContext<'_>, op: Operation, next: Next<'_>) -> DbResult<Outcome> {
        (self.0)(ctx, op, next)
    }
}

/// Wraps a closure as a [`Hook`].
pub fn hook_fn<F>(f: F) -> FnHook<F>
where
    F: Fn(&HookContext<'_>, Operation, Next<'_>) -> DbResult<Outcome> + Send + Sync,
{
    FnHook(f)
}

/// The rest of the hook chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    hooks: &'a [Arc<dyn Hook>],
    ctx: &'a HookContext<'a>,
    terminal: &'a dyn Fn(Operation) -> DbResult<Outcome>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        hooks: &'a [Arc<dyn Hook>],
        ctx: &'a HookContext<'a>,
        terminal: &'a dyn Fn(Operation) -> DbResult<Outcome>,
    ) -> Self {
        Self {
            hooks,
            ctx,
            terminal,
        }
    }

    /// Runs the remaining hooks, then the operation itself.
    pub fn run(&self, op: Operation) -> DbResult<Outcome> {
        match self.hooks.split_first() {
            Some((hook, rest)) => hook.call(
                self.ctx,
                op,
                Next {
                    hooks: rest,
                    ..*self
                },
            ),
            None => (self.terminal)(op),
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, TableConfig};
    use crate::database::Database;
    use parking_lot::Mutex;
    use serde_json::json;

    fn users(db: &Database) -> Table {
        db.create_table("users", TableConfig::new().index("age"))
            .unwrap()
    }

    fn row(json: serde_json::Value) -> Row {
        Row::try_from(json).unwrap()
    }

    #[test]
    fn database_hooks_run_before_table_hooks() {
        let db = Database::new(Config::default());
        let table = users(&db);
        let log = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&log);
        table.add_hook(hook_fn(move |_, op, next| {
            sink.lock().push(format!("table:{}", op.name()));
            next.run(op)
        }));
        let sink = Arc::clone(&log);
        db.add_hook(hook_fn(move |ctx, op, next| {
            sink.lock().push(format!("db:{}:{}", ctx.table_name(), op.name()));
            next.run(op)
        }));

        table.insert(row(json!({"id": 1}))).unwrap();
        assert_eq!(*log.lock(), vec!["db:users:insert", "table:insert"]);
    }

    #[test]
    fn hook_can_short_circuit() {
        let db = Database::default();
        let table = users(&db);
        table.insert(row(json!({"id": 1}))).unwrap();

        table.add_hook(hook_fn(|_, op, next| match op {
            Operation::Count(..) => Ok(Outcome::Count(42)),
            other => next.run(other),
        }));

        assert_eq!(table.count(None, CountOptions::exact()).unwrap(), 42);
        assert_eq!(table.many(Query::new()).unwrap().len(), 1);
    }

    #[test]
    fn hook_can_rewrite_operation() {
        let db = Database::default();
        let table = users(&db);

        table.add_hook(hook_fn(|_, op, next| match op {
            Operation::Insert(rows) => {
                let stamped = rows.into_iter().map(|r| r.with("source", "hook")).collect();
                next.run(Operation::Insert(stamped))
            }
            other => next.run(other),
        }));

        table.insert(row(json!({"id": 1}))).unwrap();
        let stored = table.get(1).unwrap().unwrap();
        assert_eq!(stored.get("source"), &Value::from("hook"));
    }

    #[test]
    fn hook_can_retry() {
        let db = Database::default();
        let table = users(&db);
        table.insert(row(json!({"id": 1}))).unwrap();
        let attempts = Arc::new(Mutex::new(0));

        let counter = Arc::clone(&attempts);
        table.add_hook(hook_fn(move |_, op, next| {
            let first = next.run(op.clone());
            *counter.lock() += 1;
            match (first, op) {
                (Err(DbError::PrimaryKeyAlreadyInUse { .. }), Operation::Insert(rows)) => {
                    *counter.lock() += 1;
                    next.run(Operation::Upsert(rows))
                }
                (result, _) => result,
            }
        }));

        let key = table.insert(row(json!({"id": 1, "age": 5}))).unwrap();
        assert_eq!(key, Value::from(1));
        assert_eq!(*attempts.lock(), 2);
        assert_eq!(table.get(1).unwrap().unwrap().get("age"), &Value::from(5));
    }

    #[test]
    fn wrong_outcome_kind_is_an_error() {
        let db = Database::default();
        let table = users(&db);
        table.add_hook(hook_fn(|_, _, _| Ok(Outcome::Cleared)));

        let err = table.insert(row(json!({"id": 1}))).unwrap_err();
        assert!(matches!(
            err,
            DbError::UnexpectedOutcome {
                operation: "insert",
                outcome: "cleared"
            }
        ));
    }
}
