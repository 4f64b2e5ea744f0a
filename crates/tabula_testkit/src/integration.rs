//! Cross-module integration test helpers.
//!
//! [`EquivalenceHarness`] drives two tables with the same operations: one
//! with a secondary index on every fixture field, one with none. Indexes
//! are access paths only, so both tables must always agree on contents,
//! errors and query results. A model map tracks the expected contents.

use crate::fixtures::FIELDS;
use crate::generators::TableOperation;
use std::collections::BTreeMap;
use std::mem::discriminant;
use std::sync::Arc;
use tabula_core::{
    CountOptions, Database, DbError, DbResult, Query, ScanReport, Table, TableConfig,
};
use tabula_value::{Row, Value};

/// A test harness comparing indexed and unindexed tables.
pub struct EquivalenceHarness {
    /// The database holding both tables.
    pub db: Database,
    /// Table with a secondary index on every fixture field.
    pub indexed: Table,
    /// Table without secondary indexes.
    pub plain: Table,
    /// Expected rows by key.
    model: BTreeMap<i64, Row>,
}

impl EquivalenceHarness {
    /// Creates a harness with two empty tables.
    pub fn new() -> Self {
        let db = Database::default();
        let config = FIELDS
            .iter()
            .fold(TableConfig::new(), |config, field| config.index(*field));
        let indexed = db
            .create_table("indexed", config)
            .expect("Failed to create indexed table");
        let plain = db
            .create_table("plain", TableConfig::new())
            .expect("Failed to create plain table");
        Self {
            db,
            indexed,
            plain,
            model: BTreeMap::new(),
        }
    }

    /// Creates a harness and inserts rows into both tables.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        let mut harness = Self::new();
        for row in rows {
            harness.apply(&TableOperation::Insert(row));
        }
        harness
    }

    /// Applies an operation to both tables and the model.
    ///
    /// Panics if the tables disagree on the outcome. Returns whether the
    /// operation succeeded.
    pub fn apply(&mut self, op: &TableOperation) -> bool {
        let indexed = run(&self.indexed, op);
        let plain = run(&self.plain, op);
        match (&indexed, &plain) {
            (Ok(a), Ok(b)) => assert_eq!(a, b, "Outcome mismatch for {:?}", op),
            (Err(a), Err(b)) => assert_eq!(
                discriminant(a),
                discriminant(b),
                "Error mismatch for {:?}: {} vs {}",
                op,
                a,
                b
            ),
            _ => panic!("Tables disagree on {:?}: {:?} vs {:?}", op, indexed, plain),
        }

        if indexed.is_ok() {
            self.apply_to_model(op);
        }
        indexed.is_ok()
    }

    fn apply_to_model(&mut self, op: &TableOperation) {
        match op {
            TableOperation::Insert(row) => {
                self.model.insert(key_of(row), row.clone());
            }
            TableOperation::Update(diff) | TableOperation::Upsert(diff) => {
                let merged = match self.model.get(&key_of(diff)) {
                    Some(existing) => existing.merged(diff),
                    None => diff.clone(),
                };
                self.model.insert(key_of(diff), merged);
            }
            TableOperation::Remove(key) => {
                self.model.remove(key);
            }
            TableOperation::Clear => self.model.clear(),
        }
    }

    /// Runs a query on both tables and asserts identical results.
    ///
    /// Returns the rows and the access path used by the indexed table.
    pub fn assert_same(&self, query: &Query) -> (Vec<Arc<Row>>, ScanReport) {
        let indexed = self.indexed.many(query.clone()).expect("Indexed query failed");
        let plain = self.plain.many(query.clone()).expect("Plain query failed");
        assert_eq!(indexed, plain, "Results differ for {:?}", query);

        let exact = CountOptions::exact();
        assert_eq!(
            self.indexed.count(query.filter.as_ref(), exact).expect("Count failed"),
            self.plain.count(query.filter.as_ref(), exact).expect("Count failed"),
            "Counts differ for {:?}",
            query.filter
        );

        let report = self.indexed.explain(query).expect("Explain failed");
        (indexed, report)
    }

    /// Verifies both tables hold exactly the model rows.
    pub fn verify_all(&self) {
        let expected: Vec<Row> = self.model.values().cloned().collect();
        for table in [&self.indexed, &self.plain] {
            let actual: Vec<Row> = table
                .many(Query::new())
                .expect("Failed to read table")
                .iter()
                .map(|row| Row::clone(row))
                .collect();
            assert_eq!(actual, expected, "Contents of {} differ from model", table.name());
        }
    }

    /// Returns the number of rows the model expects.
    pub fn tracked_count(&self) -> usize {
        self.model.len()
    }
}

impl Default for EquivalenceHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies an operation to a table, returning the affected keys.
pub fn run(table: &Table, op: &TableOperation) -> DbResult<Vec<Value>> {
    match op {
        TableOperation::Insert(row) => table.insert(row.clone()).map(|key| vec![key]),
        TableOperation::Update(diff) => table.update(diff.clone()).map(|key| vec![key]),
        TableOperation::Upsert(row) => table.upsert(row.clone()).map(|key| vec![key]),
        TableOperation::Remove(key) => table.remove(*key).map(|removed| {
            if removed {
                vec![Value::from(*key)]
            } else {
                Vec::new()
            }
        }),
        TableOperation::Clear => table.clear().map(|()| Vec::new()),
    }
}

fn key_of(row: &Row) -> i64 {
    row.get("id")
        .as_integer()
        .expect("Generated rows have integer keys")
}

/// Returns true if the error is one a generated operation may legitimately
/// produce.
pub fn is_expected_error(err: &DbError) -> bool {
    matches!(
        err,
        DbError::PrimaryKeyAlreadyInUse { .. } | DbError::ItemNotFound { .. }
    )
}
