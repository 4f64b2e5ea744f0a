//! Test fixtures and database helpers.
//!
//! Provides convenience functions for setting up test databases
//! and common test scenarios.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tabula_core::{Config, Database, Table, TableConfig};
use tabula_value::Row;

/// Fields that generated rows may carry, besides `id`.
pub const FIELDS: &[&str] = &["age", "score", "name", "tags", "meta"];

/// A test database.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
}

impl TestDatabase {
    /// Creates a database with the default configuration.
    pub fn memory() -> Self {
        Self {
            db: Database::default(),
        }
    }

    /// Creates a database that rejects full table scans.
    pub fn strict() -> Self {
        Self {
            db: Database::new(Config::new().forbid_full_scans(true)),
        }
    }

    /// Creates the canonical `users` table: an index on `age` and rows
    /// `{id: 0, age: 16}`, `{id: 1}` and `{id: 2, age: 49}`.
    pub fn users(&self) -> Table {
        let table = self
            .db
            .create_table("users", TableConfig::new().index("age"))
            .expect("Failed to create users table");
        table
            .insert_many(rows(serde_json::json!([
                {"id": 0, "age": 16},
                {"id": 1},
                {"id": 2, "age": 49}
            ])))
            .expect("Failed to insert users");
        table
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::memory()
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a closure against a fresh in-memory database.
///
/// # Example
///
/// ```rust,ignore
/// use tabula_testkit::with_db;
///
/// #[test]
/// fn my_test() {
///     with_db(|db| {
///         let users = db.create_table("users", TableConfig::new()).unwrap();
///         // ... test operations
///     });
/// }
/// ```
pub fn with_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let db = TestDatabase::memory();
    f(&db)
}

/// Builds a row from a JSON object.
pub fn row(json: serde_json::Value) -> Row {
    Row::try_from(json).expect("Fixture row must be a JSON object")
}

/// Builds rows from a JSON array of objects.
pub fn rows(json: serde_json::Value) -> Vec<Row> {
    json.as_array()
        .expect("Fixture rows must be a JSON array")
        .iter()
        .cloned()
        .map(row)
        .collect()
}

/// Integer primary keys of rows, in order.
pub fn ids(rows: &[Arc<Row>]) -> Vec<i64> {
    rows.iter()
        .map(|r| r.get("id").as_integer().expect("Fixture ids are integers"))
        .collect()
}

/// Deterministic sample rows with ids `0..n`.
///
/// Every fifth row has no `age`, every seventh a null `score`.
pub fn sample_users(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| {
            let mut row = Row::new()
                .with("id", i as i64)
                .with("name", format!("user{}", i % 10))
                .with("score", ((i * 37) % 100) as i64);
            if i % 5 != 0 {
                row.set("age", ((i * 7) % 50) as i64);
            }
            if i % 7 == 0 {
                row.set("score", tabula_value::Value::Null);
            }
            row
        })
        .collect()
}

/// A typed record for typed table tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Primary key.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Age, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

impl User {
    /// Creates a user.
    pub fn new(id: u32, name: &str, age: Option<u32>) -> Self {
        Self {
            id,
            name: name.to_string(),
            age,
        }
    }
}
