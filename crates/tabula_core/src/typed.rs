//! Typed table facade.

use crate::error::DbResult;
use crate::query::{CountOptions, Filter, Query};
use crate::table::Table;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use tabula_value::{Row, Value};

/// A table of serde types.
///
/// `TypedTable<T>` converts values of `T` to rows on the way in and back on
/// the way out. Queries, hooks and live queries still work on rows; the
/// underlying [`Table`] is available through [`TypedTable::table`].
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct User { id: u32, name: String, age: u32 }
///
/// let users: TypedTable<User> = db.create_typed_table("users", TableConfig::new())?;
/// users.insert(&User { id: 1, name: "Alice".into(), age: 30 })?;
///
/// let adults = users.many(Query::new().filter(Where::new().gte("age", 18)))?;
/// ```
pub struct TypedTable<T> {
    /// Underlying table.
    table: Table,
    /// Type marker.
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> TypedTable<T> {
    /// Wraps a table.
    pub fn new(table: Table) -> Self {
        Self {
            table,
            _marker: PhantomData,
        }
    }

    /// Returns the underlying table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Inserts a value, returning its primary key.
    pub fn insert(&self, value: &T) -> DbResult<Value> {
        self.table.insert(Row::from_serialize(value)?)
    }

    /// Inserts values. Either every value is inserted or none is.
    pub fn insert_many(&self, values: &[T]) -> DbResult<Vec<Value>> {
        let rows = values
            .iter()
            .map(Row::from_serialize)
            .collect::<Result<Vec<_>, _>>()?;
        self.table.insert_many(rows)
    }

    /// Returns the value with this primary key.
    pub fn get(&self, key: impl Into<Value>) -> DbResult<Option<T>> {
        self.table.get(key)?.map(|row| decode(&row)).transpose()
    }

    /// Runs a query.
    pub fn many(&self, query: Query) -> DbResult<Vec<T>> {
        self.table.many(query)?.iter().map(decode).collect()
    }

    /// Writes every field of `value` over the stored row with its key.
    pub fn update(&self, value: &T) -> DbResult<Value> {
        self.table.update(Row::from_serialize(value)?)
    }

    /// Inserts or updates a value.
    pub fn upsert(&self, value: &T) -> DbResult<Value> {
        self.table.upsert(Row::from_serialize(value)?)
    }

    /// Removes the value with this primary key.
    pub fn remove(&self, key: impl Into<Value>) -> DbResult<bool> {
        self.table.remove(key)
    }

    /// Counts values matching `filter`.
    pub fn count(&self, filter: Option<&Filter>, options: CountOptions) -> DbResult<usize> {
        self.table.count(filter, options)
    }
}

impl<T> Clone for TypedTable<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for TypedTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TypedTable").field(&self.table).finish()
    }
}

fn decode<T: DeserializeOwned>(row: &Arc<Row>) -> DbResult<T> {
    Ok(row.to_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::database::Database;
    use crate::error::DbError;
    use crate::query::{SortSpec, Where};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Todo {
        id: u32,
        title: String,
        done: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        priority: Option<u8>,
    }

    fn todo(id: u32, title: &str, priority: Option<u8>) -> Todo {
        Todo {
            id,
            title: title.to_string(),
            done: false,
            priority,
        }
    }

    fn todos() -> TypedTable<Todo> {
        Database::default()
            .create_typed_table("todos", TableConfig::new().index("done"))
            .unwrap()
    }

    #[test]
    fn insert_and_get() {
        let table = todos();
        let key = table.insert(&todo(1, "write tests", Some(2))).unwrap();

        assert_eq!(key, Value::from(1));
        assert_eq!(table.get(1).unwrap(), Some(todo(1, "write tests", Some(2))));
        assert_eq!(table.get(2).unwrap(), None);
    }

    #[test]
    fn query_typed_values() {
        let table = todos();
        table
            .insert_many(&[todo(1, "a", Some(3)), todo(2, "b", None), todo(3, "c", Some(1))])
            .unwrap();

        let mut done = todo(2, "b", None);
        done.done = true;
        table.update(&done).unwrap();

        let open = table
            .many(
                Query::new()
                    .filter(Where::new().eq("done", false))
                    .sort(SortSpec::asc("priority")),
            )
            .unwrap();
        assert_eq!(open.iter().map(|t| t.id).collect::<Vec<_>>(), vec![3, 1]);

        let filter = Filter::from(Where::new().eq("done", true));
        assert_eq!(table.count(Some(&filter), CountOptions::exact()).unwrap(), 1);
    }

    #[test]
    fn upsert_and_remove() {
        let table = todos();
        table.upsert(&todo(1, "a", None)).unwrap();
        table.upsert(&todo(1, "renamed", None)).unwrap();
        assert_eq!(table.get(1).unwrap().unwrap().title, "renamed");

        assert!(table.remove(1).unwrap());
        assert!(!table.remove(1).unwrap());
    }

    #[test]
    fn rows_that_do_not_fit_the_type_fail_to_decode() {
        let table = todos();
        table
            .table()
            .insert(Row::new().with("id", 1).with("title", 7))
            .unwrap();

        assert!(matches!(table.get(1), Err(DbError::Value(_))));
    }
}
