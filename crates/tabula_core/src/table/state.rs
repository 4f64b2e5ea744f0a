//! Index storage owned by a table.

use crate::change_feed::Change;
use crate::error::{DbError, DbResult};
use crate::index::{BucketIndex, Index, IndexKey, OrderedIndex};
use std::collections::BTreeSet;
use std::sync::Arc;
use tabula_value::{Row, Value};

/// Primary and secondary indexes of one table.
///
/// Every row in the primary index is also in each secondary index whose
/// field is set (not null or undefined) on that row. Mutations keep all
/// indexes in step and validate a whole batch before changing anything.
#[derive(Debug)]
pub(crate) struct TableState {
    name: String,
    primary_key: String,
    primary: OrderedIndex<Arc<Row>>,
    secondary: Vec<BucketIndex>,
    sequence: u64,
}

/// Result of an upsert batch.
#[derive(Debug, Default)]
pub(crate) struct Upserted {
    pub keys: Vec<Value>,
    pub inserted: Vec<Arc<Row>>,
    pub updated: Vec<Change>,
}

impl TableState {
    pub(crate) fn new(name: &str, primary_key: &str, indexes: &[String]) -> Self {
        Self {
            name: name.to_string(),
            primary_key: primary_key.to_string(),
            primary: OrderedIndex::new(),
            secondary: indexes.iter().map(BucketIndex::new).collect(),
            sequence: 0,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub(crate) fn primary(&self) -> &OrderedIndex<Arc<Row>> {
        &self.primary
    }

    pub(crate) fn secondary(&self, field: &str) -> Option<&BucketIndex> {
        self.secondary.iter().find(|index| index.field() == field)
    }

    pub(crate) fn len(&self) -> usize {
        self.primary.len()
    }

    /// Sequence number of the last mutation.
    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub(crate) fn get(&self, key: &Value) -> Option<&Arc<Row>> {
        if !is_key_value(key) {
            return None;
        }
        self.primary.get(&IndexKey::from(key))
    }

    /// Extracts and validates the primary key of a row.
    pub(crate) fn key_of(&self, row: &Row) -> DbResult<IndexKey> {
        let key = row.get(&self.primary_key);
        if is_key_value(key) {
            Ok(IndexKey::from(key))
        } else {
            Err(DbError::invalid_key(&self.name, key.clone()))
        }
    }

    pub(crate) fn insert_many(&mut self, rows: Vec<Row>) -> DbResult<Vec<Arc<Row>>> {
        let mut batch = BTreeSet::new();
        let mut keys = Vec::with_capacity(rows.len());
        for row in &rows {
            let key = self.key_of(row)?;
            if self.primary.has(&key) || !batch.insert(key.clone()) {
                return Err(DbError::key_in_use(&self.name, key.into_value()));
            }
            keys.push(key);
        }

        let mut inserted = Vec::with_capacity(rows.len());
        for (key, row) in keys.into_iter().zip(rows) {
            let row = Arc::new(row);
            self.put(key, Arc::clone(&row));
            inserted.push(row);
        }
        Ok(inserted)
    }

    /// Merges each diff into the stored row with the same key.
    pub(crate) fn update_many(&mut self, diffs: Vec<Row>) -> DbResult<Vec<Change>> {
        let keys = self.existing_keys(&diffs)?;
        let mut changes = Vec::with_capacity(diffs.len());
        for (key, diff) in keys.into_iter().zip(diffs) {
            let Some(old) = self.take(&key) else {
                return Err(DbError::item_not_found(&self.name));
            };
            let new = Arc::new(old.merged(&diff));
            self.put(key, Arc::clone(&new));
            changes.push(Change { old, new });
        }
        Ok(changes)
    }

    /// Replaces each stored row with the given row of the same key.
    pub(crate) fn replace_many(&mut self, rows: Vec<Row>) -> DbResult<Vec<Change>> {
        let keys = self.existing_keys(&rows)?;
        let mut changes = Vec::with_capacity(rows.len());
        for (key, row) in keys.into_iter().zip(rows) {
            let Some(old) = self.take(&key) else {
                return Err(DbError::item_not_found(&self.name));
            };
            let new = Arc::new(row);
            self.put(key, Arc::clone(&new));
            changes.push(Change { old, new });
        }
        Ok(changes)
    }

    /// Inserts rows with new keys and merges rows with existing keys.
    ///
    /// Rows are applied in order, so a key repeated within the batch is
    /// inserted once and then updated.
    pub(crate) fn upsert_many(&mut self, rows: Vec<Row>) -> DbResult<Upserted> {
        let keys = rows
            .iter()
            .map(|row| self.key_of(row))
            .collect::<DbResult<Vec<_>>>()?;

        let mut result = Upserted::default();
        for (key, row) in keys.into_iter().zip(rows) {
            result.keys.push(key.value().clone());
            match self.take(&key) {
                Some(old) => {
                    let new = Arc::new(old.merged(&row));
                    self.put(key, Arc::clone(&new));
                    result.updated.push(Change { old, new });
                }
                None => {
                    let row = Arc::new(row);
                    self.put(key, Arc::clone(&row));
                    result.inserted.push(row);
                }
            }
        }
        Ok(result)
    }

    /// Removes rows by key. Keys that are absent or invalid are skipped.
    pub(crate) fn remove_many(&mut self, keys: &[Value]) -> Vec<Arc<Row>> {
        keys.iter()
            .filter(|key| is_key_value(key))
            .filter_map(|key| self.take(&IndexKey::from(key)))
            .collect()
    }

    /// Empties every index, returning the number of rows removed.
    pub(crate) fn clear(&mut self) -> usize {
        let removed = self.primary.len();
        self.primary.clear();
        for index in &mut self.secondary {
            index.clear();
        }
        removed
    }

    fn existing_keys(&self, rows: &[Row]) -> DbResult<Vec<IndexKey>> {
        rows.iter()
            .map(|row| {
                let key = self.key_of(row)?;
                if self.primary.has(&key) {
                    Ok(key)
                } else {
                    Err(DbError::item_not_found(&self.name))
                }
            })
            .collect()
    }

    fn put(&mut self, key: IndexKey, row: Arc<Row>) {
        for index in &mut self.secondary {
            index.insert(&key, &row);
        }
        self.primary.set(key, row);
    }

    fn take(&mut self, key: &IndexKey) -> Option<Arc<Row>> {
        let row = self.primary.delete(key)?;
        for index in &mut self.secondary {
            index.remove(key, &row);
        }
        Some(row)
    }
}

/// Primary keys are text or (non-NaN) numbers.
pub(crate) fn is_key_value(value: &Value) -> bool {
    match value {
        Value::Text(_) => true,
        Value::Number(n) => !n.is_nan(),
        _ => false,
    }
}
