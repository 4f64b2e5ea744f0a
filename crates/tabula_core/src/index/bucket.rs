//! Secondary index: field value to a bucket of rows.

use crate::index::btree::OrderedIndex;
use crate::index::traits::{Index, IndexKey};
use std::collections::BTreeMap;
use std::ops::{Bound, ControlFlow};
use std::sync::Arc;
use tabula_value::Row;

/// Rows sharing one secondary key, ordered by primary key.
pub type Bucket = BTreeMap<IndexKey, Arc<Row>>;

/// Non-unique index over one field.
///
/// Each key maps to the bucket of rows whose field holds that value. Rows
/// where the field is null or undefined are not indexed. The index keeps a
/// running row count next to the key count, for cost estimates.
#[derive(Debug, Clone)]
pub struct BucketIndex {
    field: String,
    keys: OrderedIndex<Bucket>,
    rows: usize,
}

impl BucketIndex {
    /// Creates an empty index on a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            keys: OrderedIndex::new(),
            rows: 0,
        }
    }

    /// Returns the indexed field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Adds a row under its primary key.
    pub fn insert(&mut self, primary: &IndexKey, row: &Arc<Row>) {
        let value = row.get(&self.field);
        if value.is_nullish() {
            return;
        }
        let bucket = self.keys.entry_or_default(IndexKey::from(value));
        if bucket.insert(primary.clone(), Arc::clone(row)).is_none() {
            self.rows += 1;
        }
    }

    /// Removes a row. `row` must be the version that was inserted.
    pub fn remove(&mut self, primary: &IndexKey, row: &Row) {
        let value = row.get(&self.field);
        if value.is_nullish() {
            return;
        }
        let key = IndexKey::from(value);
        let Some(bucket) = self.keys.get_mut(&key) else {
            return;
        };
        if bucket.remove(primary).is_some() {
            self.rows -= 1;
        }
        if bucket.is_empty() {
            self.keys.delete(&key);
        }
    }

    /// Returns the bucket for a key.
    pub fn get(&self, key: &IndexKey) -> Option<&Bucket> {
        self.keys.get(key)
    }

    /// Returns the number of rows stored under a key.
    pub fn bucket_len(&self, key: &IndexKey) -> usize {
        self.keys.get(key).map_or(0, BTreeMap::len)
    }

    /// Visits every row of every bucket whose key lies between the bounds.
    pub fn range_scan<F>(
        &self,
        lower: Bound<&IndexKey>,
        upper: Bound<&IndexKey>,
        mut visit: F,
    ) -> ControlFlow<()>
    where
        F: FnMut(&Arc<Row>) -> ControlFlow<()>,
    {
        self.keys.range_scan(lower, upper, |_, bucket| {
            for row in bucket.values() {
                visit(row)?;
            }
            ControlFlow::Continue(())
        })
    }

    /// Returns the underlying key index.
    pub fn keys(&self) -> &OrderedIndex<Bucket> {
        &self.keys
    }

    /// Returns the number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Returns the number of indexed rows.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Clears the index.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.rows = 0;
    }
}
