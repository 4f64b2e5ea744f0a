//! Query descriptions: filter, sort and pagination.

use crate::error::{DbError, DbResult};
use crate::query::filter::Filter;
use serde_json::Value as Json;
use tabula_value::Value;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Ascending (lowest first).
    #[default]
    Asc,
    /// Descending (highest first).
    Desc,
}

/// Sort by one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Field to sort by.
    pub key: String,
    /// Direction.
    pub order: Order,
}

impl SortSpec {
    /// Ascending sort on a field.
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            order: Order::Asc,
        }
    }

    /// Descending sort on a field.
    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            order: Order::Desc,
        }
    }
}

/// Pagination: seek to a primary key cursor, then skip, then take.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Limit {
    /// Start at the first row whose primary key is `>=` this value.
    pub from: Option<Value>,
    /// Rows to discard after the cursor.
    pub skip: usize,
    /// Maximum number of rows to return.
    pub take: Option<usize>,
}

impl Limit {
    /// Creates an empty limit (no cursor, no skip, no cap).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the primary key cursor.
    #[must_use]
    pub fn from(mut self, cursor: impl Into<Value>) -> Self {
        self.from = Some(cursor.into());
        self
    }

    /// Sets the number of rows to skip.
    #[must_use]
    pub const fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    /// Sets the maximum number of rows.
    #[must_use]
    pub const fn take(mut self, n: usize) -> Self {
        self.take = Some(n);
        self
    }
}

/// A complete query.
///
/// The default query returns every row ordered by primary key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// Row filter. `None` selects every row.
    pub filter: Option<Filter>,
    /// Sort order. `None` orders by primary key.
    pub sort: Option<SortSpec>,
    /// Pagination.
    pub limit: Option<Limit>,
}

impl Query {
    /// Creates a query that returns every row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sets the pagination.
    #[must_use]
    pub fn limit(mut self, limit: Limit) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns the same query without pagination.
    #[must_use]
    pub fn unlimited(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            limit: None,
        }
    }

    /// Parses a query from `{"where": .., "sort": {"key", "order"}, "limit": {"from", "skip", "take"}}`.
    pub fn from_json(json: &Json) -> DbResult<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| DbError::invalid_filter("query must be an object"))?;
        let mut query = Query::new();

        if let Some(filter) = object.get("where") {
            query.filter = Some(Filter::from_json(filter)?);
        }

        if let Some(sort) = object.get("sort") {
            let key = sort
                .get("key")
                .and_then(Json::as_str)
                .ok_or_else(|| DbError::invalid_filter("sort expects a string key"))?;
            let order = match sort.get("order").and_then(Json::as_str) {
                None | Some("asc") => Order::Asc,
                Some("desc") => Order::Desc,
                Some(other) => {
                    return Err(DbError::invalid_filter(format!(
                        "unknown sort order {other:?}"
                    )))
                }
            };
            query.sort = Some(SortSpec {
                key: key.to_string(),
                order,
            });
        }

        if let Some(limit) = object.get("limit") {
            let count = |name: &str| -> DbResult<Option<usize>> {
                match limit.get(name) {
                    None | Some(Json::Null) => Ok(None),
                    Some(n) => n
                        .as_u64()
                        .and_then(|n| usize::try_from(n).ok())
                        .map(Some)
                        .ok_or_else(|| {
                            DbError::invalid_filter(format!("{name} expects a count"))
                        }),
                }
            };
            query.limit = Some(Limit {
                from: limit
                    .get("from")
                    .filter(|cursor| !cursor.is_null())
                    .map(|cursor| Value::from(cursor.clone())),
                skip: count("skip")?.unwrap_or(0),
                take: count("take")?,
            });
        }

        Ok(query)
    }
}

impl From<Filter> for Query {
    fn from(filter: Filter) -> Self {
        Query::new().filter(filter)
    }
}

/// Row lookup by primary key or by query.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Primary key value.
    Key(Value),
    /// Query; its first result (in query order) is used.
    Query(Query),
}

impl Lookup {
    /// Lookup by primary key.
    pub fn key(key: impl Into<Value>) -> Self {
        Lookup::Key(key.into())
    }
}

impl From<Query> for Lookup {
    fn from(query: Query) -> Self {
        Lookup::Query(query)
    }
}

impl From<Filter> for Lookup {
    fn from(filter: Filter) -> Self {
        Lookup::Query(Query::from(filter))
    }
}

/// Options for counting rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountOptions {
    /// Run the full query (`true`) or use the index cost estimate (`false`).
    pub exact: bool,
}

impl Default for CountOptions {
    fn default() -> Self {
        Self { exact: true }
    }
}

impl CountOptions {
    /// Exact count.
    pub const fn exact() -> Self {
        Self { exact: true }
    }

    /// Estimated count.
    pub const fn estimate() -> Self {
        Self { exact: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::Where;
    use serde_json::json;

    #[test]
    fn parse_full_query() {
        let query = Query::from_json(&json!({
            "where": {"age": {"gt": 5}},
            "sort": {"key": "age", "order": "desc"},
            "limit": {"from": 3, "skip": 1, "take": 10}
        }))
        .unwrap();

        let expected = Query::new()
            .filter(Where::new().gt("age", 5))
            .sort(SortSpec::desc("age"))
            .limit(Limit::new().from(3).skip(1).take(10));
        assert_eq!(query, expected);
    }

    #[test]
    fn parse_rejects_bad_parts() {
        assert!(Query::from_json(&json!({"sort": {"order": "asc"}})).is_err());
        assert!(Query::from_json(&json!({"sort": {"key": "a", "order": "up"}})).is_err());
        assert!(Query::from_json(&json!({"limit": {"take": -1}})).is_err());
    }

    #[test]
    fn unlimited_strips_pagination() {
        let query = Query::new()
            .sort(SortSpec::asc("age"))
            .limit(Limit::new().take(1));
        assert_eq!(query.unlimited(), Query::new().sort(SortSpec::asc("age")));
    }
}
