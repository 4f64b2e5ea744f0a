//! Property-based test generators using proptest.
//!
//! Values are drawn from small domains so that generated filters hit
//! generated rows often, including the awkward cases: missing fields,
//! nulls, mixed types and arrays.

use proptest::prelude::*;
use std::collections::BTreeMap;
use tabula_core::{Filter, Limit, Matcher, Order, Query, SortSpec, Where};
use tabula_value::{Row, Value};

/// Strategy for primary keys.
pub fn key_strategy() -> impl Strategy<Value = i64> {
    0i64..40
}

/// Strategy for scalar values, nulls included.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => (0i64..10).prop_map(Value::from),
        1 => Just(Value::from(2.5)),
        2 => prop::sample::select(vec!["a", "b", "c"]).prop_map(Value::from),
        1 => any::<bool>().prop_map(Value::from),
        1 => Just(Value::Null),
    ]
}

/// Strategy for field values, including arrays and small objects.
pub fn field_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        6 => scalar_strategy(),
        1 => prop::collection::vec(scalar_strategy(), 0..3).prop_map(Value::Array),
        1 => scalar_strategy().prop_map(|x| {
            let mut fields = BTreeMap::new();
            fields.insert("x".to_string(), x);
            Value::Object(fields)
        }),
    ]
}

/// Strategy for the non-key fields of a row. Absent fields read as
/// undefined.
pub fn fields_strategy() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map(
        prop::sample::select(crate::fixtures::FIELDS.to_vec()),
        field_value_strategy(),
        0..4,
    )
    .prop_map(|fields| {
        fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    })
}

/// Strategy for a row with the given key.
pub fn row_with_key(key: i64) -> impl Strategy<Value = Row> {
    fields_strategy().prop_map(move |fields| {
        let mut row: Row = fields.into_iter().collect();
        row.set("id", key);
        row
    })
}

/// Strategy for a row with a generated key.
pub fn row_strategy() -> impl Strategy<Value = Row> {
    key_strategy().prop_flat_map(row_with_key)
}

/// Strategy for rows with distinct keys.
pub fn rows_strategy(max_rows: usize) -> impl Strategy<Value = Vec<Row>> {
    prop::collection::btree_set(key_strategy(), 0..max_rows)
        .prop_flat_map(|keys| keys.into_iter().map(row_with_key).collect::<Vec<_>>())
}

/// Strategy for single-field matchers.
pub fn matcher_strategy() -> impl Strategy<Value = Matcher> {
    let bound = prop_oneof![
        4 => (0i64..10).prop_map(Value::from),
        1 => prop::sample::select(vec!["a", "b", "c"]).prop_map(Value::from),
        1 => Just(Value::Null),
        1 => Just(Value::Undefined),
    ];
    prop_oneof![
        4 => scalar_strategy().prop_map(Matcher::Equals),
        1 => prop::collection::vec(scalar_strategy(), 0..2)
            .prop_map(|items| Matcher::Equals(Value::Array(items))),
        2 => bound.clone().prop_map(Matcher::Gt),
        2 => bound.clone().prop_map(Matcher::Gte),
        2 => bound.clone().prop_map(Matcher::Lt),
        2 => bound.clone().prop_map(Matcher::Lte),
        2 => (bound.clone(), bound).prop_map(|(lo, hi)| Matcher::Between(lo, hi)),
        2 => prop::collection::vec(scalar_strategy(), 0..3).prop_map(Matcher::In),
        1 => scalar_strategy().prop_map(Matcher::Contains),
        1 => scalar_strategy().prop_map(|x| Matcher::Nested(Where::new().eq("x", x))),
        1 => Just(Matcher::Never),
    ]
}

/// Strategy for a `Where` clause over `id` and the fixture fields.
pub fn where_strategy() -> impl Strategy<Value = Where> {
    let field = prop_oneof![
        1 => Just("id"),
        4 => prop::sample::select(crate::fixtures::FIELDS.to_vec()),
    ];
    prop::collection::vec((field, matcher_strategy()), 0..3).prop_map(|clauses| {
        clauses
            .into_iter()
            .fold(Where::new(), |clause, (name, matcher)| clause.field(name, matcher))
    })
}

/// Strategy for filter trees up to three levels deep.
pub fn filter_strategy() -> impl Strategy<Value = Filter> {
    where_strategy()
        .prop_map(Filter::Where)
        .prop_recursive(3, 16, 3, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..3).prop_map(Filter::And),
                prop::collection::vec(inner, 0..3).prop_map(Filter::Or),
            ]
        })
}

/// Strategy for sort specifications.
pub fn sort_strategy() -> impl Strategy<Value = Option<SortSpec>> {
    prop::option::of(
        (
            prop::sample::select(vec!["id", "age", "score", "name"]),
            prop_oneof![Just(Order::Asc), Just(Order::Desc)],
        )
            .prop_map(|(key, order)| SortSpec {
                key: key.to_string(),
                order,
            }),
    )
}

/// Strategy for pagination.
pub fn limit_strategy() -> impl Strategy<Value = Option<Limit>> {
    prop::option::of(
        (
            prop::option::of(key_strategy()),
            0usize..4,
            prop::option::of(0usize..6),
        )
            .prop_map(|(from, skip, take)| Limit {
                from: from.map(Value::from),
                skip,
                take,
            }),
    )
}

/// Strategy for complete queries.
pub fn query_strategy() -> impl Strategy<Value = Query> {
    (
        prop::option::of(filter_strategy()),
        sort_strategy(),
        limit_strategy(),
    )
        .prop_map(|(filter, sort, limit)| Query {
            filter,
            sort,
            limit,
        })
}

/// A table mutation.
#[derive(Debug, Clone)]
pub enum TableOperation {
    /// Insert a row.
    Insert(Row),
    /// Merge a diff into an existing row.
    Update(Row),
    /// Insert or merge a row.
    Upsert(Row),
    /// Remove a row by key.
    Remove(i64),
    /// Remove every row.
    Clear,
}

/// Strategy for table mutations.
pub fn operation_strategy() -> impl Strategy<Value = TableOperation> {
    prop_oneof![
        4 => row_strategy().prop_map(TableOperation::Insert),
        3 => row_strategy().prop_map(TableOperation::Update),
        2 => row_strategy().prop_map(TableOperation::Upsert),
        2 => key_strategy().prop_map(TableOperation::Remove),
        1 => Just(TableOperation::Clear),
    ]
}

/// Strategy for a sequence of mutations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<TableOperation>> {
    prop::collection::vec(operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn rows_have_distinct_keys(rows in rows_strategy(20)) {
            let keys: BTreeSet<i64> = rows
                .iter()
                .map(|r| r.get("id").as_integer().unwrap())
                .collect();
            prop_assert_eq!(keys.len(), rows.len());
        }

        #[test]
        fn generated_rows_use_fixture_fields(row in row_strategy()) {
            for (name, _) in row.iter() {
                prop_assert!(name == "id" || crate::fixtures::FIELDS.contains(&name));
            }
        }

        #[test]
        fn generated_limits_are_small(limit in limit_strategy()) {
            if let Some(limit) = limit {
                prop_assert!(limit.skip < 4);
                prop_assert!(limit.take.map_or(true, |take| take < 6));
            }
        }
    }
}
