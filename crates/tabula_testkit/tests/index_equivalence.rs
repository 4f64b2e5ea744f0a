//! Indexes change how rows are found, never which rows are returned.

use proptest::prelude::*;
use tabula_core::{Filter, Query, Where};
use tabula_testkit::prelude::*;

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn filters_agree_with_and_without_indexes(
        rows in rows_strategy(30),
        filter in filter_strategy(),
    ) {
        let harness = EquivalenceHarness::with_rows(rows);
        let (matched, _) = harness.assert_same(&Query::new().filter(filter.clone()));

        for row in &matched {
            prop_assert!(filter.matches(row));
        }
    }

    #[test]
    fn queries_agree_with_and_without_indexes(
        rows in rows_strategy(30),
        query in query_strategy(),
    ) {
        let harness = EquivalenceHarness::with_rows(rows);
        harness.assert_same(&query);
    }

    #[test]
    fn mutations_keep_indexes_consistent(
        rows in rows_strategy(20),
        ops in operation_sequence_strategy(1, 30),
        filter in filter_strategy(),
    ) {
        let mut harness = EquivalenceHarness::with_rows(rows);
        for op in &ops {
            harness.apply(op);
        }
        harness.verify_all();
        harness.assert_same(&Query::new().filter(filter));
    }
}

#[test]
fn vacuous_filters_select_nothing() {
    let harness = EquivalenceHarness::with_rows(sample_users(10));
    for filter in [
        Filter::from(Where::new()),
        Filter::and(Vec::new()),
        Filter::or(Vec::new()),
    ] {
        let (rows, report) = harness.assert_same(&Query::new().filter(filter));
        assert!(rows.is_empty());
        assert!(!report.full_scan);
    }
}

#[test]
fn nested_vacuous_filters_are_true() {
    let harness = EquivalenceHarness::with_rows(sample_users(10));
    let filter = Filter::and(vec![
        Filter::from(Where::new()),
        Where::new().lt("id", 3).into(),
    ]);
    let (rows, _) = harness.assert_same(&Query::new().filter(filter));
    assert_eq!(ids(&rows), vec![0, 1, 2]);
}

#[test]
fn null_bounds_match_nothing() {
    let harness = EquivalenceHarness::with_rows(sample_users(20));
    for filter in [
        Where::new().gt("score", tabula_value::Value::Null),
        Where::new().lte("age", tabula_value::Value::Undefined),
        Where::new().between("age", tabula_value::Value::Null, 30),
    ] {
        let (rows, _) = harness.assert_same(&Query::new().filter(filter));
        assert!(rows.is_empty());
    }
}
