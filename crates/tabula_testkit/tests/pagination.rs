//! Cursor pagination visits every row exactly once.

use proptest::prelude::*;
use tabula_core::{Limit, Query, SortSpec, TableConfig, Value, Where};
use tabula_testkit::prelude::*;

/// Pages through a query by primary key cursor, fetching one extra row per
/// page to learn the next cursor.
fn page_through(table: &tabula_core::Table, base: &Query, take: usize) -> Vec<i64> {
    let mut seen = Vec::new();
    let mut cursor: Option<Value> = None;
    loop {
        let mut limit = Limit::new().take(take + 1);
        limit.from = cursor.take();
        let mut page = table.many(base.clone().limit(limit)).unwrap();
        let next = if page.len() > take { page.pop() } else { None };
        seen.extend(ids(&page));
        match next {
            Some(row) => cursor = Some(row.get("id").clone()),
            None => return seen,
        }
    }
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn cursor_pages_cover_table(count in 0usize..60, take in 1usize..9) {
        let db = TestDatabase::memory();
        let table = db.create_table("items", TableConfig::new().index("age")).unwrap();
        table.insert_many(sample_users(count)).unwrap();

        let all = page_through(&table, &Query::new(), take);
        prop_assert_eq!(all, (0..count as i64).collect::<Vec<_>>());

        let filtered = Query::new().filter(Where::new().gte("age", 10));
        let expected = ids(&table.many(filtered.clone()).unwrap());
        prop_assert_eq!(page_through(&table, &filtered, take), expected);
    }
}

#[test]
fn skip_and_take_with_sort() {
    let db = TestDatabase::memory();
    let users = db.users();

    let query = Query::new()
        .sort(SortSpec::desc("age"))
        .limit(Limit::new().skip(1).take(1));
    assert_eq!(ids(&users.many(query).unwrap()), vec![0]);

    // With an explicit sort the cursor skips to the first row whose key is
    // at least the cursor, in sort order.
    let query = Query::new()
        .sort(SortSpec::asc("age"))
        .limit(Limit::new().from(2));
    assert_eq!(ids(&users.many(query).unwrap()), vec![2]);
}
