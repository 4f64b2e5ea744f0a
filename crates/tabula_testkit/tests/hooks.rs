//! Hooks seen from outside the crate.

use parking_lot::Mutex;
use std::sync::Arc;
use tabula_core::{hook_fn, DbError, Operation, Outcome, Query, TableConfig};
use tabula_testkit::prelude::*;

#[test]
fn audit_hook_sees_every_operation() {
    let db = TestDatabase::memory();
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    db.add_hook(hook_fn(move |ctx, op, next| {
        let name = op.name();
        let result = next.run(op);
        sink.lock()
            .push(format!("{}:{}:{}", ctx.table_name(), name, result.is_ok()));
        result
    }));

    let users = db.users();
    users.insert(row(serde_json::json!({"id": 0}))).unwrap_err();
    users.many(Query::new()).unwrap();
    users.clear().unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "users:insert:true",
            "users:insert:false",
            "users:many:true",
            "users:clear:true"
        ]
    );
}

#[test]
fn read_only_hook_rejects_mutations() {
    let db = TestDatabase::memory();
    let users = db.users();
    users.add_hook(hook_fn(|ctx, op, next| {
        if op.is_mutation() {
            Err(DbError::invalid_config(format!("{} is read only", ctx.table_name())))
        } else {
            next.run(op)
        }
    }));

    assert!(users.insert(row(serde_json::json!({"id": 9}))).is_err());
    assert!(users.remove(0).is_err());
    assert_eq!(users.len(), 3);
    assert_eq!(users.many(Query::new()).unwrap().len(), 3);
}

#[test]
fn hook_may_query_its_own_table() {
    let db = TestDatabase::memory();
    let table = db.create_table("counters", TableConfig::new()).unwrap();
    table.add_hook(hook_fn(|ctx, op, next| match op {
        Operation::Insert(rows) => {
            let base = ctx.table().len();
            let numbered = rows
                .into_iter()
                .enumerate()
                .map(|(i, r)| r.with("position", (base + i) as i64))
                .collect();
            next.run(Operation::Insert(numbered))
        }
        other => next.run(other),
    }));

    table.insert(row(serde_json::json!({"id": "a"}))).unwrap();
    table
        .insert_many(vec![row(serde_json::json!({"id": "b"})), row(serde_json::json!({"id": "c"}))])
        .unwrap();

    let positions: Vec<i64> = table
        .many(Query::new())
        .unwrap()
        .iter()
        .map(|r| r.get("position").as_integer().unwrap())
        .collect();
    assert_eq!(positions, vec![0, 1, 2]);
}

#[test]
fn short_circuit_outcome_must_fit_operation() {
    let db = TestDatabase::memory();
    let users = db.users();
    users.add_hook(hook_fn(|_, op, next| match op {
        Operation::Many(_) => Ok(Outcome::Count(0)),
        other => next.run(other),
    }));

    assert!(matches!(
        users.many(Query::new()),
        Err(DbError::UnexpectedOutcome { operation: "many", outcome: "count" })
    ));
    assert_eq!(users.count(None, tabula_core::CountOptions::exact()).unwrap(), 3);
}
