//! Todo Application Example
//!
//! This example demonstrates core Tabula functionality:
//! - Creating a table with a secondary index
//! - Typed inserts and updates through serde
//! - Filtered, sorted and paginated queries
//! - A live query that follows every change
//! - A database-wide hook
//!
//! Run with: cargo run -p rust_todo
//! Set `RUST_LOG=tabula_core=debug` to see index choices.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tabula_core::{
    hook_fn, CountOptions, Database, Filter, Limit, Query, Row, SortSpec, TableConfig, Where,
};
use tracing_subscriber::EnvFilter;

/// A todo item.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Todo {
    id: u32,
    title: String,
    completed: bool,
    priority: u8,
}

impl Todo {
    fn new(id: u32, title: &str, priority: u8) -> Self {
        Self {
            id,
            title: title.to_string(),
            completed: false,
            priority,
        }
    }
}

fn print_rows(rows: &[Arc<Row>]) {
    for row in rows {
        let status = if row.get("completed").as_bool() == Some(true) {
            "✓"
        } else {
            "○"
        };
        println!(
            "  {} [P{}] {}",
            status,
            row.get("priority").as_integer().unwrap_or_default(),
            row.get("title").as_text().unwrap_or("?")
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("Todo Application Example");
    println!("========================\n");

    let db = Database::default();
    db.add_hook(hook_fn(|ctx, op, next| {
        if op.is_mutation() {
            println!("  (hook) {} on {}", op.name(), ctx.table_name());
        }
        next.run(op)
    }));

    let todos = db.create_typed_table::<Todo>(
        "todos",
        TableConfig::new().index("priority").index("completed"),
    )?;
    println!("[OK] Table created");

    // Live query: open todos, most urgent first
    let open = Query::new()
        .filter(Where::new().eq("completed", false))
        .sort(SortSpec::asc("priority"));
    let watch = todos.table().watch(open, |rows| {
        println!("  (live) {} open todos", rows.len());
    })?;

    println!("\n[+] Inserting todos...");
    todos.insert_many(&[
        Todo::new(1, "Learn Tabula", 1),
        Todo::new(2, "Build an app", 2),
        Todo::new(3, "Write tests", 1),
        Todo::new(4, "Deploy to production", 3),
    ])?;

    println!("\n[*] All todos:");
    print_rows(&todos.table().many(Query::new())?);

    println!("\n[!] High-priority todos:");
    let urgent = Filter::from(Where::new().eq("priority", 1));
    for todo in todos.many(Query::new().filter(urgent.clone()))? {
        println!("  ○ {}", todo.title);
    }

    println!("\n[~] Completing 'Learn Tabula'...");
    if let Some(mut todo) = todos.get(1)? {
        todo.completed = true;
        todos.update(&todo)?;
    }

    println!("\n[#] Summary:");
    let done = Filter::from_json(&serde_json::json!({"completed": true}))?;
    println!("  Completed: {}", todos.count(Some(&done), CountOptions::exact())?);
    println!(
        "  Urgent (estimated): {}",
        todos.count(Some(&urgent), CountOptions::estimate())?
    );

    println!("\n[>] First page of two, by priority:");
    let page = Query::new()
        .sort(SortSpec::asc("priority"))
        .limit(Limit::new().take(2));
    print_rows(&todos.table().many(page)?);

    println!("\n[-] Deleting completed todos...");
    let removed = todos.table().remove_where(&done)?;
    println!("[OK] Removed {}, remaining {}", removed, todos.table().len());

    watch.dispose();
    let stats = todos.table().stats();
    println!(
        "\n[*] Stats: {} queries, {} index scans, {} full scans, {} notifications",
        stats.queries, stats.index_scans, stats.full_scans, stats.notifications
    );

    Ok(())
}
