//! # Tabula Core
//!
//! Embedded in-memory table database.
//!
//! This crate provides:
//! - Tables with a primary index and optional secondary indexes
//! - Filters (`Where`/`And`/`Or`) with equality, range, membership and
//!   nested matchers
//! - Cost-based index selection with a full scan fallback
//! - Sorting and cursor pagination
//! - Live queries maintained incrementally from change events
//! - Operation hooks at database and table level
//! - Typed tables over serde types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tabula_core::{Database, Query, Row, TableConfig, Where};
//!
//! let db = Database::default();
//! let users = db.create_table("users", TableConfig::new().index("age"))?;
//!
//! users.insert(Row::new().with("id", 1).with("age", 30))?;
//! users.insert(Row::new().with("id", 2).with("age", 12))?;
//!
//! let adults = users.many(Query::new().filter(Where::new().gte("age", 18)))?;
//! assert_eq!(adults.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change_feed;
mod config;
mod database;
mod error;
mod hook;
pub mod index;
pub mod query;
mod stats;
mod table;
mod typed;
mod watch;

pub use change_feed::{Change, ChangeEvent, ChangeFeed, ChangeKind, Listener, SubscriptionId};
pub use config::{Config, TableConfig};
pub use database::Database;
pub use error::{DbError, DbResult};
pub use hook::{hook_fn, FnHook, Hook, HookContext, Next, Operation, Outcome};
pub use query::{
    admits, CountOptions, Filter, Limit, Lookup, Matcher, Order, Query, ScanReport, SortSpec,
    Where,
};
pub use stats::{StatsSnapshot, TableStats};
pub use table::Table;
pub use typed::TypedTable;
pub use watch::{WatchCallback, WatchHandle};

pub use tabula_value::{Row, Value};
