//! Query layer.
//!
//! Data flows leaf-first through these modules:
//!
//! - [`filter`]: the `Where`/`And`/`Or` tree and its matchers
//! - `matcher` and `predicate`: evaluate a filter against one row
//! - `analyze`: estimate index scan sizes to pick the cheapest branch
//! - `scan` and `select`: translate matchers into key ranges and scan indexes
//! - `execute`: re-check candidates, sort and paginate
//!
//! Queries are plain data built with [`Query`] or parsed from JSON:
//!
//! ```
//! use tabula_core::query::{Limit, Query, SortSpec, Where};
//!
//! let query = Query::new()
//!     .filter(Where::new().gt("age", 5))
//!     .sort(SortSpec::desc("age"))
//!     .limit(Limit::new().take(10));
//! assert!(query.filter.is_some());
//! ```

pub(crate) mod analyze;
pub(crate) mod execute;
pub mod filter;
pub(crate) mod limit;
mod matcher;
mod model;
mod predicate;
pub(crate) mod scan;
pub(crate) mod select;
pub(crate) mod sort;

pub use filter::{Filter, Matcher, Where};
pub use model::{CountOptions, Limit, Lookup, Order, Query, SortSpec};
pub use predicate::admits;
pub use select::ScanReport;
