//! Ordered indexes.
//!
//! Every table owns one primary index (primary key to row) and one
//! [`BucketIndex`] per secondary field. Indexes are access paths only:
//! callers never name them in queries, the planner picks them.
//!
//! # Index Types
//!
//! - [`OrderedIndex`]: unique keys, ordered traversal and range scans
//! - [`BucketIndex`]: non-unique keys, each mapping to a bucket of rows

mod btree;
mod bucket;
mod traits;

pub use btree::OrderedIndex;
pub use bucket::{Bucket, BucketIndex};
pub use traits::{Index, IndexKey};
