//! # Tabula Value
//!
//! Dynamic value model for Tabula.
//!
//! This crate provides:
//! - [`Value`]: the dynamic field value (scalars, dates, arrays, objects)
//! - [`Row`]: a record mapping field names to values
//! - A total order over values, used by indexes and sorting
//! - Deep equality, used by equality, `in` and `contains` matchers
//! - JSON and serde interop
//!
//! ## Usage
//!
//! ```
//! use tabula_value::{Row, Value};
//!
//! let row = Row::try_from(serde_json::json!({"id": 1, "tags": ["a", "b"]})).unwrap();
//! assert!(row.get("tags").deep_eq(&Value::from(vec!["b", "a"])));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod equality;
mod error;
mod json;
mod row;
mod value;

pub use error::{ValueError, ValueResult};
pub use row::Row;
pub use value::Value;
