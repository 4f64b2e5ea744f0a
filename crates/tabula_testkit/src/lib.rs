//! # Tabula Testkit
//!
//! Test utilities for Tabula.
//!
//! This crate provides:
//! - Fixtures: sample tables and row helpers
//! - Property-based generators for rows, filters and operation sequences
//! - A harness that runs every operation against an indexed and an
//!   unindexed table and checks they agree
//! - Concurrent stress helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tabula_testkit::prelude::*;
//!
//! let mut harness = EquivalenceHarness::new();
//! harness.apply(&TableOperation::Insert(row(json!({"id": 1, "age": 3}))));
//! harness.assert_same(&Query::new());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
