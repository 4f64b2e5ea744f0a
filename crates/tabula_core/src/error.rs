//! Error types for Tabula core.

use tabula_value::{Value, ValueError};
use thiserror::Error;

/// Result type for core operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in Tabula core operations.
///
/// Every error is reported synchronously to the immediate caller. Batch
/// operations validate all items first, so a failed batch leaves the table
/// unchanged.
#[derive(Debug, Error)]
pub enum DbError {
    /// Insert with a primary key that is already taken.
    #[error("primary key {key:?} already in use in table {table}")]
    PrimaryKeyAlreadyInUse {
        /// Table name.
        table: String,
        /// The colliding key.
        key: Value,
    },

    /// Primary key missing, null, or not a text/number value.
    #[error("invalid primary key {key:?} for table {table}")]
    InvalidPrimaryKey {
        /// Table name.
        table: String,
        /// The rejected key value.
        key: Value,
    },

    /// An update callback tried to change a row's primary key.
    #[error("primary key {key:?} cannot be modified in table {table}")]
    PrimaryKeyCannotBeModified {
        /// Table name.
        table: String,
        /// The original key.
        key: Value,
    },

    /// No row matched the given key or query.
    #[error("item not found in table {table}")]
    ItemNotFound {
        /// Table name.
        table: String,
    },

    /// More than one row matched where exactly one was expected.
    #[error("expected one item in table {table}, found {count}")]
    MoreThanOneItemFound {
        /// Table name.
        table: String,
        /// Number of matching rows.
        count: usize,
    },

    /// A table with this name is already registered.
    #[error("table already exists: {name}")]
    TableAlreadyExists {
        /// Name of the table.
        name: String,
    },

    /// Table configuration is invalid.
    #[error("invalid table config: {message}")]
    InvalidTableConfig {
        /// Description of the problem.
        message: String,
    },

    /// A filter could not be built from its structured form.
    #[error("invalid filter: {message}")]
    InvalidFilter {
        /// Description of the problem.
        message: String,
    },

    /// A query needed a full table scan while full scans are forbidden.
    #[error("full table scan forbidden on table {table}")]
    FullScanForbidden {
        /// Table name.
        table: String,
    },

    /// A hook returned an outcome of the wrong kind for its operation.
    #[error("hook returned {outcome} for operation {operation}")]
    UnexpectedOutcome {
        /// Operation name.
        operation: &'static str,
        /// Outcome kind that was returned.
        outcome: &'static str,
    },

    /// Value conversion error.
    #[error("value error: {0}")]
    Value(#[from] ValueError),
}

impl DbError {
    /// Creates a primary-key-in-use error.
    pub fn key_in_use(table: impl Into<String>, key: Value) -> Self {
        Self::PrimaryKeyAlreadyInUse {
            table: table.into(),
            key,
        }
    }

    /// Creates an invalid primary key error.
    pub fn invalid_key(table: impl Into<String>, key: Value) -> Self {
        Self::InvalidPrimaryKey {
            table: table.into(),
            key,
        }
    }

    /// Creates a primary-key-modified error.
    pub fn key_modified(table: impl Into<String>, key: Value) -> Self {
        Self::PrimaryKeyCannotBeModified {
            table: table.into(),
            key,
        }
    }

    /// Creates an item not found error.
    pub fn item_not_found(table: impl Into<String>) -> Self {
        Self::ItemNotFound {
            table: table.into(),
        }
    }

    /// Creates a more-than-one-item error.
    pub fn more_than_one(table: impl Into<String>, count: usize) -> Self {
        Self::MoreThanOneItemFound {
            table: table.into(),
            count,
        }
    }

    /// Creates an invalid table config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidTableConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid filter error.
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: message.into(),
        }
    }

    /// Creates a full-scan-forbidden error.
    pub fn full_scan_forbidden(table: impl Into<String>) -> Self {
        Self::FullScanForbidden {
            table: table.into(),
        }
    }
}
