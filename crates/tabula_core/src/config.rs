//! Database and table configuration.

use crate::error::{DbError, DbResult};

/// Configuration for a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Primary key field used by tables that do not name one.
    pub default_primary_key: String,

    /// Emit a warning when a full scan visits more rows than this (0 = never).
    pub scan_warning_threshold: usize,

    /// In strict mode, queries that need a full table scan fail.
    pub forbid_full_scans: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_primary_key: "id".to_string(),
            scan_warning_threshold: 1000,
            forbid_full_scans: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default primary key field.
    #[must_use]
    pub fn default_primary_key(mut self, field: impl Into<String>) -> Self {
        self.default_primary_key = field.into();
        self
    }

    /// Sets the full scan warning threshold.
    #[must_use]
    pub const fn scan_warning_threshold(mut self, rows: usize) -> Self {
        self.scan_warning_threshold = rows;
        self
    }

    /// Sets whether full table scans are forbidden.
    #[must_use]
    pub const fn forbid_full_scans(mut self, value: bool) -> Self {
        self.forbid_full_scans = value;
        self
    }
}

/// Configuration for a single table.
#[derive(Debug, Clone, Default)]
pub struct TableConfig {
    /// Primary key field. `None` uses the database default.
    pub primary_key: Option<String>,

    /// Fields that get a secondary index, in declaration order.
    pub indexes: Vec<String>,
}

impl TableConfig {
    /// Creates a table configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the primary key field.
    #[must_use]
    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = Some(field.into());
        self
    }

    /// Adds a secondary index on a field.
    #[must_use]
    pub fn index(mut self, field: impl Into<String>) -> Self {
        self.indexes.push(field.into());
        self
    }

    /// Resolves the primary key against the database defaults and validates
    /// the index list.
    pub(crate) fn resolve(&self, config: &Config) -> DbResult<(String, Vec<String>)> {
        let primary = self
            .primary_key
            .clone()
            .unwrap_or_else(|| config.default_primary_key.clone());

        if primary.is_empty() {
            return Err(DbError::invalid_config("primary key field name is empty"));
        }

        let mut indexes: Vec<String> = Vec::with_capacity(self.indexes.len());
        for field in &self.indexes {
            if field.is_empty() {
                return Err(DbError::invalid_config("index field name is empty"));
            }
            if *field == primary {
                return Err(DbError::invalid_config(format!(
                    "field {field:?} is the primary key and cannot have a secondary index"
                )));
            }
            if indexes.contains(field) {
                return Err(DbError::invalid_config(format!(
                    "duplicate index on field {field:?}"
                )));
            }
            indexes.push(field.clone());
        }

        Ok((primary, indexes))
    }
}
