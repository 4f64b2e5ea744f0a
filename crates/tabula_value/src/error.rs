//! Error types for the value crate.

use thiserror::Error;

/// Result type for value operations.
pub type ValueResult<T> = Result<T, ValueError>;

/// Errors that can occur converting to or from values.
#[derive(Error, Debug)]
pub enum ValueError {
    /// A row was expected but a non-object value was given.
    #[error("expected an object, found {found}")]
    NotAnObject {
        /// Type name of the value that was found.
        found: &'static str,
    },

    /// JSON conversion failed.
    #[error("json conversion failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl ValueError {
    /// Create a not-an-object error.
    pub fn not_an_object(found: &'static str) -> Self {
        Self::NotAnObject { found }
    }
}
