//! Database registry.

use crate::config::{Config, TableConfig};
use crate::error::{DbError, DbResult};
use crate::hook::Hook;
use crate::table::{HookList, Table};
use crate::typed::TypedTable;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// The main database handle.
///
/// A `Database` is a registry of named tables sharing one [`Config`] and
/// one list of database-wide hooks. Everything lives in memory.
///
/// ```rust,ignore
/// use tabula_core::{Database, TableConfig};
///
/// let db = Database::default();
/// let users = db.create_table("users", TableConfig::new().index("age"))?;
/// assert!(db.table("users").is_some());
/// ```
pub struct Database {
    /// Configuration shared by every table.
    config: Arc<Config>,
    /// Tables by name.
    tables: RwLock<BTreeMap<String, Table>>,
    /// Hooks applied to every table, in registration order.
    hooks: HookList,
}

impl Database {
    /// Creates an empty database.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            tables: RwLock::new(BTreeMap::new()),
            hooks: HookList::default(),
        }
    }

    /// Creates a table.
    ///
    /// # Errors
    ///
    /// `TableAlreadyExists` if the name is taken, `InvalidTableConfig` if the
    /// configuration does not validate.
    pub fn create_table(&self, name: &str, config: TableConfig) -> DbResult<Table> {
        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            return Err(DbError::TableAlreadyExists {
                name: name.to_string(),
            });
        }
        let table = Table::new(name, &config, Arc::clone(&self.config), Arc::clone(&self.hooks))?;
        tables.insert(name.to_string(), table.clone());
        Ok(table)
    }

    /// Creates a typed table. See [`TypedTable`].
    pub fn create_typed_table<T>(&self, name: &str, config: TableConfig) -> DbResult<TypedTable<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        self.create_table(name, config).map(TypedTable::new)
    }

    /// Returns a table by name.
    pub fn table(&self, name: &str) -> Option<Table> {
        self.tables.read().get(name).cloned()
    }

    /// Returns the table names in sorted order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    /// Removes a table from the registry. Existing handles keep working.
    pub fn drop_table(&self, name: &str) -> bool {
        let dropped = self.tables.write().remove(name).is_some();
        if dropped {
            debug!(table = name, "table dropped");
        }
        dropped
    }

    /// Adds a hook that applies to every table, before table hooks.
    pub fn add_hook(&self, hook: impl Hook + 'static) {
        self.hooks.write().push(Arc::new(hook));
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("tables", &self.table_names())
            .finish_non_exhaustive()
    }
}
