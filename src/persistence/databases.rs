//! Named databases with a current selector

use super::storage::{validate_database_name, JsonStorage};
use super::PersistenceResult;
use crate::config::DatabaseConfig;
use crate::graph::GraphStore;
use crate::query::CypherExecutor;
use std::collections::HashMap;
use tracing::{debug, info};

/// A set of named graph stores, one of which is current
///
/// Stores are loaded from [`JsonStorage`] the first time they are selected
/// and stay resident afterwards. Without a data path every database lives
/// only in memory and [`save`](Self::save) does nothing.
#[derive(Debug)]
pub struct GraphDatabase {
    current_name: String,
    current: GraphStore,
    /// Resident databases other than the current one
    parked: HashMap<String, GraphStore>,
    storage: Option<JsonStorage>,
}

impl GraphDatabase {
    /// Open the configured default database
    pub fn open(config: &DatabaseConfig) -> PersistenceResult<Self> {
        validate_database_name(&config.default_database)?;
        let storage = config
            .data_path
            .as_ref()
            .map(|path| JsonStorage::open(path, config.pretty))
            .transpose()?;

        let current = match &storage {
            Some(storage) => storage.load(&config.default_database)?,
            None => GraphStore::new(),
        };
        info!("Opened database '{}'", config.default_database);

        Ok(Self {
            current_name: config.default_database.clone(),
            current,
            parked: HashMap::new(),
            storage,
        })
    }

    /// In-memory handle on a database named `default`
    pub fn in_memory() -> Self {
        Self {
            current_name: DatabaseConfig::default().default_database,
            current: GraphStore::new(),
            parked: HashMap::new(),
            storage: None,
        }
    }

    /// Make `name` the current database, loading it on first use
    ///
    /// On error the current selection is unchanged.
    pub fn switch_database(&mut self, name: &str) -> PersistenceResult<()> {
        validate_database_name(name)?;
        if name == self.current_name {
            return Ok(());
        }

        let store = match self.parked.remove(name) {
            Some(store) => store,
            None => self.read(name)?,
        };
        self.make_current(name, store);
        info!("Switched to database '{}'", name);
        Ok(())
    }

    /// Reload `name` from storage, discarding any resident copy, and make
    /// it current
    pub fn load(&mut self, name: &str) -> PersistenceResult<()> {
        validate_database_name(name)?;
        let store = self.read(name)?;
        self.parked.remove(name);
        if name == self.current_name {
            self.current = store;
        } else {
            self.make_current(name, store);
        }
        info!("Loaded database '{}'", name);
        Ok(())
    }

    /// Persist the current database
    pub fn save(&self) -> PersistenceResult<()> {
        match &self.storage {
            Some(storage) => storage.save(&self.current_name, &self.current),
            None => {
                debug!("In-memory database '{}', nothing to save", self.current_name);
                Ok(())
            }
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.current
    }

    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.current
    }

    pub fn current_name(&self) -> &str {
        &self.current_name
    }

    /// Names of all resident databases, sorted
    pub fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.parked.keys().cloned().collect();
        names.push(self.current_name.clone());
        names.sort();
        names
    }

    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    pub fn storage(&self) -> Option<&JsonStorage> {
        self.storage.as_ref()
    }

    /// Query executor over this database with fresh session state
    pub fn executor(&mut self) -> CypherExecutor<'_> {
        CypherExecutor::new(self)
    }

    fn read(&self, name: &str) -> PersistenceResult<GraphStore> {
        match &self.storage {
            Some(storage) => storage.load(name),
            None => Ok(GraphStore::new()),
        }
    }

    fn make_current(&mut self, name: &str, store: GraphStore) {
        let previous = std::mem::replace(&mut self.current, store);
        let previous_name = std::mem::replace(&mut self.current_name, name.to_string());
        self.parked.insert(previous_name, previous);
    }
}

impl Default for GraphDatabase {
    fn default() -> Self {
        Self::in_memory()
    }
}
