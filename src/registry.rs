//! Data-source registry
//!
//! An explicit registry object passed by reference to whatever needs to
//! look up data sources. No process-wide singleton: tests and embedders
//! hold as many isolated registries as they want.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::adapter::{ConfigError, DataSource};

/// Named data sources, registered once and read concurrently
#[derive(Default)]
pub struct Registry {
    sources: RwLock<BTreeMap<String, Arc<DataSource>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a data source under its own name. Duplicate names are a
    /// configuration error, raised synchronously.
    pub fn register(&self, source: Arc<DataSource>) -> Result<(), ConfigError> {
        let name = source.name().to_string();
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        let mut sources = self.sources.write().expect("registry lock poisoned");
        if sources.contains_key(&name) {
            return Err(ConfigError::DuplicateSource(name));
        }
        sources.insert(name, source);
        Ok(())
    }

    /// Look up a data source by name
    pub fn get(&self, name: &str) -> Option<Arc<DataSource>> {
        self.sources
            .read()
            .expect("registry lock poisoned")
            .get(name)
            .cloned()
    }

    /// Registered names in deterministic order
    pub fn names(&self) -> Vec<String> {
        self.sources
            .read()
            .expect("registry lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sources.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
