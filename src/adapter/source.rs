//! DataSource: the adapter base
//!
//! Glues the engine together around one concrete store: normalizes
//! queries and options, remaps field names in both directions, routes
//! each CRUD call to the store's native primitive or its polyfill, and
//! casts results into entities. Owns the per-table remap/filter tables
//! and the lifecycle state.
//!
//! Dispatch is capability-driven: the descriptor the store declared at
//! construction decides native-vs-polyfilled once per call, with no
//! inheritance-based fallback chain.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use super::capability::Capabilities;
use super::contract::Store;
use super::errors::{AdapterError, ConfigError, StoreResult};
use super::iterator::collect_bounded;
use super::state::{AdapterState, ReadinessGate};
use super::BoxFuture;
use crate::entity::Entity;
use crate::observability::Logger;
use crate::query::{
    CanonicalQuery, OptionsNormalizer, QueryNormalizer, QueryOptions, QueryResult,
};
use crate::remap::{FilterTable, RemapTable};

/// Per-table remap and cast configuration
#[derive(Debug, Clone, Default)]
struct TableConfig {
    remap: RemapTable,
    filters: FilterTable,
}

/// One configured data source: a store plus the engine around it
pub struct DataSource {
    name: String,
    store: Arc<dyn Store>,
    capabilities: Capabilities,
    gate: ReadinessGate,
    tables: RwLock<HashMap<String, TableConfig>>,
    options: RwLock<OptionsNormalizer>,
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl DataSource {
    /// Wrap a store without starting setup. The store's capability
    /// descriptor is validated here: every CRUD pair needs at least one
    /// native side.
    pub fn new(name: impl Into<String>, store: impl Store + 'static) -> Result<Arc<Self>, ConfigError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        let capabilities = store.capabilities();
        capabilities.validate()?;
        Ok(Arc::new(Self {
            name,
            store: Arc::new(store),
            capabilities,
            gate: ReadinessGate::new(),
            tables: RwLock::new(HashMap::new()),
            options: RwLock::new(OptionsNormalizer::new()),
        }))
    }

    /// Wrap a store and run its setup on a background task
    pub fn connect(
        name: impl Into<String>,
        store: impl Store + 'static,
    ) -> Result<Arc<Self>, ConfigError> {
        let source = Self::new(name, store)?;
        let task = Arc::clone(&source);
        tokio::spawn(async move { task.setup().await });
        Ok(source)
    }

    /// Run the store's backing-resource setup and transition the
    /// lifecycle gate. Idempotent: terminal states ignore re-entry.
    pub async fn setup(&self) {
        match self.store.prepare().await {
            Ok(()) => {
                Logger::info(
                    "datasource_ready",
                    &[("source", &self.name), ("store", self.store.name())],
                );
                self.gate.mark_ready();
            }
            Err(error) => {
                let message = error.to_string();
                Logger::error(
                    "datasource_setup_failed",
                    &[("source", &self.name), ("error", &message)],
                );
                self.gate.mark_failed(AdapterError::Setup(message));
            }
        }
    }

    /// This source's registry name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> AdapterState {
        self.gate.state()
    }

    /// Resolve once setup has succeeded, or reject with the stored
    /// setup error
    pub async fn wait_until_ready(&self) -> Result<(), AdapterError> {
        self.gate.wait().await
    }

    /// Configure a table's field remaps and value casts. Called once
    /// per table, before operations touch it.
    pub fn configure_table(
        &self,
        table: impl Into<String>,
        remaps: BTreeMap<String, String>,
        filters: Option<FilterTable>,
    ) -> Result<(), ConfigError> {
        let table = table.into();
        let remap = RemapTable::new(remaps)?;
        let mut tables = self.tables.write().expect("table lock poisoned");
        if tables.contains_key(&table) {
            return Err(ConfigError::TableAlreadyConfigured(table));
        }
        Logger::trace("table_configured", &[("source", &self.name), ("table", &table)]);
        tables.insert(
            table,
            TableConfig {
                remap,
                filters: filters.unwrap_or_default(),
            },
        );
        Ok(())
    }

    /// Register a transform for a store-specific option key
    pub fn register_option_transform<F>(&self, option: impl Into<String>, transform: F)
    where
        F: Fn(Value) -> QueryResult<Value> + Send + Sync + 'static,
    {
        self.options
            .write()
            .expect("options lock poisoned")
            .register_transform(option, transform);
    }

    /// Canonicalize a raw query (exposed so stores and callers can
    /// canonicalize without issuing an operation)
    pub fn normalize_query(raw: &Value) -> QueryResult<CanonicalQuery> {
        QueryNormalizer::normalize(raw)
    }

    /// Canonicalize raw options with this source's registered
    /// transforms
    pub fn normalize_options(&self, raw: Option<&Value>) -> QueryResult<QueryOptions> {
        self.options
            .read()
            .expect("options lock poisoned")
            .normalize(raw)
    }

    /// Fetch the first match after `skip`
    pub async fn find_one(
        &self,
        table: &str,
        query: &Value,
        options: Option<&Value>,
    ) -> Result<Option<Entity>, AdapterError> {
        self.gate.wait().await?;
        let options = self.normalize_options(options)?.limited_to_one();
        let (canonical, config) = self.prepare_query(table, query, &options)?;

        let record = if self.capabilities.find_one {
            self.store.find_one(table, &canonical, &options).await?
        } else if self.capabilities.find_many {
            self.store
                .find_many(table, &canonical, &options)
                .await?
                .into_iter()
                .next()
        } else {
            return Err(AdapterError::MissingCapability { pair: "find" });
        };
        Ok(record.map(|r| self.cast_entity(&config, &options, r)))
    }

    /// Fetch every match within skip/limit
    pub async fn find_many(
        &self,
        table: &str,
        query: &Value,
        options: Option<&Value>,
    ) -> Result<Vec<Entity>, AdapterError> {
        self.gate.wait().await?;
        let options = self.normalize_options(options)?;
        let (canonical, config) = self.prepare_query(table, query, &options)?;

        let records = if self.capabilities.find_many {
            self.store.find_many(table, &canonical, &options).await?
        } else if self.capabilities.find_one {
            let store = self.store.as_ref();
            let query = &canonical;
            let base = &options;
            collect_bounded(options.limit, move |collected| {
                // Successive calls see successive matches
                let mut per_call = base.clone();
                per_call.skip = base.skip + collected;
                let future = async move { store.find_one(table, query, &per_call).await };
                Box::pin(future) as BoxFuture<'_, StoreResult<Option<Value>>>
            })
            .await?
        } else {
            return Err(AdapterError::MissingCapability { pair: "find" });
        };
        Ok(self.cast_entities(&config, &options, records))
    }

    /// Persist one record
    pub async fn insert_one(
        &self,
        table: &str,
        record: &Value,
        options: Option<&Value>,
    ) -> Result<Option<Entity>, AdapterError> {
        self.gate.wait().await?;
        let options = self.normalize_options(options)?.limited_to_one();
        let config = self.table_config(table);
        let prepared = self.prepare_record(&config, &options, record);

        let stored = if self.capabilities.insert_one {
            self.store.insert_one(table, &prepared).await?
        } else if self.capabilities.insert_many {
            // One-element Many call; exactly its first result
            let batch = [prepared];
            self.store
                .insert_many(table, &batch)
                .await?
                .into_iter()
                .next()
        } else {
            return Err(AdapterError::MissingCapability { pair: "insert" });
        };
        Ok(stored.map(|r| self.cast_entity(&config, &options, r)))
    }

    /// Persist records in order; results that the store produced
    /// nothing for are compacted out
    pub async fn insert_many(
        &self,
        table: &str,
        records: &[Value],
        options: Option<&Value>,
    ) -> Result<Vec<Entity>, AdapterError> {
        self.gate.wait().await?;
        let options = self.normalize_options(options)?;
        let config = self.table_config(table);
        let prepared: Vec<Value> = records
            .iter()
            .map(|record| self.prepare_record(&config, &options, record))
            .collect();

        let stored = if self.capabilities.insert_many {
            self.store.insert_many(table, &prepared).await?
        } else if self.capabilities.insert_one {
            // Strictly sequential: one in-flight store call at a time
            let mut stored = Vec::with_capacity(prepared.len());
            for record in &prepared {
                if let Some(result) = self.store.insert_one(table, record).await? {
                    stored.push(result);
                }
            }
            stored
        } else {
            return Err(AdapterError::MissingCapability { pair: "insert" });
        };
        Ok(self.cast_entities(&config, &options, stored))
    }

    /// Update the first match after `skip`
    pub async fn update_one(
        &self,
        table: &str,
        query: &Value,
        update: &Value,
        options: Option<&Value>,
    ) -> Result<Option<Entity>, AdapterError> {
        self.gate.wait().await?;
        let options = self.normalize_options(options)?.limited_to_one();
        let (canonical, config) = self.prepare_query(table, query, &options)?;
        let update = self.prepare_record(&config, &options, update);

        let record = if self.capabilities.update_one {
            self.store
                .update_one(table, &canonical, &update, &options)
                .await?
        } else if self.capabilities.update_many {
            self.store
                .update_many(table, &canonical, &update, &options)
                .await?
                .into_iter()
                .next()
        } else {
            return Err(AdapterError::MissingCapability { pair: "update" });
        };
        Ok(record.map(|r| self.cast_entity(&config, &options, r)))
    }

    /// Update every match within skip/limit
    pub async fn update_many(
        &self,
        table: &str,
        query: &Value,
        update: &Value,
        options: Option<&Value>,
    ) -> Result<Vec<Entity>, AdapterError> {
        self.gate.wait().await?;
        let options = self.normalize_options(options)?;
        let (canonical, config) = self.prepare_query(table, query, &options)?;
        let update = self.prepare_record(&config, &options, update);

        let records = if self.capabilities.update_many {
            self.store
                .update_many(table, &canonical, &update, &options)
                .await?
        } else if self.capabilities.update_one {
            let store = self.store.as_ref();
            let query = &canonical;
            let update = &update;
            let per_call = options.limited_to_one();
            let per_call = &per_call;
            collect_bounded(options.limit, move |_collected| {
                // Same query each time: an applied update removes the
                // record from future matches
                let future =
                    async move { store.update_one(table, query, update, per_call).await };
                Box::pin(future) as BoxFuture<'_, StoreResult<Option<Value>>>
            })
            .await?
        } else {
            return Err(AdapterError::MissingCapability { pair: "update" });
        };
        Ok(self.cast_entities(&config, &options, records))
    }

    /// Remove the first match after `skip`, returning it
    pub async fn delete_one(
        &self,
        table: &str,
        query: &Value,
        options: Option<&Value>,
    ) -> Result<Option<Entity>, AdapterError> {
        self.gate.wait().await?;
        let options = self.normalize_options(options)?.limited_to_one();
        let (canonical, config) = self.prepare_query(table, query, &options)?;

        let record = if self.capabilities.delete_one {
            self.store.delete_one(table, &canonical, &options).await?
        } else if self.capabilities.delete_many {
            self.store
                .delete_many(table, &canonical, &options)
                .await?
                .into_iter()
                .next()
        } else {
            return Err(AdapterError::MissingCapability { pair: "delete" });
        };
        Ok(record.map(|r| self.cast_entity(&config, &options, r)))
    }

    /// Remove every match within skip/limit, returning them
    pub async fn delete_many(
        &self,
        table: &str,
        query: &Value,
        options: Option<&Value>,
    ) -> Result<Vec<Entity>, AdapterError> {
        self.gate.wait().await?;
        let options = self.normalize_options(options)?;
        let (canonical, config) = self.prepare_query(table, query, &options)?;

        let records = if self.capabilities.delete_many {
            self.store.delete_many(table, &canonical, &options).await?
        } else if self.capabilities.delete_one {
            let store = self.store.as_ref();
            let query = &canonical;
            let per_call = options.limited_to_one();
            let per_call = &per_call;
            collect_bounded(options.limit, move |_collected| {
                // Same query each time: each delete shrinks the match set
                let future = async move { store.delete_one(table, query, per_call).await };
                Box::pin(future) as BoxFuture<'_, StoreResult<Option<Value>>>
            })
            .await?
        } else {
            return Err(AdapterError::MissingCapability { pair: "delete" });
        };
        Ok(self.cast_entities(&config, &options, records))
    }

    /// Canonicalize and input-remap a raw query
    fn prepare_query(
        &self,
        table: &str,
        query: &Value,
        options: &QueryOptions,
    ) -> Result<(CanonicalQuery, TableConfig), AdapterError> {
        let canonical = QueryNormalizer::normalize(query)?;
        let config = self.table_config(table);
        let canonical = if options.remap_input {
            config.remap.remap_query(&canonical)
        } else {
            canonical
        };
        Ok((canonical, config))
    }

    /// Input-remap a record headed into the store
    fn prepare_record(&self, config: &TableConfig, options: &QueryOptions, record: &Value) -> Value {
        if options.remap_input {
            config.remap.remap_input(record)
        } else {
            record.clone()
        }
    }

    /// Snapshot of a table's configuration; unconfigured tables get the
    /// identity remap and no casts
    fn table_config(&self, table: &str) -> TableConfig {
        self.tables
            .read()
            .expect("table lock poisoned")
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Cast one store record into an entity: extract the UID, remap
    /// field names outward, apply value casts
    fn cast_entity(&self, config: &TableConfig, options: &QueryOptions, record: Value) -> Entity {
        let uid = record.get("id").and_then(uid_string);
        let attributes = if options.remap_output {
            config.filters.apply(&config.remap.remap_output(&record))
        } else {
            record
        };
        let mut entity = Entity::from_attributes(attributes);
        if let Some(uid) = uid {
            entity.id_hash.insert(self.name.clone(), uid);
        }
        entity
    }

    fn cast_entities(
        &self,
        config: &TableConfig,
        options: &QueryOptions,
        records: Vec<Value>,
    ) -> Vec<Entity> {
        records
            .into_iter()
            .map(|record| self.cast_entity(config, options, record))
            .collect()
    }
}

/// Store-assigned UIDs are opaque strings; numeric ids are rendered
fn uid_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
