//! File-backed store
//!
//! One JSON file holds every table (the web-storage model: a single
//! keyed blob, read fully on open, rewritten on change). Tables load
//! into memory during `prepare`; every mutation rewrites the file
//! through a temp-file-then-rename so a crash mid-write never leaves a
//! torn store behind.
//!
//! Implements the multi-record primitives natively, with skip, limit,
//! and sort applied in-process; the engine derives the One variants.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;
use uuid::Uuid;

use crate::adapter::{BoxFuture, Capabilities, Store, StoreError, StoreResult};
use crate::query::{CanonicalQuery, Limit, Matcher, OperatorRegistry, QueryOptions, SortDirection, SortSpec};

/// JSON-file-backed store
pub struct FileStore {
    path: PathBuf,
    tables: RwLock<HashMap<String, Vec<Value>>>,
    operators: OperatorRegistry,
}

impl FileStore {
    /// A store persisting to the given file; the file need not exist
    /// yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tables: RwLock::new(HashMap::new()),
            operators: OperatorRegistry::new(),
        }
    }

    /// A store whose matcher recognizes the given custom operators
    pub fn with_operators(path: impl Into<PathBuf>, operators: OperatorRegistry) -> Self {
        Self {
            operators,
            ..Self::new(path)
        }
    }

    /// Rewrite the backing file atomically: write a sibling temp file,
    /// then rename over the target
    fn flush(&self, tables: &HashMap<String, Vec<Value>>) -> StoreResult<()> {
        let body = serde_json::to_vec_pretty(tables)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let temp = self.path.with_extension("tmp");
        fs::write(&temp, body).map_err(|e| StoreError::Io(e.to_string()))?;
        fs::rename(&temp, &self.path).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }

    /// Indices of the matches selected by skip and limit, in insertion
    /// order
    fn select_matches(
        &self,
        records: &[Value],
        query: &CanonicalQuery,
        options: &QueryOptions,
    ) -> Vec<usize> {
        let mut selected = Vec::new();
        let mut seen = 0u64;
        for (index, record) in records.iter().enumerate() {
            if !Matcher::matches(query, record, &self.operators) {
                continue;
            }
            if seen >= options.skip {
                selected.push(index);
                if let Limit::At(bound) = options.limit {
                    if selected.len() as u64 >= bound {
                        break;
                    }
                }
            }
            seen += 1;
        }
        selected
    }
}

fn load_tables(path: &Path) -> StoreResult<HashMap<String, Vec<Value>>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let body = fs::read(path).map_err(|e| StoreError::Io(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Deep-copy a record, assigning a UUID v4 `id` when absent
fn with_uid(record: &Value) -> StoreResult<Value> {
    let mut fields = record.as_object().cloned().ok_or_else(|| {
        StoreError::Serialization(format!("records must be JSON objects, got {}", record))
    })?;
    let has_uid = matches!(fields.get("id"), Some(Value::String(_)) | Some(Value::Number(_)));
    if !has_uid {
        fields.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    Ok(Value::Object(fields))
}

/// Stable sort by the given specs; earlier specs dominate.
///
/// Values order by type first (null < bool < number < string < array
/// < object), then naturally within a type.
fn sort_records(records: &mut [Value], specs: &[SortSpec]) {
    records.sort_by(|a, b| {
        for spec in specs {
            let ordering = compare_sort_values(a.get(&spec.field), b.get(&spec.field));
            let ordering = match spec.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
}

fn compare_sort_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    let type_order = |v: &Value| -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    };

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let by_type = type_order(a).cmp(&type_order(b));
            if by_type != Ordering::Equal {
                return by_type;
            }
            match (a, b) {
                (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
                (Value::Number(a), Value::Number(b)) => a
                    .as_f64()
                    .partial_cmp(&b.as_f64())
                    .unwrap_or(Ordering::Equal),
                (Value::String(a), Value::String(b)) => a.cmp(b),
                _ => Ordering::Equal,
            }
        }
    }
}

impl Store for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::many_primitives()
    }

    fn prepare<'a>(&'a self) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let loaded = load_tables(&self.path)?;
            *self.tables.write().expect("table lock poisoned") = loaded;
            Ok(())
        })
    }

    fn find_many<'a>(
        &'a self,
        table: &'a str,
        query: &'a CanonicalQuery,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, StoreResult<Vec<Value>>> {
        Box::pin(async move {
            let tables = self.tables.read().expect("table lock poisoned");
            let records = match tables.get(table) {
                Some(records) => records,
                None => return Ok(Vec::new()),
            };
            if options.sort.is_empty() {
                let selected = self.select_matches(records, query, options);
                return Ok(selected.into_iter().map(|i| records[i].clone()).collect());
            }
            // Sort the full match set, then window it
            let mut matches: Vec<Value> = records
                .iter()
                .filter(|r| Matcher::matches(query, r, &self.operators))
                .cloned()
                .collect();
            sort_records(&mut matches, &options.sort);
            let skipped = matches.into_iter().skip(options.skip as usize);
            Ok(match options.limit {
                Limit::Unbounded => skipped.collect(),
                Limit::At(bound) => skipped.take(bound as usize).collect(),
            })
        })
    }

    fn insert_many<'a>(
        &'a self,
        table: &'a str,
        records: &'a [Value],
    ) -> BoxFuture<'a, StoreResult<Vec<Value>>> {
        Box::pin(async move {
            let stored: Vec<Value> = records.iter().map(with_uid).collect::<StoreResult<_>>()?;
            let mut tables = self.tables.write().expect("table lock poisoned");
            tables
                .entry(table.to_string())
                .or_default()
                .extend(stored.iter().cloned());
            self.flush(&tables)?;
            Ok(stored)
        })
    }

    fn update_many<'a>(
        &'a self,
        table: &'a str,
        query: &'a CanonicalQuery,
        update: &'a Value,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, StoreResult<Vec<Value>>> {
        Box::pin(async move {
            let mut tables = self.tables.write().expect("table lock poisoned");
            let records = match tables.get_mut(table) {
                Some(records) => records,
                None => return Ok(Vec::new()),
            };
            let selected = self.select_matches(records, query, options);
            let mut updated = Vec::with_capacity(selected.len());
            for index in selected {
                if let (Some(fields), Some(updates)) =
                    (records[index].as_object_mut(), update.as_object())
                {
                    for (key, value) in updates {
                        fields.insert(key.clone(), value.clone());
                    }
                }
                updated.push(records[index].clone());
            }
            if !updated.is_empty() {
                self.flush(&tables)?;
            }
            Ok(updated)
        })
    }

    fn delete_many<'a>(
        &'a self,
        table: &'a str,
        query: &'a CanonicalQuery,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, StoreResult<Vec<Value>>> {
        Box::pin(async move {
            let mut tables = self.tables.write().expect("table lock poisoned");
            let records = match tables.get_mut(table) {
                Some(records) => records,
                None => return Ok(Vec::new()),
            };
            let selected = self.select_matches(records, query, options);
            let mut removed = Vec::with_capacity(selected.len());
            // Remove back-to-front so earlier indices stay valid
            for index in selected.into_iter().rev() {
                removed.push(records.remove(index));
            }
            removed.reverse();
            if !removed.is_empty() {
                self.flush(&tables)?;
            }
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryNormalizer;
    use serde_json::json;
    use tempfile::TempDir;

    fn query(raw: Value) -> CanonicalQuery {
        QueryNormalizer::normalize(&raw).unwrap()
    }

    fn temp_store(dir: &TempDir) -> FileStore {
        FileStore::new(dir.path().join("store.json"))
    }

    #[tokio::test]
    async fn test_prepare_without_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);
        store.prepare().await.unwrap();
        let all = store
            .find_many("users", &query(json!(null)), &QueryOptions::default())
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_prepare_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, b"not json").unwrap();
        let store = FileStore::new(&path);
        let err = store.prepare().await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_mutations_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = FileStore::new(&path);
            store.prepare().await.unwrap();
            store
                .insert_many(
                    "users",
                    &[json!({ "name": "Alice" }), json!({ "name": "Bob" })],
                )
                .await
                .unwrap();
        }

        let reopened = FileStore::new(&path);
        reopened.prepare().await.unwrap();
        let all = reopened
            .find_many("users", &query(json!(null)), &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["name"], "Alice");
    }

    #[tokio::test]
    async fn test_find_many_applies_skip_limit() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);
        store.prepare().await.unwrap();
        let records: Vec<Value> = (0..5).map(|n| json!({ "n": n })).collect();
        store.insert_many("nums", &records).await.unwrap();

        let mut options = QueryOptions::default();
        options.skip = 1;
        options.limit = Limit::At(2);
        let window = store
            .find_many("nums", &query(json!(null)), &options)
            .await
            .unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0]["n"], 1);
        assert_eq!(window[1]["n"], 2);
    }

    #[tokio::test]
    async fn test_find_many_sorts_before_windowing() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);
        store.prepare().await.unwrap();
        store
            .insert_many(
                "users",
                &[
                    json!({ "name": "Carol", "age": 41 }),
                    json!({ "name": "Alice", "age": 30 }),
                    json!({ "name": "Bob", "age": 25 }),
                ],
            )
            .await
            .unwrap();

        let mut options = QueryOptions::default();
        options.sort = vec![SortSpec::desc("age")];
        options.limit = Limit::At(2);
        let top = store
            .find_many("users", &query(json!(null)), &options)
            .await
            .unwrap();
        assert_eq!(top[0]["name"], "Carol");
        assert_eq!(top[1]["name"], "Alice");
    }

    #[tokio::test]
    async fn test_delete_many_windows_matches() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);
        store.prepare().await.unwrap();
        let records: Vec<Value> = (0..5).map(|n| json!({ "n": n, "kind": "x" })).collect();
        store.insert_many("nums", &records).await.unwrap();

        let mut options = QueryOptions::default();
        options.limit = Limit::At(2);
        let removed = store
            .delete_many("nums", &query(json!({ "kind": "x" })), &options)
            .await
            .unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0]["n"], 0);

        let left = store
            .find_many("nums", &query(json!(null)), &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(left.len(), 3);
    }

    #[tokio::test]
    async fn test_update_many_merges_and_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let store = FileStore::new(&path);
        store.prepare().await.unwrap();
        store
            .insert_many("users", &[json!({ "name": "Alice", "role": "dev" })])
            .await
            .unwrap();

        let updated = store
            .update_many(
                "users",
                &query(json!({ "name": "Alice" })),
                &json!({ "role": "ops" }),
                &QueryOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(updated[0]["role"], "ops");

        let reopened = FileStore::new(&path);
        reopened.prepare().await.unwrap();
        let all = reopened
            .find_many("users", &query(json!(null)), &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(all[0]["role"], "ops");
    }
}
