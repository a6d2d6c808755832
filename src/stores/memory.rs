//! In-memory store
//!
//! Tables are insertion-ordered record lists behind one `RwLock`.
//! Implements only the single-record primitives; the engine synthesizes
//! the Many variants. `find_one` owns the skip bookkeeping the read
//! polyfill relies on: it counts matches in insertion order and returns
//! match number `options.skip`.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::adapter::{BoxFuture, Capabilities, Store, StoreError, StoreResult};
use crate::query::{CanonicalQuery, Matcher, OperatorRegistry, QueryOptions};

/// Process-local store backed by a map of record lists
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    operators: OperatorRegistry,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose matcher recognizes the given custom operators
    pub fn with_operators(operators: OperatorRegistry) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            operators,
        }
    }

    /// Index of match number `options.skip` within a table, in
    /// insertion order
    fn position_of_match(
        &self,
        records: &[Value],
        query: &CanonicalQuery,
        options: &QueryOptions,
    ) -> Option<usize> {
        let mut seen = 0u64;
        for (index, record) in records.iter().enumerate() {
            if Matcher::matches(query, record, &self.operators) {
                if seen == options.skip {
                    return Some(index);
                }
                seen += 1;
            }
        }
        None
    }
}

/// Deep-copy a record, assigning a UUID v4 `id` when absent
fn with_uid(record: &Value) -> StoreResult<Value> {
    let mut fields: Map<String, Value> = record
        .as_object()
        .cloned()
        .ok_or_else(|| StoreError::Serialization(format!(
            "records must be JSON objects, got {}",
            record
        )))?;
    let has_uid = matches!(fields.get("id"), Some(Value::String(_)) | Some(Value::Number(_)));
    if !has_uid {
        fields.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    Ok(Value::Object(fields))
}

/// Shallow-merge update fields into a stored record
fn apply_update(record: &mut Value, update: &Value) {
    if let (Some(fields), Some(updates)) = (record.as_object_mut(), update.as_object()) {
        for (key, value) in updates {
            fields.insert(key.clone(), value.clone());
        }
    }
}

impl Store for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::one_primitives()
    }

    fn find_one<'a>(
        &'a self,
        table: &'a str,
        query: &'a CanonicalQuery,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, StoreResult<Option<Value>>> {
        Box::pin(async move {
            let tables = self.tables.read().expect("table lock poisoned");
            let records = match tables.get(table) {
                Some(records) => records,
                None => return Ok(None),
            };
            Ok(self
                .position_of_match(records, query, options)
                .map(|index| records[index].clone()))
        })
    }

    fn insert_one<'a>(
        &'a self,
        table: &'a str,
        record: &'a Value,
    ) -> BoxFuture<'a, StoreResult<Option<Value>>> {
        Box::pin(async move {
            let stored = with_uid(record)?;
            let mut tables = self.tables.write().expect("table lock poisoned");
            tables
                .entry(table.to_string())
                .or_default()
                .push(stored.clone());
            Ok(Some(stored))
        })
    }

    fn update_one<'a>(
        &'a self,
        table: &'a str,
        query: &'a CanonicalQuery,
        update: &'a Value,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, StoreResult<Option<Value>>> {
        Box::pin(async move {
            let mut tables = self.tables.write().expect("table lock poisoned");
            let records = match tables.get_mut(table) {
                Some(records) => records,
                None => return Ok(None),
            };
            let index = match self.position_of_match(records, query, options) {
                Some(index) => index,
                None => return Ok(None),
            };
            apply_update(&mut records[index], update);
            Ok(Some(records[index].clone()))
        })
    }

    fn delete_one<'a>(
        &'a self,
        table: &'a str,
        query: &'a CanonicalQuery,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, StoreResult<Option<Value>>> {
        Box::pin(async move {
            let mut tables = self.tables.write().expect("table lock poisoned");
            let records = match tables.get_mut(table) {
                Some(records) => records,
                None => return Ok(None),
            };
            Ok(self
                .position_of_match(records, query, options)
                .map(|index| records.remove(index)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryNormalizer;
    use serde_json::json;

    fn store_with(records: &[Value]) -> MemoryStore {
        let mut tables = HashMap::new();
        tables.insert("users".to_string(), records.to_vec());
        MemoryStore {
            tables: RwLock::new(tables),
            operators: OperatorRegistry::new(),
        }
    }

    fn query(raw: Value) -> CanonicalQuery {
        QueryNormalizer::normalize(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_find_one_honors_skip() {
        let store = store_with(&[
            json!({ "id": "a", "role": "dev" }),
            json!({ "id": "b", "role": "ops" }),
            json!({ "id": "c", "role": "dev" }),
        ]);
        let q = query(json!({ "role": "dev" }));

        let mut options = QueryOptions::default();
        let first = store.find_one("users", &q, &options).await.unwrap().unwrap();
        assert_eq!(first["id"], "a");

        options.skip = 1;
        let second = store.find_one("users", &q, &options).await.unwrap().unwrap();
        assert_eq!(second["id"], "c");

        options.skip = 2;
        assert!(store.find_one("users", &q, &options).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_assigns_uid() {
        let store = MemoryStore::new();
        let stored = store
            .insert_one("users", &json!({ "name": "Alice" }))
            .await
            .unwrap()
            .unwrap();
        assert!(stored["id"].is_string());

        // Caller-provided ids survive
        let kept = store
            .insert_one("users", &json!({ "id": "fixed", "name": "Bob" }))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept["id"], "fixed");
    }

    #[tokio::test]
    async fn test_insert_rejects_non_objects() {
        let store = MemoryStore::new();
        let err = store.insert_one("users", &json!(42)).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_update_one_merges_fields() {
        let store = store_with(&[json!({ "id": "a", "role": "dev", "age": 30 })]);
        let q = query(json!({ "id": "a" }));
        let updated = store
            .update_one("users", &q, &json!({ "age": 31 }), &QueryOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["age"], 31);
        assert_eq!(updated["role"], "dev");
    }

    #[tokio::test]
    async fn test_delete_one_removes_first_match() {
        let store = store_with(&[
            json!({ "id": "a", "role": "dev" }),
            json!({ "id": "b", "role": "dev" }),
        ]);
        let q = query(json!({ "role": "dev" }));
        let removed = store
            .delete_one("users", &q, &QueryOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(removed["id"], "a");

        let remaining = store
            .find_one("users", &q, &QueryOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(remaining["id"], "b");
    }

    #[tokio::test]
    async fn test_unimplemented_many_primitive_reports_unsupported() {
        let store = MemoryStore::new();
        let err = store
            .find_many("users", &query(json!(null)), &QueryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Unsupported { primitive: "find_many" });
    }
}
