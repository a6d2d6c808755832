//! Bidirectional field-name translation
//!
//! Built once per table from the external-to-store map; the inverse
//! direction is derived here and must be a bijection. Built at
//! collection-configuration time, read-only afterward.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::errors::RemapError;
use crate::query::CanonicalQuery;

/// Per-table field-name translation table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapTable {
    /// external field name -> store field name
    to_store: BTreeMap<String, String>,
    /// store field name -> external field name (derived inverse)
    to_external: BTreeMap<String, String>,
}

impl RemapTable {
    /// The identity table: every field passes through unchanged
    pub fn identity() -> Self {
        Self::default()
    }

    /// Build a table from the external-to-store map.
    ///
    /// Fails when two external fields target the same store field;
    /// a silent overwrite would make `remap_output` ambiguous.
    pub fn new(remaps: BTreeMap<String, String>) -> Result<Self, RemapError> {
        let mut to_external = BTreeMap::new();
        for (external, store) in &remaps {
            if let Some(first) = to_external.insert(store.clone(), external.clone()) {
                return Err(RemapError::DuplicateTarget {
                    target: store.clone(),
                    first,
                    second: external.clone(),
                });
            }
        }
        Ok(Self {
            to_store: remaps,
            to_external,
        })
    }

    /// Translate a record's field names external -> store
    pub fn remap_input(&self, record: &Value) -> Value {
        Self::rewrite(&self.to_store, record)
    }

    /// Translate a record's field names store -> external
    pub fn remap_output(&self, record: &Value) -> Value {
        Self::rewrite(&self.to_external, record)
    }

    /// Translate a canonical query's field names external -> store
    pub fn remap_query(&self, query: &CanonicalQuery) -> CanonicalQuery {
        query.remap_fields(&self.to_store)
    }

    /// Rewrite every mapped key, passing unmapped keys through.
    /// Non-object records carry no field names and are returned as-is.
    fn rewrite(map: &BTreeMap<String, String>, record: &Value) -> Value {
        let fields = match record.as_object() {
            Some(fields) => fields,
            None => return record.clone(),
        };
        let mut rewritten = Map::with_capacity(fields.len());
        for (key, value) in fields {
            let name = map.get(key).cloned().unwrap_or_else(|| key.clone());
            rewritten.insert(name, value.clone());
        }
        Value::Object(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(pairs: &[(&str, &str)]) -> RemapTable {
        let map = pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect();
        RemapTable::new(map).unwrap()
    }

    #[test]
    fn test_input_and_output_directions() {
        let table = table(&[("createdAt", "created_at")]);
        assert_eq!(
            table.remap_input(&json!({ "createdAt": 1, "name": "x" })),
            json!({ "created_at": 1, "name": "x" })
        );
        assert_eq!(
            table.remap_output(&json!({ "created_at": 1, "name": "x" })),
            json!({ "createdAt": 1, "name": "x" })
        );
    }

    #[test]
    fn test_unmapped_keys_pass_through() {
        let table = table(&[("a", "b")]);
        assert_eq!(
            table.remap_input(&json!({ "unknown": true })),
            json!({ "unknown": true })
        );
    }

    #[test]
    fn test_round_trip_identity() {
        let table = table(&[("createdAt", "created_at"), ("userId", "user_id")]);
        let record = json!({ "createdAt": 5, "userId": "u1" });
        assert_eq!(table.remap_output(&table.remap_input(&record)), record);
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), "x".to_string());
        map.insert("b".to_string(), "x".to_string());
        let err = RemapTable::new(map).unwrap_err();
        match err {
            RemapError::DuplicateTarget {
                target,
                first,
                second,
            } => {
                assert_eq!(target, "x");
                assert_eq!((first.as_str(), second.as_str()), ("a", "b"));
            }
        }
    }

    #[test]
    fn test_query_remap_uses_input_direction() {
        let table = table(&[("createdAt", "created_at")]);
        let query =
            crate::query::QueryNormalizer::normalize(&json!({ "createdAt": { "$gt": 1 } }))
                .unwrap();
        assert_eq!(
            table.remap_query(&query).to_value(),
            json!({ "created_at": { "$greater": 1 } })
        );
    }
}
