//! Entity value objects
//!
//! Entities are transient: constructed by the adapter's casting step on
//! the way out of a store, never shared by reference with the backing
//! medium. The `id_hash` maps each data-source name to that source's
//! UID for the logical record, so one record can be tracked across
//! multiple sources layered over one model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record as seen by application code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Remapped, cast attributes
    pub attributes: Value,
    /// data-source name -> store-assigned UID
    #[serde(rename = "idHash", default)]
    pub id_hash: BTreeMap<String, String>,
}

impl Entity {
    /// Wrap attributes with an empty id hash
    pub fn from_attributes(attributes: Value) -> Self {
        Self {
            attributes,
            id_hash: BTreeMap::new(),
        }
    }

    /// Wrap attributes and record the UID assigned by one source
    pub fn new(attributes: Value, source: impl Into<String>, uid: impl Into<String>) -> Self {
        let mut entity = Self::from_attributes(attributes);
        entity.id_hash.insert(source.into(), uid.into());
        entity
    }

    /// The UID this record carries in the named data source
    pub fn uid(&self, source: &str) -> Option<&str> {
        self.id_hash.get(source).map(String::as_str)
    }

    /// An attribute by field name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_uid_per_source() {
        let mut entity = Entity::new(json!({ "name": "Alice" }), "memory", "u-1");
        entity.id_hash.insert("remote".to_string(), "r-9".to_string());

        assert_eq!(entity.uid("memory"), Some("u-1"));
        assert_eq!(entity.uid("remote"), Some("r-9"));
        assert_eq!(entity.uid("file"), None);
    }

    #[test]
    fn test_attribute_access() {
        let entity = Entity::from_attributes(json!({ "age": 30 }));
        assert_eq!(entity.get("age"), Some(&json!(30)));
        assert_eq!(entity.get("name"), None);
    }

    #[test]
    fn test_serde_uses_id_hash_key() {
        let entity = Entity::new(json!({}), "memory", "u-1");
        let rendered = serde_json::to_value(&entity).unwrap();
        assert_eq!(rendered["idHash"]["memory"], "u-1");
    }
}
