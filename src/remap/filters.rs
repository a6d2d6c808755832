//! Per-field value casts
//!
//! A filter table maps field names to pure cast functions applied when
//! a record's representation changes at the store boundary (for
//! example, RFC 3339 strings to epoch milliseconds). Casts apply only
//! to fields present in a given record.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// A pure value cast for one field
pub type CastFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Per-table mapping from field name to cast function
#[derive(Clone, Default)]
pub struct FilterTable {
    casts: BTreeMap<String, CastFn>,
}

impl FilterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cast for a field
    pub fn insert<F>(&mut self, field: impl Into<String>, cast: F)
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.casts.insert(field.into(), Arc::new(cast));
    }

    /// True when no casts are registered
    pub fn is_empty(&self) -> bool {
        self.casts.is_empty()
    }

    /// Apply registered casts to the fields present in a record.
    /// Fields without a cast and non-object records pass through.
    pub fn apply(&self, record: &Value) -> Value {
        if self.casts.is_empty() {
            return record.clone();
        }
        let fields = match record.as_object() {
            Some(fields) => fields,
            None => return record.clone(),
        };
        let mut out = fields.clone();
        for (field, cast) in &self.casts {
            if let Some(value) = out.get(field) {
                let cast_value = cast(value.clone());
                out.insert(field.clone(), cast_value);
            }
        }
        Value::Object(out)
    }
}

impl fmt::Debug for FilterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterTable")
            .field("casts", &self.casts.keys().collect::<Vec<_>>())
            .finish()
    }
}
