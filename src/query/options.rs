//! Options normalizer: defaults and per-option transforms
//!
//! Raw options arrive as JSON; the canonical form is `QueryOptions`,
//! with every recognized option defaulted or validated exactly once.
//! Store-specific options pass through registered transforms into
//! `extra`. Normalizing the canonical rendering is a no-op.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::errors::{QueryError, QueryResult};

/// Result-count bound for a multi-record operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Limit {
    /// No bound: collect until the store runs out of matches
    #[default]
    Unbounded,
    /// Collect at most this many results (always >= 1)
    At(u64),
}

/// Sort direction for one sort field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One field of a sort specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Canonical query options
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Matches to pass over before collecting results
    pub skip: u64,
    /// Result-count bound
    pub limit: Limit,
    /// Remap field names on the way into the store
    pub remap_input: bool,
    /// Remap field names on the way out of the store
    pub remap_output: bool,
    /// Sort specification, applied by stores with native ordering
    pub sort: Vec<SortSpec>,
    /// Store-specific options, already transformed
    pub extra: BTreeMap<String, Value>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: Limit::Unbounded,
            remap_input: true,
            remap_output: true,
            sort: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl QueryOptions {
    /// A copy with the limit forced to 1, for the "One" CRUD variants
    pub fn limited_to_one(&self) -> Self {
        let mut options = self.clone();
        options.limit = Limit::At(1);
        options
    }

    /// Canonical JSON rendering, suitable for the wire and for
    /// re-normalization (idempotency)
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("skip".to_string(), json!(self.skip));
        map.insert(
            "limit".to_string(),
            match self.limit {
                Limit::Unbounded => Value::Null,
                Limit::At(n) => json!(n),
            },
        );
        map.insert("remapInput".to_string(), json!(self.remap_input));
        map.insert("remapOutput".to_string(), json!(self.remap_output));
        if !self.sort.is_empty() {
            let sort: Vec<Value> = self
                .sort
                .iter()
                .map(|s| json!({ "field": s.field, "direction": s.direction.as_str() }))
                .collect();
            map.insert("sort".to_string(), Value::Array(sort));
        }
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }
}

/// Transform applied to one store-specific option value.
///
/// Transforms must be idempotent: re-normalizing canonical options
/// re-applies them to their own output.
pub type OptionTransform = Arc<dyn Fn(Value) -> QueryResult<Value> + Send + Sync>;

/// Fills defaults and applies registered transforms to raw options
#[derive(Clone, Default)]
pub struct OptionsNormalizer {
    transforms: BTreeMap<String, OptionTransform>,
}

impl OptionsNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform for a store-specific option key
    pub fn register_transform<F>(&mut self, option: impl Into<String>, transform: F)
    where
        F: Fn(Value) -> QueryResult<Value> + Send + Sync + 'static,
    {
        self.transforms.insert(option.into(), Arc::new(transform));
    }

    /// Canonicalize raw options.
    ///
    /// Absent or `null` options yield the defaults. The raw value is
    /// never mutated; recognized options are validated, everything else
    /// lands in `extra` after its transform (if any).
    pub fn normalize(&self, raw: Option<&Value>) -> QueryResult<QueryOptions> {
        let raw = match raw {
            None | Some(Value::Null) => return Ok(QueryOptions::default()),
            Some(value) => value,
        };
        let map = raw.as_object().ok_or_else(|| QueryError::InvalidOption {
            option: "options".to_string(),
            message: format!("expected a JSON object, got {}", raw),
        })?;

        let mut options = QueryOptions::default();
        for (key, value) in map {
            match key.as_str() {
                "skip" => options.skip = parse_skip(value)?,
                "limit" => options.limit = parse_limit(value)?,
                "remapInput" => options.remap_input = parse_flag(key, value)?,
                "remapOutput" => options.remap_output = parse_flag(key, value)?,
                "sort" => options.sort = parse_sort(value)?,
                other => {
                    let transformed = match self.transforms.get(other) {
                        Some(transform) => transform(value.clone())?,
                        None => value.clone(),
                    };
                    options.extra.insert(other.to_string(), transformed);
                }
            }
        }
        Ok(options)
    }
}

impl fmt::Debug for OptionsNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsNormalizer")
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn parse_skip(value: &Value) -> QueryResult<u64> {
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => n.as_u64().ok_or_else(|| QueryError::InvalidOption {
            option: "skip".to_string(),
            message: format!("must be a non-negative integer, got {}", value),
        }),
        other => Err(QueryError::InvalidOption {
            option: "skip".to_string(),
            message: format!("must be a non-negative integer, got {}", other),
        }),
    }
}

fn parse_limit(value: &Value) -> QueryResult<Limit> {
    match value {
        Value::Null => Ok(Limit::Unbounded),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(Limit::Unbounded),
            Some(n) => Ok(Limit::At(n)),
            None => Err(QueryError::InvalidOption {
                option: "limit".to_string(),
                message: format!("must be a positive integer or null, got {}", value),
            }),
        },
        other => Err(QueryError::InvalidOption {
            option: "limit".to_string(),
            message: format!("must be a positive integer or null, got {}", other),
        }),
    }
}

fn parse_flag(option: &str, value: &Value) -> QueryResult<bool> {
    value.as_bool().ok_or_else(|| QueryError::InvalidOption {
        option: option.to_string(),
        message: format!("must be a boolean, got {}", value),
    })
}

/// Accepts `"field"`, `{"field": .., "direction": ..}`, or an array of
/// either; direction defaults to ascending
fn parse_sort(value: &Value) -> QueryResult<Vec<SortSpec>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(field) => Ok(vec![SortSpec::asc(field.clone())]),
        Value::Object(_) => Ok(vec![parse_sort_entry(value)?]),
        Value::Array(entries) => entries.iter().map(parse_sort_entry).collect(),
        other => Err(QueryError::InvalidOption {
            option: "sort".to_string(),
            message: format!("must be a field name or an array of sort specs, got {}", other),
        }),
    }
}

fn parse_sort_entry(entry: &Value) -> QueryResult<SortSpec> {
    match entry {
        Value::String(field) => Ok(SortSpec::asc(field.clone())),
        Value::Object(spec) => {
            let field = spec
                .get("field")
                .and_then(Value::as_str)
                .ok_or_else(|| QueryError::InvalidOption {
                    option: "sort".to_string(),
                    message: "sort spec requires a `field` string".to_string(),
                })?;
            let direction = match spec.get("direction").and_then(Value::as_str) {
                None | Some("asc") => SortDirection::Asc,
                Some("desc") => SortDirection::Desc,
                Some(other) => {
                    return Err(QueryError::InvalidOption {
                        option: "sort".to_string(),
                        message: format!("direction must be `asc` or `desc`, got {}", other),
                    })
                }
            };
            Ok(SortSpec {
                field: field.to_string(),
                direction,
            })
        }
        other => Err(QueryError::InvalidOption {
            option: "sort".to_string(),
            message: format!("sort entries must be strings or objects, got {}", other),
        }),
    }
}
