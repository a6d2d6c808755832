//! Query normalizer: shorthand queries to canonical form
//!
//! Accepts the three raw shapes callers write:
//! - a bare string/number (find by id)
//! - `{field: scalar}` (equality shorthand)
//! - `{field: {operator: operand}}` with aliases or canonical names
//!
//! and produces a `CanonicalQuery` whose every operator is a recognized
//! canonical `Condition`. Alias/canonical conflicts and out-of-domain
//! operands fail here, before any store access.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use super::errors::{QueryError, QueryResult};
use super::operator::Condition;

/// Operator aliases accepted on input, resolved to canonical names
const ALIASES: &[(&str, &str)] = &[
    ("$eq", "$equal"),
    ("$ne", "$diff"),
    ("$neq", "$diff"),
    ("$notEqual", "$diff"),
    ("$gt", "$greater"),
    ("$gte", "$greaterEqual"),
    ("$lt", "$less"),
    ("$lte", "$lessEqual"),
    ("$nin", "$notIn"),
    ("$regexp", "$regex"),
];

/// Resolves an operator key to its canonical name; unknown keys pass
/// through unchanged
fn resolve_alias(key: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(key)
}

/// A fully-expanded, alias-free query: field name to the conditions that
/// field must satisfy. All conditions are ANDed, within a field and
/// across fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalQuery {
    fields: BTreeMap<String, Vec<Condition>>,
}

impl CanonicalQuery {
    /// An empty query, which matches every record
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no field carries any condition
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Add a condition to a field
    pub fn insert(&mut self, field: impl Into<String>, condition: Condition) {
        self.fields.entry(field.into()).or_default().push(condition);
    }

    /// Iterate fields and their conditions in deterministic order
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Vec<Condition>)> {
        self.fields.iter()
    }

    /// Rewrite field names through a translation map; unmapped names
    /// pass through untouched
    pub fn remap_fields(&self, map: &BTreeMap<String, String>) -> CanonicalQuery {
        let fields = self
            .fields
            .iter()
            .map(|(field, conditions)| {
                let name = map.get(field).cloned().unwrap_or_else(|| field.clone());
                (name, conditions.clone())
            })
            .collect();
        CanonicalQuery { fields }
    }

    /// Canonical JSON rendering, suitable for the wire and for
    /// re-normalization (idempotency)
    pub fn to_value(&self) -> Value {
        let mut root = Map::with_capacity(self.fields.len());
        for (field, conditions) in &self.fields {
            root.insert(field.clone(), Condition::render_all(conditions));
        }
        Value::Object(root)
    }
}

/// Expands raw queries into `CanonicalQuery`
pub struct QueryNormalizer;

impl QueryNormalizer {
    /// Canonicalize a raw query.
    ///
    /// Never mutates `raw`; builds a fresh structure. `null` matches
    /// every record (the find-all query).
    pub fn normalize(raw: &Value) -> QueryResult<CanonicalQuery> {
        match raw {
            Value::Null => Ok(CanonicalQuery::new()),
            // Bare scalar: find by id
            Value::String(_) | Value::Number(_) => {
                Self::normalize(&json!({ "id": { "$equal": raw.clone() } }))
            }
            Value::Object(fields) => {
                let mut query = CanonicalQuery::new();
                for (field, descriptor) in fields {
                    for condition in Self::normalize_field(field, descriptor)? {
                        query.insert(field.clone(), condition);
                    }
                }
                Ok(query)
            }
            other => Err(QueryError::InvalidQuery(format!(
                "expected an object, string, or number, got {}",
                other
            ))),
        }
    }

    /// Canonicalize a single field descriptor
    fn normalize_field(field: &str, descriptor: &Value) -> QueryResult<Vec<Condition>> {
        match descriptor {
            // JSON has no `undefined`; a bare null is the absence check.
            // Equality with null stays expressible as {"$equal": null}.
            Value::Null => Ok(vec![Condition::NotExists]),
            Value::Object(operators) => {
                // canonical name -> raw key that first produced it
                let mut seen: BTreeMap<String, String> = BTreeMap::new();
                let mut conditions = Vec::with_capacity(operators.len());
                for (raw_key, operand) in operators {
                    let canonical = resolve_alias(raw_key).to_string();
                    if let Some(first) = seen.get(&canonical) {
                        return Err(QueryError::OperatorConflict {
                            field: field.to_string(),
                            first: first.clone(),
                            second: raw_key.clone(),
                        });
                    }
                    seen.insert(canonical.clone(), raw_key.clone());
                    conditions.push(Self::parse_condition(&canonical, raw_key, operand)?);
                }
                Ok(conditions)
            }
            other => Ok(vec![Condition::Equal(other.clone())]),
        }
    }

    /// Parse one canonical operator name into its condition, validating
    /// the operand's type
    fn parse_condition(canonical: &str, raw_key: &str, operand: &Value) -> QueryResult<Condition> {
        match canonical {
            "$equal" => Ok(Condition::Equal(operand.clone())),
            "$diff" => Ok(Condition::Diff(operand.clone())),
            "$greater" => {
                require_comparable(canonical, operand)?;
                Ok(Condition::Greater(operand.clone()))
            }
            "$greaterEqual" => {
                require_comparable(canonical, operand)?;
                Ok(Condition::GreaterEqual(operand.clone()))
            }
            "$less" => {
                require_comparable(canonical, operand)?;
                Ok(Condition::Less(operand.clone()))
            }
            "$lessEqual" => {
                require_comparable(canonical, operand)?;
                Ok(Condition::LessEqual(operand.clone()))
            }
            "$in" => Ok(Condition::In(require_array(canonical, operand)?)),
            "$notIn" => Ok(Condition::NotIn(require_array(canonical, operand)?)),
            "$exists" => Ok(match require_bool(canonical, operand)? {
                true => Condition::Exists,
                false => Condition::NotExists,
            }),
            "$notExists" => Ok(match require_bool(canonical, operand)? {
                true => Condition::NotExists,
                false => Condition::Exists,
            }),
            "$regex" => {
                let pattern = operand.as_str().ok_or_else(|| QueryError::InvalidOperand {
                    operator: canonical.to_string(),
                    expected: "a string pattern",
                    operand: operand.to_string(),
                })?;
                regex::Regex::new(pattern).map_err(|_| QueryError::InvalidOperand {
                    operator: canonical.to_string(),
                    expected: "a valid regular expression",
                    operand: operand.to_string(),
                })?;
                Ok(Condition::Regex(pattern.to_string()))
            }
            // Outside the canonical set: carried as-is, matched only if
            // the evaluating store registered it
            _ => Ok(Condition::Custom {
                name: raw_key.to_string(),
                operand: operand.clone(),
            }),
        }
    }
}

/// Arithmetic operands must be numeric or RFC 3339 date strings
fn require_comparable(operator: &str, operand: &Value) -> QueryResult<()> {
    let comparable = match operand {
        Value::Number(_) => true,
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
        _ => false,
    };
    if comparable {
        Ok(())
    } else {
        Err(QueryError::InvalidOperand {
            operator: operator.to_string(),
            expected: "a numeric or date operand",
            operand: operand.to_string(),
        })
    }
}

fn require_array(operator: &str, operand: &Value) -> QueryResult<Vec<Value>> {
    operand
        .as_array()
        .cloned()
        .ok_or_else(|| QueryError::InvalidOperand {
            operator: operator.to_string(),
            expected: "an array",
            operand: operand.to_string(),
        })
}

fn require_bool(operator: &str, operand: &Value) -> QueryResult<bool> {
    operand
        .as_bool()
        .ok_or_else(|| QueryError::InvalidOperand {
            operator: operator.to_string(),
            expected: "a boolean",
            operand: operand.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_shorthand_is_find_by_id() {
        let query = QueryNormalizer::normalize(&json!("abc-123")).unwrap();
        assert_eq!(
            query.to_value(),
            json!({ "id": { "$equal": "abc-123" } })
        );

        let query = QueryNormalizer::normalize(&json!(42)).unwrap();
        assert_eq!(query.to_value(), json!({ "id": { "$equal": 42 } }));
    }

    #[test]
    fn test_bare_value_is_equality() {
        let query = QueryNormalizer::normalize(&json!({ "name": "Alice" })).unwrap();
        assert_eq!(query.to_value(), json!({ "name": { "$equal": "Alice" } }));
    }

    #[test]
    fn test_null_field_is_absence_check() {
        let query = QueryNormalizer::normalize(&json!({ "deletedAt": null })).unwrap();
        assert_eq!(
            query.to_value(),
            json!({ "deletedAt": { "$notExists": true } })
        );
    }

    #[test]
    fn test_alias_resolution() {
        let query =
            QueryNormalizer::normalize(&json!({ "age": { "$gt": 18, "$lte": 65 } })).unwrap();
        assert_eq!(
            query.to_value(),
            json!({ "age": { "$greater": 18, "$lessEqual": 65 } })
        );
    }

    #[test]
    fn test_alias_conflict_names_both_keys() {
        let err = QueryNormalizer::normalize(&json!({ "age": { "$gt": 18, "$greater": 21 } }))
            .unwrap_err();
        match err {
            QueryError::OperatorConflict {
                field,
                first,
                second,
            } => {
                assert_eq!(field, "age");
                let mut keys = [first, second];
                keys.sort();
                assert_eq!(keys, ["$greater".to_string(), "$gt".to_string()]);
            }
            other => panic!("expected OperatorConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_two_aliases_of_one_operator_conflict() {
        let err =
            QueryNormalizer::normalize(&json!({ "age": { "$ne": 1, "$neq": 2 } })).unwrap_err();
        assert!(matches!(err, QueryError::OperatorConflict { .. }));
    }

    #[test]
    fn test_arithmetic_operand_type_error() {
        let err =
            QueryNormalizer::normalize(&json!({ "age": { "$greater": "old" } })).unwrap_err();
        match err {
            QueryError::InvalidOperand {
                operator, operand, ..
            } => {
                assert_eq!(operator, "$greater");
                assert_eq!(operand, "\"old\"");
            }
            other => panic!("expected InvalidOperand, got {:?}", other),
        }
    }

    #[test]
    fn test_date_operand_is_comparable() {
        let query = QueryNormalizer::normalize(
            &json!({ "createdAt": { "$gte": "2024-01-01T00:00:00Z" } }),
        )
        .unwrap();
        assert_eq!(
            query.to_value(),
            json!({ "createdAt": { "$greaterEqual": "2024-01-01T00:00:00Z" } })
        );
    }

    #[test]
    fn test_in_requires_array() {
        let err = QueryNormalizer::normalize(&json!({ "role": { "$in": "admin" } })).unwrap_err();
        assert!(matches!(err, QueryError::InvalidOperand { .. }));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let err = QueryNormalizer::normalize(&json!({ "name": { "$regex": "(" } })).unwrap_err();
        assert!(matches!(err, QueryError::InvalidOperand { .. }));
    }

    #[test]
    fn test_unknown_operator_is_carried_as_custom() {
        let query = QueryNormalizer::normalize(&json!({ "pos": { "$near": 10 } })).unwrap();
        assert_eq!(query.to_value(), json!({ "pos": { "$near": 10 } }));
    }

    #[test]
    fn test_null_query_matches_all() {
        let query = QueryNormalizer::normalize(&Value::Null).unwrap();
        assert!(query.is_empty());
    }

    #[test]
    fn test_array_query_rejected() {
        let err = QueryNormalizer::normalize(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, QueryError::InvalidQuery(_)));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let raw = json!({
            "name": "Alice",
            "age": { "$gte": 18 },
            "deletedAt": null,
            "role": { "$in": ["admin", "ops"] },
        });
        let once = QueryNormalizer::normalize(&raw).unwrap();
        let twice = QueryNormalizer::normalize(&once.to_value()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_does_not_mutate_input() {
        let raw = json!({ "age": { "$gt": 18 } });
        let snapshot = raw.clone();
        let _ = QueryNormalizer::normalize(&raw).unwrap();
        assert_eq!(raw, snapshot);
    }
}
