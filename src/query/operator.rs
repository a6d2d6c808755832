//! Operator table: the closed set of comparison operators
//!
//! Each `Condition` variant carries its operand and evaluates as a pure
//! predicate over an optional field value. The set is closed and matched
//! exhaustively; stores wanting extra operators register them on an
//! `OperatorRegistry` instead of extending the enum.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::DateTime;
use serde_json::{Map, Value};

/// A custom operator predicate: `(field_value, operand) -> bool`
pub type CustomPredicate = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// One canonicalized operator applied to one field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `$equal`: strict JSON equality, no type coercion
    Equal(Value),
    /// `$diff`: strict JSON inequality
    Diff(Value),
    /// `$greater`: numeric or chronological comparison
    Greater(Value),
    /// `$greaterEqual`
    GreaterEqual(Value),
    /// `$less`
    Less(Value),
    /// `$lessEqual`
    LessEqual(Value),
    /// `$in`: membership in the operand array
    In(Vec<Value>),
    /// `$notIn`
    NotIn(Vec<Value>),
    /// `$exists: true`: the key is present (a JSON `null` value counts)
    Exists,
    /// `$notExists` / `$exists: false`: the key is absent
    NotExists,
    /// `$regex`: pattern match against string field values
    Regex(String),
    /// An operator outside the canonical set, resolved through an
    /// `OperatorRegistry` at evaluation time
    Custom { name: String, operand: Value },
}

impl Condition {
    /// Evaluates this condition against a field value.
    ///
    /// `field` is `None` when the record has no such key. A missing key
    /// satisfies only `NotExists`; every other operator requires a
    /// present value.
    pub fn evaluate(&self, field: Option<&Value>, registry: &OperatorRegistry) -> bool {
        let value = match field {
            Some(value) => value,
            None => return matches!(self, Condition::NotExists),
        };

        match self {
            Condition::Equal(operand) => value == operand,
            Condition::Diff(operand) => value != operand,
            Condition::Greater(operand) => {
                compare_values(value, operand) == Some(Ordering::Greater)
            }
            Condition::GreaterEqual(operand) => matches!(
                compare_values(value, operand),
                Some(Ordering::Greater) | Some(Ordering::Equal)
            ),
            Condition::Less(operand) => compare_values(value, operand) == Some(Ordering::Less),
            Condition::LessEqual(operand) => matches!(
                compare_values(value, operand),
                Some(Ordering::Less) | Some(Ordering::Equal)
            ),
            Condition::In(set) => set.contains(value),
            Condition::NotIn(set) => !set.contains(value),
            Condition::Exists => true,
            Condition::NotExists => false,
            Condition::Regex(pattern) => match (value.as_str(), regex::Regex::new(pattern)) {
                (Some(text), Ok(re)) => re.is_match(text),
                _ => false,
            },
            Condition::Custom { name, operand } => registry.evaluate(name, value, operand),
        }
    }

    /// Renders this condition as its canonical `(operator, operand)` pair
    pub fn render(&self) -> (String, Value) {
        match self {
            Condition::Equal(v) => ("$equal".to_string(), v.clone()),
            Condition::Diff(v) => ("$diff".to_string(), v.clone()),
            Condition::Greater(v) => ("$greater".to_string(), v.clone()),
            Condition::GreaterEqual(v) => ("$greaterEqual".to_string(), v.clone()),
            Condition::Less(v) => ("$less".to_string(), v.clone()),
            Condition::LessEqual(v) => ("$lessEqual".to_string(), v.clone()),
            Condition::In(set) => ("$in".to_string(), Value::Array(set.clone())),
            Condition::NotIn(set) => ("$notIn".to_string(), Value::Array(set.clone())),
            Condition::Exists => ("$exists".to_string(), Value::Bool(true)),
            Condition::NotExists => ("$notExists".to_string(), Value::Bool(true)),
            Condition::Regex(p) => ("$regex".to_string(), Value::String(p.clone())),
            Condition::Custom { name, operand } => (name.clone(), operand.clone()),
        }
    }

    /// Renders a set of conditions as a canonical operator map
    pub fn render_all(conditions: &[Condition]) -> Value {
        let mut ops = Map::with_capacity(conditions.len());
        for condition in conditions {
            let (name, operand) = condition.render();
            ops.insert(name, operand);
        }
        Value::Object(ops)
    }
}

/// Compares two values within the arithmetic operators' domain.
///
/// Numbers compare exactly as i64 when both fit, otherwise as f64.
/// Strings compare chronologically when both parse as RFC 3339
/// date-times. Any other pairing is incomparable and yields `None`,
/// which every arithmetic operator treats as no-match.
fn compare_values(value: &Value, operand: &Value) -> Option<Ordering> {
    match (value, operand) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(ai), Some(bi)) = (a.as_i64(), b.as_i64()) {
                return Some(ai.cmp(&bi));
            }
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::String(a), Value::String(b)) => {
            let a = DateTime::parse_from_rfc3339(a).ok()?;
            let b = DateTime::parse_from_rfc3339(b).ok()?;
            Some(a.cmp(&b))
        }
        _ => None,
    }
}

/// Registry of custom operators, per store adapter.
///
/// Configured before the adapter serves operations, read-only after.
/// Evaluating an unregistered name yields `false`, never an error;
/// callers rely on this permissive default.
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    custom: BTreeMap<String, CustomPredicate>,
}

impl OperatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom operator predicate under the given name
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.custom.insert(name.into(), Arc::new(predicate));
    }

    /// True if a predicate is registered under this name
    pub fn is_registered(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    /// Evaluate a custom operator; unregistered names never match
    pub fn evaluate(&self, name: &str, value: &Value, operand: &Value) -> bool {
        match self.custom.get(name) {
            Some(predicate) => predicate(value, operand),
            None => false,
        }
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}
