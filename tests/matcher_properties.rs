//! Matcher Property Tests
//!
//! The matcher must agree with an independently-written reference
//! evaluator over randomly generated field/operator/value combinations,
//! and normalization must be a fixpoint after one application.

use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use aerostore::query::{Matcher, OperatorRegistry, QueryNormalizer};

/// Operators exercised by the property, with i64 operands
#[derive(Debug, Clone, Copy)]
enum Op {
    Equal,
    Diff,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Exists,
    NotExists,
}

impl Op {
    fn raw_key(&self) -> &'static str {
        match self {
            Op::Equal => "$equal",
            Op::Diff => "$diff",
            Op::Greater => "$gt",
            Op::GreaterEqual => "$gte",
            Op::Less => "$lt",
            Op::LessEqual => "$lte",
            Op::Exists => "$exists",
            Op::NotExists => "$notExists",
        }
    }

    fn operand(&self, n: i64) -> Value {
        match self {
            Op::Exists | Op::NotExists => Value::Bool(true),
            _ => json!(n),
        }
    }

    /// Reference semantics, written independently of the engine:
    /// a missing field satisfies only the absence check
    fn reference(&self, field_value: Option<i64>, operand: i64) -> bool {
        match self {
            Op::Exists => field_value.is_some(),
            Op::NotExists => field_value.is_none(),
            Op::Equal => field_value == Some(operand),
            Op::Diff => matches!(field_value, Some(v) if v != operand),
            Op::Greater => matches!(field_value, Some(v) if v > operand),
            Op::GreaterEqual => matches!(field_value, Some(v) if v >= operand),
            Op::Less => matches!(field_value, Some(v) if v < operand),
            Op::LessEqual => matches!(field_value, Some(v) if v <= operand),
        }
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Equal),
        Just(Op::Diff),
        Just(Op::Greater),
        Just(Op::GreaterEqual),
        Just(Op::Less),
        Just(Op::LessEqual),
        Just(Op::Exists),
        Just(Op::NotExists),
    ]
}

const FIELDS: [&str; 3] = ["a", "b", "c"];

fn field_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(&FIELDS[..]).prop_map(str::to_string)
}

/// A record over the shared field pool; absent fields are absent keys
fn record_strategy() -> impl Strategy<Value = BTreeMap<String, i64>> {
    prop::collection::btree_map(field_strategy(), -5i64..5, 0..=3)
}

/// One operator per field keeps queries conflict-free by construction
fn query_strategy() -> impl Strategy<Value = BTreeMap<String, (Op, i64)>> {
    prop::collection::btree_map(field_strategy(), (op_strategy(), -5i64..5), 0..=3)
}

fn to_record_value(record: &BTreeMap<String, i64>) -> Value {
    let fields: Map<String, Value> = record
        .iter()
        .map(|(k, v)| (k.clone(), json!(v)))
        .collect();
    Value::Object(fields)
}

fn to_raw_query(query: &BTreeMap<String, (Op, i64)>) -> Value {
    let fields: Map<String, Value> = query
        .iter()
        .map(|(field, (op, n))| {
            (
                field.clone(),
                json!({ op.raw_key(): op.operand(*n) }),
            )
        })
        .collect();
    Value::Object(fields)
}

proptest! {
    #[test]
    fn prop_matcher_agrees_with_reference(
        record in record_strategy(),
        query in query_strategy(),
    ) {
        let canonical = QueryNormalizer::normalize(&to_raw_query(&query)).unwrap();
        let record_value = to_record_value(&record);
        let matched = Matcher::matches(&canonical, &record_value, &OperatorRegistry::new());

        let expected = query.iter().all(|(field, (op, n))| {
            op.reference(record.get(field).copied(), *n)
        });
        prop_assert_eq!(matched, expected);
    }

    #[test]
    fn prop_normalization_is_idempotent(query in query_strategy()) {
        let once = QueryNormalizer::normalize(&to_raw_query(&query)).unwrap();
        let twice = QueryNormalizer::normalize(&once.to_value()).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_matching_never_errors_or_mutates(
        record in record_strategy(),
        query in query_strategy(),
    ) {
        let raw = to_raw_query(&query);
        let snapshot = raw.clone();
        let canonical = QueryNormalizer::normalize(&raw).unwrap();
        let record_value = to_record_value(&record);
        let _ = Matcher::matches(&canonical, &record_value, &OperatorRegistry::new());
        prop_assert_eq!(raw, snapshot);
    }
}
