//! Record matcher
//!
//! Evaluates a canonicalized query against a single record. Pure,
//! synchronous, side-effect-free. Only canonicalized queries are valid
//! input; the normalizer is the sole producer of `CanonicalQuery`.

use serde_json::Value;

use super::normalizer::CanonicalQuery;
use super::operator::OperatorRegistry;

/// Evaluates canonical queries against records
pub struct Matcher;

impl Matcher {
    /// A record matches iff every condition of every queried field is
    /// satisfied (AND within a field and across fields; no OR).
    ///
    /// Non-object records carry no fields, so any condition other than
    /// an absence check fails against them.
    pub fn matches(query: &CanonicalQuery, record: &Value, registry: &OperatorRegistry) -> bool {
        query.fields().all(|(field, conditions)| {
            let value = record.get(field);
            conditions
                .iter()
                .all(|condition| condition.evaluate(value, registry))
        })
    }
}
