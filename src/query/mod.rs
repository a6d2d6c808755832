//! Query subsystem for aerostore
//!
//! Canonicalizes shorthand queries and options into an unambiguous
//! internal form, then evaluates that form against JSON records.
//!
//! # Normalization flow (strict order)
//!
//! 1. Expand scalar shorthand (`"abc"` → find by id)
//! 2. Expand field shorthand (bare value → `$equal`, `null` → `$notExists`)
//! 3. Resolve operator aliases to canonical names, rejecting conflicts
//! 4. Validate operand types (arithmetic operators, `$in`, `$regex`)
//!
//! # Invariants
//!
//! - Normalization never mutates caller input
//! - Normalization is idempotent over its own canonical rendering
//! - Matching is pure, synchronous, and deterministic
//! - Unknown operators evaluate to `false`, never to an error

mod errors;
mod matcher;
mod normalizer;
mod operator;
mod options;

pub use errors::{QueryError, QueryResult};
pub use matcher::Matcher;
pub use normalizer::{CanonicalQuery, QueryNormalizer};
pub use operator::{Condition, CustomPredicate, OperatorRegistry};
pub use options::{Limit, OptionsNormalizer, QueryOptions, SortDirection, SortSpec};
