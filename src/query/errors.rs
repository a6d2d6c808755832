//! # Query Errors
//!
//! Error types for query and options normalization. All of these are
//! raised synchronously, before any store access.

use thiserror::Error;

/// Result type for query normalization
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while canonicalizing a query or its options
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// An alias and its canonical operator (or two aliases of the same
    /// operator) were supplied for the same field
    #[error("Conflicting operators `{first}` and `{second}` on field `{field}`")]
    OperatorConflict {
        field: String,
        first: String,
        second: String,
    },

    /// An operator was given an operand outside its declared domain
    #[error("Operator `{operator}` requires {expected}, got {operand}")]
    InvalidOperand {
        operator: String,
        expected: &'static str,
        /// JSON-stringified offending operand
        operand: String,
    },

    /// The raw query is not a shape the normalizer recognizes
    #[error("Unsupported query shape: {0}")]
    InvalidQuery(String),

    /// A recognized option carried an invalid value
    #[error("Invalid option `{option}`: {message}")]
    InvalidOption { option: String, message: String },
}
