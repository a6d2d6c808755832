//! # Remap Errors

use thiserror::Error;

/// Errors raised while building a remap table
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemapError {
    /// Two external fields translate to the same store field, so the
    /// inverse mapping would be ambiguous
    #[error("Fields `{first}` and `{second}` both remap to store field `{target}`")]
    DuplicateTarget {
        target: String,
        first: String,
        second: String,
    },
}
