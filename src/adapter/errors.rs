//! # Adapter Errors
//!
//! Three layers: configuration errors (synchronous, before any
//! operation), store errors (raised by concrete media, propagated
//! unchanged), and the adapter surface error wrapping both plus
//! lifecycle failures.

use thiserror::Error;

use crate::query::QueryError;
use crate::remap::RemapError;

/// Result type for raw store primitives
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a concrete store medium
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store does not implement this primitive natively
    #[error("Primitive `{primitive}` is not implemented by this store")]
    Unsupported { primitive: &'static str },

    /// The backing medium rejected or failed the operation
    #[error("Store backend error: {0}")]
    Backend(String),

    /// A record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backing medium's I/O failed
    #[error("I/O error: {0}")]
    Io(String),
}

/// Configuration errors, raised synchronously before any store access
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Data-source names must be non-empty
    #[error("Data source name must not be empty")]
    EmptyName,

    /// A data source with this name is already registered
    #[error("Data source `{0}` is already registered")]
    DuplicateSource(String),

    /// `configure_table` was called twice for one table
    #[error("Table `{0}` is already configured")]
    TableAlreadyConfigured(String),

    /// A CRUD pair with neither side implemented natively would leave
    /// both primitives unusable
    #[error("CRUD pair `{pair}` has no native implementation")]
    IncompletePair { pair: &'static str },

    #[error(transparent)]
    Remap(#[from] RemapError),
}

/// Errors surfaced by `DataSource` operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    /// Backing-resource setup failed; sticky, surfaced to every pending
    /// and future `wait_until_ready` caller
    #[error("Data source setup failed: {0}")]
    Setup(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Dispatch found no native side for a CRUD pair
    #[error("CRUD pair `{pair}` has no native implementation")]
    MissingCapability { pair: &'static str },
}
