//! Adapter subsystem for aerostore
//!
//! The behavioral contract every concrete store satisfies, and the
//! engine that completes partial implementations:
//!
//! - `Store`: the raw primitive surface a concrete medium implements
//! - `Capabilities`: which primitives a store implements natively
//! - `DataSource`: normalization, remapping, dispatch, and polyfills
//! - `collect_bounded`: the sequential Many-from-One synthesis loop
//! - `ReadinessGate`: the Preparing/Ready/Error lifecycle
//!
//! # Invariants
//!
//! - Every CRUD pair has at least one native side (checked at
//!   construction, not discovered by recursion at call time)
//! - Multi-record operations issue store calls strictly sequentially
//! - Store errors propagate unchanged; the engine never retries

mod capability;
mod contract;
mod errors;
mod iterator;
mod source;
mod state;

use std::future::Future;
use std::pin::Pin;

pub use capability::Capabilities;
pub use contract::Store;
pub use errors::{AdapterError, ConfigError, StoreError, StoreResult};
pub use iterator::collect_bounded;
pub use source::DataSource;
pub use state::{AdapterState, ReadinessGate};

/// Boxed future used by the object-safe store contract
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
