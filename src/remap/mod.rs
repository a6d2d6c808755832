//! Field remapping subsystem for aerostore
//!
//! Per-table translation between logical (model) field names and
//! physical (store) field names, plus per-field value casts applied
//! when records cross the store boundary.
//!
//! # Invariants
//!
//! - The external-to-store map must invert to a bijection
//! - Unmapped field names pass through untouched (open remap policy)
//! - Casts apply lazily, only to fields present in a given record

mod errors;
mod filters;
mod table;

pub use errors::RemapError;
pub use filters::{CastFn, FilterTable};
pub use table::RemapTable;
