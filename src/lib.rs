//! aerostore - a uniform data-access layer over pluggable storage backends
//!
//! One query language, one CRUD contract, many stores. Concrete stores
//! implement whichever single- or multi-record primitives their medium
//! supports natively; the engine canonicalizes queries and options,
//! evaluates them deterministically, and synthesizes the missing
//! primitives from the ones provided.

pub mod adapter;
pub mod entity;
pub mod observability;
pub mod query;
pub mod registry;
pub mod remap;
pub mod stores;
