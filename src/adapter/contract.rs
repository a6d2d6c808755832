//! The raw store contract
//!
//! Concrete media implement this trait. Every CRUD primitive has an
//! `Unsupported` default; a store overrides the subset its
//! `capabilities()` declares, and the engine synthesizes the rest.
//! Queries and options arrive already canonicalized and remapped.

use serde_json::Value;

use super::capability::Capabilities;
use super::errors::{StoreError, StoreResult};
use super::BoxFuture;
use crate::query::{CanonicalQuery, QueryOptions};

/// One concrete storage medium behind the adapter contract.
///
/// Implementers of a new store must provide a real implementation for
/// at least one side of each CRUD pair and declare it in
/// `capabilities()`; `DataSource` rejects anything less at
/// construction.
///
/// Stores that evaluate queries locally own the skip bookkeeping for
/// `find_one`: the call must return match number `options.skip` in the
/// medium's stable order, counting from zero, so that the read polyfill
/// can advance through matches by advancing `skip`.
pub trait Store: Send + Sync {
    /// Short name of the medium, used in logs
    fn name(&self) -> &str;

    /// Which primitives this store implements natively
    fn capabilities(&self) -> Capabilities;

    /// Set up the backing resource. Runs once; failure moves the owning
    /// data source into its terminal error state.
    fn prepare<'a>(&'a self) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Fetch match number `options.skip`, or `None` when there are not
    /// that many matches
    fn find_one<'a>(
        &'a self,
        table: &'a str,
        query: &'a CanonicalQuery,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, StoreResult<Option<Value>>> {
        let _ = (table, query, options);
        unsupported("find_one")
    }

    /// Fetch every match within `options.skip`/`options.limit`
    fn find_many<'a>(
        &'a self,
        table: &'a str,
        query: &'a CanonicalQuery,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, StoreResult<Vec<Value>>> {
        let _ = (table, query, options);
        unsupported("find_many")
    }

    /// Persist one record, returning it as stored (UID assigned)
    fn insert_one<'a>(
        &'a self,
        table: &'a str,
        record: &'a Value,
    ) -> BoxFuture<'a, StoreResult<Option<Value>>> {
        let _ = (table, record);
        unsupported("insert_one")
    }

    /// Persist records in order, returning them as stored
    fn insert_many<'a>(
        &'a self,
        table: &'a str,
        records: &'a [Value],
    ) -> BoxFuture<'a, StoreResult<Vec<Value>>> {
        let _ = (table, records);
        unsupported("insert_many")
    }

    /// Apply `update` to match number `options.skip`, returning the
    /// updated record
    fn update_one<'a>(
        &'a self,
        table: &'a str,
        query: &'a CanonicalQuery,
        update: &'a Value,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, StoreResult<Option<Value>>> {
        let _ = (table, query, update, options);
        unsupported("update_one")
    }

    /// Apply `update` to every match within skip/limit
    fn update_many<'a>(
        &'a self,
        table: &'a str,
        query: &'a CanonicalQuery,
        update: &'a Value,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, StoreResult<Vec<Value>>> {
        let _ = (table, query, update, options);
        unsupported("update_many")
    }

    /// Remove match number `options.skip`, returning the removed record
    fn delete_one<'a>(
        &'a self,
        table: &'a str,
        query: &'a CanonicalQuery,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, StoreResult<Option<Value>>> {
        let _ = (table, query, options);
        unsupported("delete_one")
    }

    /// Remove every match within skip/limit, returning the removed
    /// records
    fn delete_many<'a>(
        &'a self,
        table: &'a str,
        query: &'a CanonicalQuery,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, StoreResult<Vec<Value>>> {
        let _ = (table, query, options);
        unsupported("delete_many")
    }
}

fn unsupported<'a, T: Send + 'a>(primitive: &'static str) -> BoxFuture<'a, StoreResult<T>> {
    Box::pin(async move { Err(StoreError::Unsupported { primitive }) })
}
