//! Bounded iterator: Many-from-One synthesis
//!
//! The generic loop behind the polyfilled multi-record operations.
//! Each iteration invokes a single-record primitive; the loop stops the
//! moment a call yields no result, or once `limit` results have been
//! collected. A store is never asked "are there more" out of band.
//!
//! Iterations are strictly sequential: for mutations, each call depends
//! on the previous call's side effect having been applied to the
//! backing store (an applied delete or update removes the record from
//! future matches of the same query). Parallelizing this loop would
//! change its semantics, not just its performance.

use serde_json::Value;

use super::errors::StoreResult;
use super::BoxFuture;
use crate::query::Limit;

/// Collect up to `limit` results from repeated single-record calls.
///
/// `fetch` receives the number of results collected so far. Read
/// polyfills add it to the caller's skip so successive calls see
/// successive matches; mutation polyfills ignore it and re-run the same
/// call, relying on the previous side effect. Any error aborts the loop
/// and propagates unchanged.
pub async fn collect_bounded<'a, F>(limit: Limit, mut fetch: F) -> StoreResult<Vec<Value>>
where
    F: FnMut(u64) -> BoxFuture<'a, StoreResult<Option<Value>>>,
{
    let mut collected = Vec::new();
    loop {
        if let Limit::At(bound) = limit {
            if collected.len() as u64 >= bound {
                break;
            }
        }
        match fetch(collected.len() as u64).await? {
            Some(record) => collected.push(record),
            None => break,
        }
    }
    Ok(collected)
}
