//! Remote REST store
//!
//! A thin client over an HTTP endpoint that speaks the canonical query
//! language: one route per table, one verb per CRUD pair, query and
//! options passed as JSON-encoded query parameters. The server owns
//! matching and windowing; this adapter owns nothing but transport.

use serde_json::Value;

use crate::adapter::{BoxFuture, Capabilities, Store, StoreError, StoreResult};
use crate::query::{CanonicalQuery, QueryOptions};

/// REST-backed store
pub struct RemoteStore {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteStore {
    /// A store issuing requests against `{base_url}/{table}`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn wire_params(query: &CanonicalQuery, options: &QueryOptions) -> [(&'static str, String); 2] {
        [
            ("query", query.to_value().to_string()),
            ("options", options.to_value().to_string()),
        ]
    }
}

/// Decode a JSON response, mapping transport and status failures to
/// backend errors
async fn read_records(response: reqwest::Response) -> StoreResult<Vec<Value>> {
    let response = response
        .error_for_status()
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    response
        .json::<Vec<Value>>()
        .await
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

impl Store for RemoteStore {
    fn name(&self) -> &str {
        "remote"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::many_primitives()
    }

    fn find_many<'a>(
        &'a self,
        table: &'a str,
        query: &'a CanonicalQuery,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, StoreResult<Vec<Value>>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.table_url(table))
                .query(&Self::wire_params(query, options))
                .send()
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            read_records(response).await
        })
    }

    fn insert_many<'a>(
        &'a self,
        table: &'a str,
        records: &'a [Value],
    ) -> BoxFuture<'a, StoreResult<Vec<Value>>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.table_url(table))
                .json(records)
                .send()
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            read_records(response).await
        })
    }

    fn update_many<'a>(
        &'a self,
        table: &'a str,
        query: &'a CanonicalQuery,
        update: &'a Value,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, StoreResult<Vec<Value>>> {
        Box::pin(async move {
            let response = self
                .client
                .patch(self.table_url(table))
                .query(&Self::wire_params(query, options))
                .json(update)
                .send()
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            read_records(response).await
        })
    }

    fn delete_many<'a>(
        &'a self,
        table: &'a str,
        query: &'a CanonicalQuery,
        options: &'a QueryOptions,
    ) -> BoxFuture<'a, StoreResult<Vec<Value>>> {
        Box::pin(async move {
            let response = self
                .client
                .delete(self.table_url(table))
                .query(&Self::wire_params(query, options))
                .send()
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            read_records(response).await
        })
    }
}
