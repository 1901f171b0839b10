// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Search backend error: {0}")]
    Backend(String),
    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),
}

/// One search round trip.
///
/// `from`/`size` travel outside the body, as the client libraries pass them
/// as request parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Target index
    pub index: String,
    /// Full request body (query, sort, aggs, suggest, extras)
    pub body: Value,
    /// Offset of the first hit
    pub from: Option<usize>,
    /// Maximum number of hits
    pub size: Option<usize>,
}

impl SearchRequest {
    pub fn new(index: impl Into<String>, body: Value) -> Self {
        Self {
            index: index.into(),
            body,
            from: None,
            size: None,
        }
    }
}

/// Low-level search client.
///
/// Responses follow the standard search JSON contract
/// (`hits.hits[]._source`, `hits.total.value`, `hits.max_score`,
/// `aggregations`, `suggest`). Connection pooling, retries and auth are the
/// implementor's business.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Run a search and return the raw response.
    async fn search(&self, request: &SearchRequest) -> Result<Value, TransportError>;

    /// Count documents matching `body` (or all documents when `None`).
    async fn count(&self, index: &str, body: Option<&Value>) -> Result<u64, TransportError>;

    /// Fetch one document's `_source` by id. `Ok(None)` when absent.
    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>, TransportError>;
}
