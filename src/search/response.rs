// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Typed view over a search response.
//!
//! ```text
//! {
//!   "hits": {
//!     "total": {"value": 4, "relation": "eq"},   (or a bare number)
//!     "max_score": 1.0,
//!     "hits": [{"_id": "1", "_score": 1.0, "_source": {...}}]
//!   },
//!   "aggregations": {...},
//!   "suggest": {...}
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::transport::TransportError;

/// Top-level search response
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub hits: HitsEnvelope,
    #[serde(default)]
    pub aggregations: Option<Value>,
    #[serde(default)]
    pub suggest: Option<Value>,
}

/// `hits` section
#[derive(Debug, Clone, Deserialize)]
pub struct HitsEnvelope {
    pub total: TotalHits,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// Total hit count, in either the object or the legacy numeric shape
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Object {
        value: u64,
        #[serde(default)]
        relation: Option<String>,
    },
    Count(u64),
}

impl TotalHits {
    pub fn value(&self) -> u64 {
        match self {
            TotalHits::Object { value, .. } => *value,
            TotalHits::Count(value) => *value,
        }
    }
}

/// One hit
#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id", default)]
    pub id: Option<Value>,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

impl SearchResponse {
    /// Parse a raw response
    pub fn parse(raw: &Value) -> Result<Self, TransportError> {
        serde_json::from_value(raw.clone()).map_err(|e| TransportError::MalformedResponse(e.to_string()))
    }
}
