// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # ES Queryset
//!
//! A lazy, chainable search cursor over an Elasticsearch-style backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Queryset (cursor)                       │
//! │  • Chaining: filter / exclude / search / order_by / facet  │
//! │  • Each chained call returns an unevaluated clone          │
//! │  • Terminal calls evaluate once and cache the result       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Lookup Parser + Compiler                   │
//! │  • "field__sub__op" → (field.sub, operator)                │
//! │  • Filters + text → boolean query body                     │
//! │  • Nested fields wrapped in nested queries                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Request Builder                         │
//! │  • Aggregations, suggesters, sort, pagination              │
//! │  • More-like-this body, extra body overrides               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SearchTransport                          │
//! │  • Cluster client (external) or InMemoryTransport          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use es_queryset::{FilterValue, IndexDescriptor, InMemoryTransport, Queryset, QuerysetConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> es_queryset::Result<()> {
//!     let transport = Arc::new(InMemoryTransport::new());
//!     transport.index_document("people", "1", json!({"id": 1, "first_name": "John", "last_name": "Smith"}));
//!     transport.index_document("people", "2", json!({"id": 2, "first_name": "Foo", "last_name": "Bar"}));
//!
//!     let descriptor = Arc::new(
//!         IndexDescriptor::new("people")
//!             .text_searchable("first_name")
//!             .text("last_name")
//!             .integer("id"),
//!     );
//!     let people = Queryset::json(descriptor, transport, &QuerysetConfig::default());
//!
//!     let mut smiths = people
//!         .filter([("last_name", "Smith")])
//!         .exclude([("id__gt", FilterValue::from(5))])?
//!         .order_by(["-id"]);
//!
//!     println!("{} matches", smiths.count().await?);
//!     for row in smiths.fetch().await? {
//!         println!("{:?}", row.as_document());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`queryset`]: The [`Queryset`] cursor, its state and row types
//! - [`search`]: Lookups, query compiler, index descriptors, request/response shaping
//! - [`transport`]: Backend trait and the in-memory implementation
//! - [`serializer`]: Document ↔ domain object conversion
//! - [`config`]: Queryset settings
//! - [`metrics`]: Request, latency and cache metrics

pub mod config;
pub mod error;
pub mod metrics;
pub mod queryset;
pub mod search;
pub mod serializer;
pub mod transport;

// Note: We don't expose a `tracing` module to avoid conflict with the tracing crate

pub use config::{Fuzziness, QuerysetConfig};
pub use error::{QueryError, Result};
pub use queryset::{
    EvaluationResult, FacetRequest, MltOptions, MltParams, QueryState, Queryset, Row, SearchArgs,
    SearchMode, SuggestRequest,
};
pub use search::{
    EntityRef, FieldType, FilterValue, IndexDescriptor, IndexRegistry, Lookup, Operator,
    QueryCompiler,
};
pub use serializer::{DocumentSerializer, JsonSerializer, SerdeSerializer};
pub use transport::{InMemoryTransport, SearchRequest, SearchTransport, TransportError, TransportStats};
pub use metrics::LatencyTimer;
