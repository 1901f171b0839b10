// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Lazy, chainable search cursor.
//!
//! A [`Queryset`] accumulates search state (text, filters, ordering, window,
//! facets, suggesters, extra body) without touching the backend. Chaining
//! methods return an independent clone with an empty result cache; terminal
//! operations evaluate once and answer from the cache afterwards.
//!
//! # Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use es_queryset::{IndexDescriptor, InMemoryTransport, Queryset, QuerysetConfig};
//! # async fn example() -> es_queryset::Result<()> {
//! let descriptor = Arc::new(
//!     IndexDescriptor::new("people")
//!         .text_searchable("first_name")
//!         .text("last_name")
//!         .integer("id"),
//! );
//! let transport = Arc::new(InMemoryTransport::new());
//! let people = Queryset::json(descriptor, transport, &QuerysetConfig::default());
//!
//! let mut smiths = people.filter([("last_name", "Smith")]).order_by(["-id"]);
//! let total = smiths.count().await?;
//! let first = smiths.get_index(0).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Module Structure
//!
//! - `types` - State, rows and request option types
//! - `builder` - Chaining operations (clone-returning)
//! - `evaluate` - Terminal operations and result caching

mod builder;
mod evaluate;
mod types;

pub use types::{
    EvaluationResult, FacetRequest, MltOptions, MltParams, QueryState, Row, SearchArgs,
    SearchMode, SuggestRequest,
};

use std::sync::Arc;

use serde_json::Value;

use crate::config::QuerysetConfig;
use crate::search::IndexDescriptor;
use crate::serializer::{DocumentSerializer, JsonSerializer};
use crate::transport::SearchTransport;

/// Search cursor over one index.
pub struct Queryset<M> {
    descriptor: Arc<IndexDescriptor>,
    transport: Arc<dyn SearchTransport>,
    serializer: Arc<dyn DocumentSerializer<M>>,
    config: Arc<QuerysetConfig>,
    state: QueryState,
    result: Option<EvaluationResult<M>>,
    counted: Option<u64>,
}

impl<M> Queryset<M> {
    /// Create a cursor over the descriptor's index.
    ///
    /// Ordering comes from `config.ordering`, falling back to the
    /// descriptor's ordering. Fuzziness starts at `config.fuzziness`.
    pub fn new(
        descriptor: Arc<IndexDescriptor>,
        transport: Arc<dyn SearchTransport>,
        serializer: Arc<dyn DocumentSerializer<M>>,
        config: &QuerysetConfig,
    ) -> Self {
        let ordering = config.ordering.clone().or_else(|| descriptor.ordering.clone());
        let state = QueryState::new(ordering, config.fuzziness);
        Self {
            descriptor,
            transport,
            serializer,
            config: Arc::new(config.clone()),
            state,
            result: None,
            counted: None,
        }
    }

    /// Index descriptor
    pub fn descriptor(&self) -> &IndexDescriptor {
        &self.descriptor
    }

    /// Accumulated query state
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Whether the result cache is populated
    pub fn is_evaluated(&self) -> bool {
        self.result.is_some()
    }

    fn invalidate(&mut self) {
        self.result = None;
        self.counted = None;
    }
}

impl Queryset<Value> {
    /// Cursor whose rows stay raw JSON documents.
    pub fn json(
        descriptor: Arc<IndexDescriptor>,
        transport: Arc<dyn SearchTransport>,
        config: &QuerysetConfig,
    ) -> Self {
        Self::new(descriptor, transport, Arc::new(JsonSerializer), config)
    }
}

/// Copies collaborators and query state; the clone starts unevaluated.
impl<M> Clone for Queryset<M> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            transport: Arc::clone(&self.transport),
            serializer: Arc::clone(&self.serializer),
            config: Arc::clone(&self.config),
            state: self.state.clone(),
            result: None,
            counted: None,
        }
    }
}

impl<M> std::fmt::Debug for Queryset<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queryset")
            .field("index", &self.descriptor.index)
            .field("state", &self.state)
            .field("evaluated", &self.result.is_some())
            .finish()
    }
}
