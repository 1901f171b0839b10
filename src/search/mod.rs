// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search Infrastructure
//!
//! Lookup parsing, query compilation and request/response shaping for an
//! Elasticsearch-style backend.
//!
//! # Architecture
//!
//! ```text
//! "field__sub__op" = operand
//!     ↓
//! Lookup::parse → (field.sub, Operator)
//!     ↓
//! QueryCompiler → {"query": {"bool": {must, must_not, should}}}
//!     ↓
//! RequestBuilder → + aggs, suggest, sort, from/size, extra body
//!     ↓
//! SearchTransport::search → SearchResponse
//! ```
//!
//! # Lookup Language
//!
//! ```text
//! name="John"                  - match (text) / term (other)
//! name__must_not="John"        - negated match
//! name__should="John"          - optional match
//! age__gt=25                   - one-sided range (gt, gte, lt, lte)
//! age__range=(25, 40)          - inclusive range
//! email__exists=true           - field present
//! email__isnull=true           - field absent (deprecated, use exists)
//! groups__value="a"            - nested field (wrapped in a nested query)
//! ```

mod compiler;
mod index_manager;
mod lookup;
mod request;
mod response;
mod value;

pub use compiler::{nested_update, QueryCompiler};
pub use index_manager::{FieldType, IndexDescriptor, IndexRegistry};
pub use lookup::{Lookup, Operator, LOOKUP_SEPARATOR};
pub use request::RequestBuilder;
pub use response::{Hit, HitsEnvelope, SearchResponse, TotalHits};
pub use value::{id_to_string, EntityRef, FilterValue};
