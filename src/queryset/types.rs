// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Public types for querysets.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::config::Fuzziness;
use crate::search::FilterValue;

/// Evaluation mode of a queryset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Boolean query compiled from text and filters
    #[default]
    Standard,
    /// Similarity search against a reference document
    MoreLikeThis,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "Standard"),
            Self::MoreLikeThis => write!(f, "MoreLikeThis"),
        }
    }
}

/// More-like-this parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MltParams {
    /// Reference document id
    pub id: String,
    /// Candidate fields (`_all` for every field)
    pub fields: Vec<String>,
    /// Minimum term frequency in the reference document
    pub min_term_frequency: u32,
    /// Terms found in more documents than this are ignored
    pub max_term_frequency: u32,
}

/// Optional more-like-this overrides passed to `mlt()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MltOptions {
    pub fields: Option<Vec<String>>,
    pub min_term_frequency: Option<u32>,
    pub max_term_frequency: Option<u32>,
}

/// Facet (terms aggregation) request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetRequest {
    pub fields: Vec<String>,
    /// Bucket size, applied to the last field only
    pub limit: Option<usize>,
    /// Count over the whole index instead of the query's matches
    pub global: bool,
}

/// Term-suggestion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestRequest {
    pub fields: Vec<String>,
    pub limit: Option<usize>,
}

/// Arguments of `search_with()`: free text and/or per-field queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchArgs {
    pub text: Option<String>,
    pub fields: Vec<(String, FilterValue)>,
}

impl SearchArgs {
    /// Free-text search over the descriptor's search fields
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            fields: Vec::new(),
        }
    }

    /// Add a per-field query
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// One result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Row<M> {
    /// Raw `_source` document
    Document(Value),
    /// Deserialized domain object
    Object(M),
}

impl<M> Row<M> {
    /// Raw document, if the row was not deserialized
    pub fn as_document(&self) -> Option<&Value> {
        match self {
            Row::Document(doc) => Some(doc),
            Row::Object(_) => None,
        }
    }

    /// Domain object, if the row was deserialized
    pub fn as_object(&self) -> Option<&M> {
        match self {
            Row::Object(obj) => Some(obj),
            Row::Document(_) => None,
        }
    }

    /// Consume into the domain object
    pub fn into_object(self) -> Option<M> {
        match self {
            Row::Object(obj) => Some(obj),
            Row::Document(_) => None,
        }
    }
}

/// Everything one evaluation produced.
#[derive(Debug, Clone)]
pub struct EvaluationResult<M> {
    /// Rows of the requested window
    pub rows: Vec<Row<M>>,
    /// Total matches, independent of the window
    pub total: u64,
    /// Best relevance score
    pub max_score: Option<f64>,
    /// Facet payload (one entry per field, plus `doc_count` when global)
    pub facets: Option<Value>,
    /// Suggestion payload keyed by field
    pub suggestions: Option<Value>,
    /// Raw backend response
    pub response: Value,
}

/// Chainable query state: everything a clone copies.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub query: String,
    pub filters: BTreeMap<String, FilterValue>,
    pub ordering: Option<Vec<String>>,
    pub start: usize,
    pub stop: Option<usize>,
    pub mode: SearchMode,
    pub mlt: Option<MltParams>,
    pub facets: Option<FacetRequest>,
    pub suggest: Option<SuggestRequest>,
    pub extra_body: Option<Map<String, Value>>,
    pub fuzziness: Fuzziness,
    pub deserialize: bool,
}

impl QueryState {
    pub fn new(ordering: Option<Vec<String>>, fuzziness: Fuzziness) -> Self {
        Self {
            query: String::new(),
            filters: BTreeMap::new(),
            ordering,
            start: 0,
            stop: None,
            mode: SearchMode::Standard,
            mlt: None,
            facets: None,
            suggest: None,
            extra_body: None,
            fuzziness,
            deserialize: false,
        }
    }
}
