// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search request assembly.
//!
//! Turns a cursor's [`QueryState`] into a [`SearchRequest`]: compiled query,
//! aggregations, suggesters, sort, pagination and the caller's extra body.
//!
//! # Body Layout
//!
//! ```text
//! {
//!   "query": {"bool": ...},                       QueryCompiler
//!   "aggs":  {"global_count": {"global": {},      facet(.., global = true)
//!             "aggs": {"<field>": {"terms": {"field": "<field>", "size": n}}}}},
//!   "suggest": {"<field>": {"text": "<query>", "term": {"field": "<field>"}}},
//!   "sort": [{"<field>": "asc"}, {"<field>": "desc"}, "_score"],
//!   ...extra body (top-level keys replace anything above)
//! }
//! ```
//!
//! More-like-this replaces the whole body with a `more_like_this` query and
//! drops pagination, sort and aggregations.

use serde_json::{json, Map, Value};
use tracing::debug;

use super::compiler::QueryCompiler;
use super::index_manager::IndexDescriptor;
use crate::error::{QueryError, Result};
use crate::queryset::{FacetRequest, MltParams, QueryState, SearchMode, SuggestRequest};
use crate::transport::SearchRequest;

/// Builds backend requests for one index.
pub struct RequestBuilder<'a> {
    descriptor: &'a IndexDescriptor,
    global_facets_name: &'a str,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(descriptor: &'a IndexDescriptor, global_facets_name: &'a str) -> Self {
        Self {
            descriptor,
            global_facets_name,
        }
    }

    /// Compiled `{"query": ...}` body for the state's text and filters.
    pub fn query_body(&self, state: &QueryState) -> Result<Value> {
        QueryCompiler::compile(&state.query, &state.filters, self.descriptor, state.fuzziness)
    }

    /// Full search request for the state's mode.
    pub fn search(&self, state: &QueryState) -> Result<SearchRequest> {
        let request = match state.mode {
            SearchMode::Standard => self.standard(state)?,
            SearchMode::MoreLikeThis => {
                let params = state.mlt.as_ref().ok_or_else(|| {
                    QueryError::Argument("more-like-this mode requires a reference document".into())
                })?;
                let mut body = self.more_like_this(params);
                apply_extra(&mut body, state.extra_body.as_ref());
                SearchRequest::new(&self.descriptor.index, body)
            }
        };

        debug!(
            index = %request.index,
            mode = %state.mode,
            from = ?request.from,
            size = ?request.size,
            body = %request.body,
            "Built search request"
        );
        Ok(request)
    }

    /// Completion-suggester request for `prefix` on `field`.
    pub fn completion(&self, field: &str, prefix: &str) -> SearchRequest {
        let body = json!({
            "suggest": {
                field: {
                    "prefix": prefix,
                    "completion": {"field": field}
                }
            }
        });
        SearchRequest::new(&self.descriptor.index, body)
    }

    fn standard(&self, state: &QueryState) -> Result<SearchRequest> {
        let mut body = self.query_body(state)?;

        if let Some(facets) = &state.facets {
            if !facets.fields.is_empty() {
                body["aggs"] = self.aggregations(facets);
            }
        }

        if let Some(suggest) = &state.suggest {
            if !suggest.fields.is_empty() {
                body["suggest"] = suggestions(suggest, &state.query);
            }
        }

        if let Some(ordering) = &state.ordering {
            if !ordering.is_empty() {
                body["sort"] = sort(ordering);
            }
        }

        apply_extra(&mut body, state.extra_body.as_ref());

        let mut request = SearchRequest::new(&self.descriptor.index, body);
        if state.start != 0 {
            request.from = Some(state.start);
        }
        if let Some(stop) = state.stop {
            request.size = Some(stop.saturating_sub(state.start));
        }
        Ok(request)
    }

    fn aggregations(&self, facets: &FacetRequest) -> Value {
        let mut aggs = Map::new();
        for field in &facets.fields {
            aggs.insert(field.clone(), json!({"terms": {"field": field}}));
        }
        // The size only lands on the last field
        if let (Some(limit), Some(last)) = (facets.limit, facets.fields.last()) {
            if let Some(terms) = aggs.get_mut(last).and_then(|agg| agg.get_mut("terms")) {
                terms["size"] = json!(limit);
            }
        }

        if facets.global {
            json!({
                self.global_facets_name: {
                    "global": {},
                    "aggs": aggs,
                }
            })
        } else {
            Value::Object(aggs)
        }
    }

    fn more_like_this(&self, params: &MltParams) -> Value {
        json!({
            "query": {
                "more_like_this": {
                    "fields": params.fields,
                    "like": [{"_index": self.descriptor.index, "_id": params.id}],
                    "min_term_freq": params.min_term_frequency,
                    "max_doc_freq": params.max_term_frequency,
                }
            }
        })
    }
}

fn suggestions(suggest: &SuggestRequest, query: &str) -> Value {
    let mut entries = Map::new();
    for field in &suggest.fields {
        let mut term = json!({"field": field});
        if let Some(limit) = suggest.limit {
            term["size"] = json!(limit);
        }
        entries.insert(field.clone(), json!({"text": query, "term": term}));
    }
    Value::Object(entries)
}

/// `["name", "-age"]` → `[{"name": "asc"}, {"age": "desc"}, "_score"]`
fn sort(ordering: &[String]) -> Value {
    let mut clauses: Vec<Value> = ordering
        .iter()
        .map(|field| match field.strip_prefix('-') {
            Some(desc) => json!({ desc: "desc" }),
            None => json!({ field: "asc" }),
        })
        .collect();
    clauses.push(json!("_score"));
    Value::Array(clauses)
}

fn apply_extra(body: &mut Value, extra: Option<&Map<String, Value>>) {
    let (Some(extra), Some(target)) = (extra, body.as_object_mut()) else {
        return;
    };
    for (key, value) in extra {
        target.insert(key.clone(), value.clone());
    }
}
