// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory search backend.
//!
//! Implements [`SearchTransport`] over documents held in a `DashMap`, with a
//! subset of the query DSL (see [`super::evaluator`]), sorting, pagination,
//! `terms`/`global` aggregations and `term`/`completion` suggesters. Used by
//! the test-suite and for local development without a cluster.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Map, Value};

use super::evaluator::{self, DocumentLookup};
use super::traits::{SearchRequest, SearchTransport, TransportError};

/// Default number of hits when the request sets no size
pub const DEFAULT_PAGE_SIZE: usize = 10;

const DEFAULT_TERMS_SIZE: usize = 10;
const DEFAULT_SUGGEST_SIZE: usize = 5;

#[derive(Debug, Clone)]
struct StoredDocument {
    id: String,
    source: Value,
}

struct IndexView<'a>(&'a [StoredDocument]);

impl DocumentLookup for IndexView<'_> {
    fn source(&self, id: &str) -> Option<&Value> {
        self.0.iter().find(|d| d.id == id).map(|d| &d.source)
    }

    fn sources(&self) -> Vec<&Value> {
        self.0.iter().map(|d| &d.source).collect()
    }
}

/// Round-trip counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportStats {
    /// `search` calls
    pub searches: u64,
    /// `count` calls
    pub counts: u64,
    /// `get` calls
    pub gets: u64,
}

impl TransportStats {
    /// Total round trips of any kind
    pub fn total(&self) -> u64 {
        self.searches + self.counts + self.gets
    }
}

pub struct InMemoryTransport {
    indices: DashMap<String, Vec<StoredDocument>>,
    searches: AtomicU64,
    counts: AtomicU64,
    gets: AtomicU64,
}

impl InMemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            indices: DashMap::new(),
            searches: AtomicU64::new(0),
            counts: AtomicU64::new(0),
            gets: AtomicU64::new(0),
        }
    }

    /// Index (or replace) a document. Insertion order breaks score ties.
    pub fn index_document(&self, index: &str, id: impl Into<String>, source: Value) {
        let id = id.into();
        let mut docs = self.indices.entry(index.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => existing.source = source,
            None => docs.push(StoredDocument { id, source }),
        }
    }

    /// Remove a document; returns whether it existed
    pub fn delete_document(&self, index: &str, id: &str) -> bool {
        match self.indices.get_mut(index) {
            Some(mut docs) => {
                let before = docs.len();
                docs.retain(|d| d.id != id);
                docs.len() != before
            }
            None => false,
        }
    }

    /// Document count of an index
    #[must_use]
    pub fn len(&self, index: &str) -> usize {
        self.indices.get(index).map(|d| d.len()).unwrap_or(0)
    }

    /// Whether an index holds no documents
    #[must_use]
    pub fn is_empty(&self, index: &str) -> bool {
        self.len(index) == 0
    }

    /// Drop an index entirely
    pub fn delete_index(&self, index: &str) {
        self.indices.remove(index);
    }

    /// Round trips served so far
    pub fn stats(&self) -> TransportStats {
        TransportStats {
            searches: self.searches.load(AtomicOrdering::Relaxed),
            counts: self.counts.load(AtomicOrdering::Relaxed),
            gets: self.gets.load(AtomicOrdering::Relaxed),
        }
    }

    fn snapshot(&self, index: &str) -> Result<Vec<StoredDocument>, TransportError> {
        self.indices
            .get(index)
            .map(|docs| docs.clone())
            .ok_or_else(|| TransportError::Backend(format!("no such index [{}]", index)))
    }

    fn matching(
        docs: &[StoredDocument],
        query: Option<&Value>,
    ) -> Result<Vec<(usize, f64)>, TransportError> {
        let view = IndexView(docs);
        let mut hits = Vec::new();
        for (position, doc) in docs.iter().enumerate() {
            let score = match query {
                Some(q) => evaluator::evaluate(q, &doc.source, &doc.id, &view)?,
                None => Some(1.0),
            };
            if let Some(score) = score {
                hits.push((position, score));
            }
        }
        Ok(hits)
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_key<'a>(doc: &'a Value, field: &str) -> Option<&'a Value> {
    evaluator::field_values(doc, field).into_iter().next()
}

/// Parse `sort` into (field, descending) pairs. `_score` sorts descending.
fn parse_sort(sort: Option<&Value>) -> Vec<(String, bool)> {
    let items = match sort {
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
        None => return Vec::new(),
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(field) => Some((field.clone(), field == "_score")),
            Value::Object(map) => map.iter().next().map(|(field, order)| {
                let order = order.get("order").unwrap_or(order);
                (field.clone(), order.as_str() == Some("desc"))
            }),
            _ => None,
        })
        .collect()
}

fn compare_hits(
    a: &(usize, f64),
    b: &(usize, f64),
    docs: &[StoredDocument],
    sort: &[(String, bool)],
) -> Ordering {
    for (field, descending) in sort {
        let ordering = if field == "_score" {
            a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal)
        } else {
            match (sort_key(&docs[a.0].source, field), sort_key(&docs[b.0].source, field)) {
                (Some(x), Some(y)) => evaluator::compare_values(x, y).unwrap_or(Ordering::Equal),
                // Missing values sort last in both directions
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        };
        let ordering = if *descending { ordering.reverse() } else { ordering };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn terms_aggregation(docs: &[StoredDocument], hits: &[(usize, f64)], terms: &Value) -> Value {
    let field = terms.get("field").and_then(Value::as_str).unwrap_or_default();
    let size = terms
        .get("size")
        .and_then(Value::as_u64)
        .map(|s| s as usize)
        .unwrap_or(DEFAULT_TERMS_SIZE);

    let mut counts: Vec<(Value, u64)> = Vec::new();
    for (position, _) in hits {
        let mut seen: Vec<&Value> = Vec::new();
        for value in evaluator::field_values(&docs[*position].source, field) {
            if value.is_null() || seen.contains(&value) {
                continue;
            }
            seen.push(value);
            match counts.iter_mut().find(|(k, _)| k == value) {
                Some((_, count)) => *count += 1,
                None => counts.push((value.clone(), 1)),
            }
        }
    }
    counts.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| evaluator::compare_values(&a.0, &b.0).unwrap_or(Ordering::Equal))
    });

    let other: u64 = counts.iter().skip(size).map(|(_, c)| c).sum();
    let buckets: Vec<Value> = counts
        .into_iter()
        .take(size)
        .map(|(key, doc_count)| json!({ "key": key, "doc_count": doc_count }))
        .collect();
    json!({
        "doc_count_error_upper_bound": 0,
        "sum_other_doc_count": other,
        "buckets": buckets,
    })
}

fn aggregations(
    docs: &[StoredDocument],
    hits: &[(usize, f64)],
    aggs: &Map<String, Value>,
) -> Result<Value, TransportError> {
    let mut out = Map::new();
    for (name, agg) in aggs {
        if let Some(terms) = agg.get("terms") {
            out.insert(name.clone(), terms_aggregation(docs, hits, terms));
        } else if agg.get("global").is_some() {
            let everything: Vec<(usize, f64)> = (0..docs.len()).map(|p| (p, 1.0)).collect();
            let mut bucket = Map::new();
            bucket.insert("doc_count".to_string(), json!(docs.len()));
            let sub = agg
                .get("aggs")
                .or_else(|| agg.get("aggregations"))
                .and_then(Value::as_object);
            if let Some(sub) = sub {
                if let Value::Object(inner) = aggregations(docs, &everything, sub)? {
                    bucket.extend(inner);
                }
            }
            out.insert(name.clone(), Value::Object(bucket));
        } else {
            return Err(TransportError::Backend(format!("unsupported aggregation [{}]", name)));
        }
    }
    Ok(Value::Object(out))
}

fn suggestions(docs: &[StoredDocument], suggest: &Map<String, Value>) -> Value {
    let mut out = Map::new();
    for (name, entry) in suggest {
        if let Some(term) = entry.get("term") {
            let field = term.get("field").and_then(Value::as_str).unwrap_or_default();
            let size = term
                .get("size")
                .and_then(Value::as_u64)
                .map(|s| s as usize)
                .unwrap_or(DEFAULT_SUGGEST_SIZE);
            let text = entry.get("text").and_then(Value::as_str).unwrap_or_default();

            let mut frequencies: HashMap<String, u64> = HashMap::new();
            for doc in docs {
                for token in evaluator::field_tokens(&doc.source, field) {
                    *frequencies.entry(token).or_default() += 1;
                }
            }

            let mut entries = Vec::new();
            let mut offset = 0;
            for word in text.split(' ') {
                let token = word.to_lowercase();
                let length = word.chars().count();
                let mut options: Vec<(String, u64, usize)> = if frequencies.contains_key(&token) {
                    Vec::new()
                } else {
                    frequencies
                        .iter()
                        .map(|(candidate, freq)| (candidate.clone(), *freq, evaluator::edit_distance(&token, candidate)))
                        .filter(|(_, _, distance)| *distance > 0 && *distance <= 2)
                        .collect()
                };
                options.sort_by(|a, b| a.2.cmp(&b.2).then(b.1.cmp(&a.1)).then(a.0.cmp(&b.0)));
                options.truncate(size);
                let options: Vec<Value> = options
                    .into_iter()
                    .map(|(text, freq, distance)| {
                        let score = 1.0 - distance as f64 / length.max(1) as f64;
                        json!({ "text": text, "score": score, "freq": freq })
                    })
                    .collect();
                if !word.is_empty() {
                    entries.push(json!({
                        "text": word,
                        "offset": offset,
                        "length": length,
                        "options": options,
                    }));
                }
                offset += length + 1;
            }
            out.insert(name.clone(), Value::Array(entries));
        } else if let Some(completion) = entry.get("completion") {
            let field = completion.get("field").and_then(Value::as_str).unwrap_or_default();
            let prefix = entry.get("prefix").and_then(Value::as_str).unwrap_or_default();
            let needle = prefix.to_lowercase();
            let mut texts: Vec<String> = Vec::new();
            for doc in docs {
                for value in evaluator::field_values(&doc.source, field) {
                    let candidates: Vec<&str> = match value {
                        Value::String(s) => vec![s.as_str()],
                        Value::Object(map) => match map.get("input") {
                            Some(Value::String(s)) => vec![s.as_str()],
                            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
                            _ => Vec::new(),
                        },
                        _ => Vec::new(),
                    };
                    for candidate in candidates {
                        if candidate.to_lowercase().starts_with(&needle) && !texts.iter().any(|t| t == candidate) {
                            texts.push(candidate.to_string());
                        }
                    }
                }
            }
            texts.sort();
            let options: Vec<Value> = texts.into_iter().map(|t| json!({ "text": t })).collect();
            out.insert(
                name.clone(),
                json!([{
                    "text": prefix,
                    "offset": 0,
                    "length": prefix.chars().count(),
                    "options": options,
                }]),
            );
        }
    }
    Value::Object(out)
}

#[async_trait]
impl SearchTransport for InMemoryTransport {
    async fn search(&self, request: &SearchRequest) -> Result<Value, TransportError> {
        self.searches.fetch_add(1, AtomicOrdering::Relaxed);
        let docs = self.snapshot(&request.index)?;
        let body = &request.body;

        let mut hits = Self::matching(&docs, body.get("query"))?;
        let sort = parse_sort(body.get("sort"));
        if sort.is_empty() {
            hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        } else {
            hits.sort_by(|a, b| compare_hits(a, b, &docs, &sort));
        }

        let total = hits.len();
        let max_score = hits.iter().map(|h| h.1).fold(None, |acc: Option<f64>, s| {
            Some(acc.map_or(s, |a| a.max(s)))
        });

        let from = request
            .from
            .or_else(|| body.get("from").and_then(Value::as_u64).map(|v| v as usize))
            .unwrap_or(0);
        let size = request
            .size
            .or_else(|| body.get("size").and_then(Value::as_u64).map(|v| v as usize))
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let page: Vec<Value> = hits
            .iter()
            .skip(from)
            .take(size)
            .map(|(position, score)| {
                let doc = &docs[*position];
                json!({
                    "_index": request.index,
                    "_id": doc.id,
                    "_score": score,
                    "_source": doc.source,
                })
            })
            .collect();

        let mut response = json!({
            "took": 0,
            "timed_out": false,
            "hits": {
                "total": { "value": total, "relation": "eq" },
                "max_score": max_score,
                "hits": page,
            }
        });

        let aggs = body.get("aggs").or_else(|| body.get("aggregations")).and_then(Value::as_object);
        if let Some(aggs) = aggs {
            response["aggregations"] = aggregations(&docs, &hits, aggs)?;
        }
        if let Some(suggest) = body.get("suggest").and_then(Value::as_object) {
            response["suggest"] = suggestions(&docs, suggest);
        }

        Ok(response)
    }

    async fn count(&self, index: &str, body: Option<&Value>) -> Result<u64, TransportError> {
        self.counts.fetch_add(1, AtomicOrdering::Relaxed);
        let docs = self.snapshot(index)?;
        let hits = Self::matching(&docs, body.and_then(|b| b.get("query")))?;
        Ok(hits.len() as u64)
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>, TransportError> {
        self.gets.fetch_add(1, AtomicOrdering::Relaxed);
        let docs = self.snapshot(index)?;
        Ok(docs.into_iter().find(|d| d.id == id).map(|d| d.source))
    }
}
