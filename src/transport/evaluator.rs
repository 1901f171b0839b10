// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query DSL evaluator for the in-memory backend.
//!
//! Scores one JSON document against a query clause. `Ok(None)` means the
//! document does not match; `Ok(Some(score))` means it does.
//!
//! # Supported Clauses
//!
//! ```text
//! match_all                 - every document, score 1
//! bool                      - must / filter / must_not / should
//! multi_match               - analyzed OR-match over several fields, fuzzy
//! match                     - analyzed OR-match on one field
//! term                      - exact value (any element of arrays)
//! range                     - gt / gte / lt / lte (numbers, then strings)
//! exists                    - field present and not null
//! nested                    - sub-query against each element of an array
//! more_like_this            - shares terms with a liked document
//! ```
//!
//! Anything else is rejected the way a real cluster rejects an unknown
//! query type.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::traits::TransportError;
use crate::search::id_to_string;

/// Resolve every value reachable at a dotted path, flattening arrays.
pub fn field_values<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current: Vec<&Value> = vec![doc];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => {
                    if let Some(child) = map.get(segment) {
                        push_flattened(child, &mut next);
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        if let Some(child) = item.get(segment) {
                            push_flattened(child, &mut next);
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }
    current
}

fn push_flattened<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                push_flattened(item, out);
            }
        }
        other => out.push(other),
    }
}

/// Lowercased alphanumeric tokens of a string.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Tokens of every string (or scalar rendered as string) at `path`.
pub fn field_tokens(doc: &Value, path: &str) -> Vec<String> {
    field_values(doc, path)
        .into_iter()
        .flat_map(|v| match v {
            Value::String(s) => tokenize(s),
            Value::Number(n) => vec![n.to_string()],
            Value::Bool(b) => vec![b.to_string()],
            _ => Vec::new(),
        })
        .collect()
}

/// Tokens of every string value in the document, at any depth.
pub fn all_tokens(doc: &Value) -> Vec<String> {
    match doc {
        Value::String(s) => tokenize(s),
        Value::Array(items) => items.iter().flat_map(all_tokens).collect(),
        Value::Object(map) => map.values().flat_map(all_tokens).collect(),
        _ => Vec::new(),
    }
}

/// Levenshtein distance between two strings.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Allowed edits for a term under `fuzziness` (`"AUTO"` or a number).
fn allowed_edits(fuzziness: Option<&Value>, term: &str) -> usize {
    match fuzziness {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) as usize,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("auto") => match term.chars().count() {
            0..=2 => 0,
            3..=5 => 1,
            _ => 2,
        },
        _ => 0,
    }
}

/// Compare two JSON scalars: numbers numerically, strings lexically.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::String(y)) => x.as_f64()?.partial_cmp(&y.parse::<f64>().ok()?),
        (Value::String(x), Value::Number(y)) => x.parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    a == b || compare_values(a, b) == Some(Ordering::Equal)
}

fn single_entry<'a>(clause: &'a Value, kind: &str) -> Result<(&'a String, &'a Value), TransportError> {
    clause
        .as_object()
        .and_then(|m| m.iter().next())
        .ok_or_else(|| TransportError::Backend(format!("[{}] query malformed", kind)))
}

/// Context for clauses that need other documents (more_like_this).
pub trait DocumentLookup {
    fn source(&self, id: &str) -> Option<&Value>;

    /// Every document of the index
    fn sources(&self) -> Vec<&Value>;
}

/// Score `doc` against `query`.
pub fn evaluate(
    query: &Value,
    doc: &Value,
    doc_id: &str,
    lookup: &dyn DocumentLookup,
) -> Result<Option<f64>, TransportError> {
    let (kind, clause) = single_entry(query, "query")?;
    match kind.as_str() {
        "match_all" => Ok(Some(1.0)),
        "bool" => evaluate_bool(clause, doc, doc_id, lookup),
        "multi_match" => Ok(evaluate_multi_match(clause, doc)),
        "match" => {
            let (field, value) = single_entry(clause, "match")?;
            let value = value.get("query").unwrap_or(value);
            Ok(evaluate_match(field, value, doc, None))
        }
        "term" => {
            let (field, value) = single_entry(clause, "term")?;
            let value = value.get("value").unwrap_or(value);
            let hit = field_values(doc, field).into_iter().any(|v| values_equal(v, value));
            Ok(hit.then_some(1.0))
        }
        "range" => {
            let (field, bounds) = single_entry(clause, "range")?;
            Ok(evaluate_range(field, bounds, doc).then_some(1.0))
        }
        "exists" => {
            let field = clause
                .get("field")
                .and_then(Value::as_str)
                .ok_or_else(|| TransportError::Backend("[exists] requires field".into()))?;
            let present = field_values(doc, field).into_iter().any(|v| !v.is_null());
            Ok(present.then_some(1.0))
        }
        "nested" => evaluate_nested(clause, doc, doc_id, lookup),
        "more_like_this" => Ok(evaluate_more_like_this(clause, doc, doc_id, lookup)),
        other => Err(TransportError::Backend(format!("unknown query [{}]", other))),
    }
}

fn clauses(bool_query: &Value, bucket: &str) -> Vec<Value> {
    match bool_query.get(bucket) {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Object(_)) => vec![bool_query[bucket].clone()],
        _ => Vec::new(),
    }
}

fn evaluate_bool(
    clause: &Value,
    doc: &Value,
    doc_id: &str,
    lookup: &dyn DocumentLookup,
) -> Result<Option<f64>, TransportError> {
    let must = clauses(clause, "must");
    let filter = clauses(clause, "filter");
    let must_not = clauses(clause, "must_not");
    let should = clauses(clause, "should");

    let mut score = 0.0;
    for q in &must {
        match evaluate(q, doc, doc_id, lookup)? {
            Some(s) => score += s,
            None => return Ok(None),
        }
    }
    for q in &filter {
        if evaluate(q, doc, doc_id, lookup)?.is_none() {
            return Ok(None);
        }
    }
    for q in &must_not {
        if evaluate(q, doc, doc_id, lookup)?.is_some() {
            return Ok(None);
        }
    }

    let mut should_hits = 0;
    for q in &should {
        if let Some(s) = evaluate(q, doc, doc_id, lookup)? {
            should_hits += 1;
            score += s;
        }
    }
    // Without must/filter clauses at least one should clause has to match
    if must.is_empty() && filter.is_empty() && !should.is_empty() && should_hits == 0 {
        return Ok(None);
    }

    if must.is_empty() && should_hits == 0 {
        score = 1.0;
    }
    Ok(Some(score))
}

fn evaluate_match(field: &str, value: &Value, doc: &Value, fuzziness: Option<&Value>) -> Option<f64> {
    let query_tokens = match value {
        Value::String(s) => tokenize(s),
        other => {
            let hit = field_values(doc, field).into_iter().any(|v| values_equal(v, other));
            return hit.then_some(1.0);
        }
    };
    let doc_tokens = field_tokens(doc, field);
    let hits = query_tokens
        .iter()
        .filter(|qt| {
            let edits = allowed_edits(fuzziness, qt);
            doc_tokens.iter().any(|dt| edit_distance(qt, dt) <= edits)
        })
        .count();
    (hits > 0).then_some(hits as f64)
}

fn evaluate_multi_match(clause: &Value, doc: &Value) -> Option<f64> {
    let query = clause.get("query")?;
    let fields: Vec<String> = match clause.get("fields") {
        Some(Value::Array(items)) => items.iter().filter_map(|f| f.as_str().map(String::from)).collect(),
        _ => Vec::new(),
    };
    let fuzziness = clause.get("fuzziness");

    let scores: Vec<f64> = if fields.is_empty() {
        let query_tokens = tokenize(query.as_str().unwrap_or_default());
        let doc_tokens = all_tokens(doc);
        let hits = query_tokens
            .iter()
            .filter(|qt| {
                let edits = allowed_edits(fuzziness, qt);
                doc_tokens.iter().any(|dt| edit_distance(qt, dt) <= edits)
            })
            .count();
        vec![hits as f64]
    } else {
        fields
            .iter()
            .filter_map(|f| evaluate_match(f, query, doc, fuzziness))
            .collect()
    };
    let best = scores.into_iter().fold(0.0, f64::max);
    (best > 0.0).then_some(best)
}

fn evaluate_range(field: &str, bounds: &Value, doc: &Value) -> bool {
    let Some(bounds) = bounds.as_object() else {
        return false;
    };
    field_values(doc, field).into_iter().any(|v| {
        bounds.iter().all(|(op, bound)| {
            let Some(ordering) = compare_values(v, bound) else {
                return false;
            };
            match op.as_str() {
                "gt" => ordering == Ordering::Greater,
                "gte" => ordering != Ordering::Less,
                "lt" => ordering == Ordering::Less,
                "lte" => ordering != Ordering::Greater,
                // format, boost, time_zone and friends do not constrain
                _ => true,
            }
        })
    })
}

fn evaluate_nested(
    clause: &Value,
    doc: &Value,
    doc_id: &str,
    lookup: &dyn DocumentLookup,
) -> Result<Option<f64>, TransportError> {
    let path = clause
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| TransportError::Backend("[nested] requires path".into()))?;
    let query = clause
        .get("query")
        .ok_or_else(|| TransportError::Backend("[nested] requires query".into()))?;

    let mut best: Option<f64> = None;
    for element in field_values(doc, path) {
        // Re-root the element so "path.x" resolves inside it
        let mut scoped = Map::new();
        scoped.insert(path.to_string(), element.clone());
        if let Some(score) = evaluate(query, &Value::Object(scoped), doc_id, lookup)? {
            best = Some(best.map_or(score, |b: f64| b.max(score)));
        }
    }
    Ok(best)
}

fn evaluate_more_like_this(
    clause: &Value,
    doc: &Value,
    doc_id: &str,
    lookup: &dyn DocumentLookup,
) -> Option<f64> {
    let fields: Vec<String> = match clause.get("fields") {
        Some(Value::Array(items)) => items.iter().filter_map(|f| f.as_str().map(String::from)).collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => vec!["_all".to_string()],
    };
    let liked_ids: Vec<String> = match clause.get("like") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("_id"))
            .map(id_to_string)
            .collect(),
        _ => Vec::new(),
    };
    if liked_ids.iter().any(|id| id == doc_id) {
        return None;
    }
    let min_tf = clause.get("min_term_freq").and_then(Value::as_u64).unwrap_or(1) as usize;
    let max_df = clause.get("max_doc_freq").and_then(Value::as_u64).map(|n| n as usize);

    let tokens_of = |source: &Value| -> Vec<String> {
        if fields.iter().any(|f| f == "_all") {
            all_tokens(source)
        } else {
            fields.iter().flat_map(|f| field_tokens(source, f)).collect()
        }
    };

    let mut liked_terms: Vec<String> = Vec::new();
    for id in &liked_ids {
        if let Some(source) = lookup.source(id) {
            let tokens = tokens_of(source);
            for token in &tokens {
                let tf = tokens.iter().filter(|t| *t == token).count();
                if tf >= min_tf && !liked_terms.contains(token) {
                    liked_terms.push(token.clone());
                }
            }
        }
    }

    if let Some(max_df) = max_df {
        let corpus: Vec<Vec<String>> = lookup.sources().into_iter().map(|s| tokens_of(s)).collect();
        liked_terms.retain(|term| corpus.iter().filter(|tokens| tokens.contains(term)).count() <= max_df);
    }

    let doc_tokens = tokens_of(doc);
    let shared = liked_terms.iter().filter(|t| doc_tokens.contains(t)).count();
    (shared > 0).then_some(shared as f64)
}
