// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query Compiler
//!
//! Compiles a free-text query and a set of filter lookups into a single
//! Elasticsearch boolean query body.
//!
//! # Clause Mapping
//!
//! ```text
//! name="John"            (text)   → must:     [{match: {name: "John"}}]
//! id=3                   (other)  → must:     [{term:  {id: 3}}]
//! name__must_not="John"           → must_not: [{match: {name: "John"}}]
//! name__should="John"             → should:   [{match: {name: "John"}}]
//! id__gt=3                        → must:     [{range: {id: {gt: 3}}}]
//! id__range=(2, 3)                → must:     [{range: {id: {gte: 2, lte: 3}}}]
//! email__exists=true              → must:     [{exists: {field: "email"}}]
//! email__isnull=true              → must_not: [{exists: {field: "email"}}]
//! groups__value="a"      (nested) → must:     [{nested: {path: "groups", query: {bool: ...}}}]
//! ```
//!
//! Fragments are merged bucket-wise: two filters landing in `must` produce
//! one `must` array with both clauses.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use tracing::debug;

use super::index_manager::IndexDescriptor;
use super::lookup::{Lookup, Operator};
use super::value::FilterValue;
use crate::config::Fuzziness;
use crate::error::{QueryError, Result};

/// Boolean query compiler
pub struct QueryCompiler;

impl QueryCompiler {
    /// Compile to `{"query": {"bool": ...}}`.
    pub fn compile(
        query: &str,
        filters: &BTreeMap<String, FilterValue>,
        descriptor: &IndexDescriptor,
        fuzziness: Fuzziness,
    ) -> Result<Value> {
        let mut search = Map::new();

        if !query.is_empty() {
            search.insert(
                "must".to_string(),
                json!([{
                    "multi_match": {
                        "query": query,
                        "fields": descriptor.get_search_fields(),
                        "fuzziness": fuzziness.to_json(),
                    }
                }]),
            );
        } else if filters.is_empty() {
            search.insert("must".to_string(), json!([{ "match_all": {} }]));
        }

        for (key, value) in filters {
            let fragment = Self::compile_filter(key, value, descriptor)?;
            nested_update(&mut search, fragment);
        }

        let body = json!({ "query": { "bool": Value::Object(search) } });
        debug!(index = %descriptor.index, body = %body, "Compiled search body");
        Ok(body)
    }

    /// Compile one lookup into a boolean fragment (`{bucket: [clause]}`).
    pub fn compile_filter(
        key: &str,
        value: &FilterValue,
        descriptor: &IndexDescriptor,
    ) -> Result<Map<String, Value>> {
        let lookup = Lookup::parse(key);
        let root = lookup.root_field().to_string();
        let is_nested = descriptor.is_nested(&root);

        let (field_name, value) = match value {
            FilterValue::Entity(entity) if is_nested => {
                (format!("{}.id", lookup.field), FilterValue::Scalar(entity.id.clone()))
            }
            other => (lookup.field.clone(), other.clone()),
        };

        let fragment = match lookup.operator {
            Operator::Must | Operator::MustNot | Operator::Should => {
                if value.as_range().is_some() {
                    return Err(QueryError::unsupported(
                        key,
                        "a (lower, upper) pair needs the range operator",
                    ));
                }
                let mode = if descriptor.is_text(&root) { "match" } else { "term" };
                bucket(
                    lookup.operator.name(),
                    json!({ mode: { field_name.as_str(): value.to_json() } }),
                )
            }
            op if op.is_bound() => {
                if value.as_range().is_some() {
                    return Err(QueryError::unsupported(
                        key,
                        "single-bound comparison needs a scalar operand",
                    ));
                }
                bucket(
                    "must",
                    json!({ "range": { field_name.as_str(): { op.name(): value.to_json() } } }),
                )
            }
            Operator::Range => {
                let (lower, upper) = value
                    .as_range()
                    .ok_or_else(|| QueryError::unsupported(key, "expected a (lower, upper) pair"))?;
                bucket(
                    "must",
                    json!({ "range": { field_name.as_str(): {
                        "gte": lower.to_json(),
                        "lte": upper.to_json(),
                    } } }),
                )
            }
            Operator::Exists | Operator::IsNull => {
                let flag = value
                    .as_bool()
                    .ok_or_else(|| QueryError::unsupported(key, "expected a boolean operand"))?;
                // isnull=true and exists=false both mean "field absent"
                let present = if lookup.operator == Operator::IsNull { !flag } else { flag };
                let bucket_name = if present { "must" } else { "must_not" };
                bucket(bucket_name, json!({ "exists": { "field": field_name } }))
            }
            op => {
                return Err(QueryError::unsupported(key, format!("unrecognized operator '{}'", op)));
            }
        };

        if is_nested {
            return Ok(bucket(
                "must",
                json!({ "nested": { "path": root, "query": { "bool": Value::Object(fragment) } } }),
            ));
        }

        Ok(fragment)
    }
}

fn bucket(name: &str, clause: Value) -> Map<String, Value> {
    let mut fragment = Map::new();
    fragment.insert(name.to_string(), Value::Array(vec![clause]));
    fragment
}

/// Deep, bucket-aware merge of `update` into `target`.
///
/// Objects merge recursively, arrays concatenate, anything else is replaced.
pub fn nested_update(target: &mut Map<String, Value>, update: Map<String, Value>) {
    for (key, value) in update {
        let replacement = match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                nested_update(existing, incoming);
                None
            }
            (Some(Value::Array(existing)), Value::Array(incoming)) => {
                existing.extend(incoming);
                None
            }
            (_, value) => Some(value),
        };
        if let Some(value) = replacement {
            target.insert(key, value);
        }
    }
}
