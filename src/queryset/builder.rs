// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Chaining operations.
//!
//! Every method here returns a fresh clone carrying the modified state and an
//! empty result cache, except [`Queryset::mlt`], which switches the cursor
//! itself into more-like-this mode.

use serde_json::{Map, Value};
use tracing::debug;

use super::types::{FacetRequest, MltOptions, MltParams, SearchArgs, SearchMode, SuggestRequest};
use super::Queryset;
use crate::config::Fuzziness;
use crate::error::{QueryError, Result};
use crate::search::{id_to_string, FilterValue, Lookup, Operator};

impl<M> Queryset<M> {
    // ═══════════════════════════════════════════════════════════════════════════
    // Query text and filters
    // ═══════════════════════════════════════════════════════════════════════════

    /// Unfiltered copy of this cursor.
    pub fn all(&self) -> Self {
        self.clone()
    }

    /// Free-text search over the descriptor's search fields.
    pub fn search(&self, text: impl Into<String>) -> Self {
        let mut clone = self.clone();
        clone.state.query = text.into();
        clone
    }

    /// Free-text and/or per-field search.
    ///
    /// Per-field queries are stored as filter lookups, so
    /// `SearchArgs::default().field("last_name", "Smith")` behaves like
    /// `filter([("last_name", "Smith")])`.
    pub fn search_with(&self, args: SearchArgs) -> Result<Self> {
        let text = args.text.filter(|t| !t.is_empty());
        if text.is_none() && args.fields.is_empty() {
            return Err(QueryError::Argument(
                "search() needs a query string or at least one field query".into(),
            ));
        }

        let mut clone = self.clone();
        if let Some(text) = text {
            clone.state.query = text;
        }
        clone.state.filters.extend(args.fields);
        Ok(clone)
    }

    /// Add filter lookups (`field[__sub]*[__op]` → operand).
    ///
    /// A key that is already present is overwritten.
    pub fn filter<I, K, V>(&self, lookups: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FilterValue>,
    {
        let mut clone = self.clone();
        clone
            .state
            .filters
            .extend(lookups.into_iter().map(|(k, v)| (k.into(), v.into())));
        clone
    }

    /// Add the complement of each lookup.
    ///
    /// ```text
    /// field          → field__must_not
    /// field__must_not → field
    /// field__should  → field__must_not
    /// field__gt      → field__lte     (gte ↔ lt, lt → gte, lte → gt)
    /// field__exists=b → field__exists=!b   (isnull alike)
    /// field__range   → NotSupported
    /// ```
    pub fn exclude<I, K, V>(&self, lookups: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FilterValue>,
    {
        let mut clone = self.clone();
        for (key, value) in lookups {
            let key = key.into();
            let value = value.into();
            let lookup = Lookup::parse(&key);

            let (key, value) = match lookup.operator {
                Operator::Must | Operator::Should => (lookup.key_with(Operator::MustNot), value),
                Operator::MustNot => (lookup.field.clone(), value),
                Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                    let inverse = lookup
                        .operator
                        .inverse_bound()
                        .ok_or_else(|| QueryError::unsupported(&key, "no complementary bound"))?;
                    (lookup.key_with(inverse), value)
                }
                Operator::Exists | Operator::IsNull => {
                    let flag = value
                        .as_bool()
                        .ok_or_else(|| QueryError::unsupported(&key, "expected a boolean operand"))?;
                    (key, FilterValue::from(!flag))
                }
                Operator::Range => {
                    return Err(QueryError::NotSupported(format!(
                        "'{}': range lookups cannot be excluded, exclude both bounds instead",
                        key
                    )));
                }
            };
            clone.state.filters.insert(key, value);
        }
        Ok(clone)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Ordering, facets, suggestions
    // ═══════════════════════════════════════════════════════════════════════════

    /// Replace the ordering. A leading `-` sorts descending.
    pub fn order_by<I, S>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut clone = self.clone();
        clone.state.ordering = Some(fields.into_iter().map(Into::into).collect());
        clone
    }

    /// Request term facets, counted over the whole index or the query's
    /// matches depending on the configured default.
    pub fn facet<I, S>(&self, fields: I, limit: Option<usize>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let global = self.config.global_facets;
        self.facet_global(fields, limit, global)
    }

    /// Request term facets with an explicit scope.
    ///
    /// `limit` sets the bucket size of the last field only.
    pub fn facet_global<I, S>(&self, fields: I, limit: Option<usize>, global: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut clone = self.clone();
        clone.state.facets = Some(FacetRequest {
            fields: fields.into_iter().map(Into::into).collect(),
            limit,
            global,
        });
        clone
    }

    /// Request term suggestions for the query text on each field.
    pub fn suggest<I, S>(&self, fields: I, limit: Option<usize>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut clone = self.clone();
        clone.state.suggest = Some(SuggestRequest {
            fields: fields.into_iter().map(Into::into).collect(),
            limit,
        });
        clone
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Request shaping
    // ═══════════════════════════════════════════════════════════════════════════

    /// Raw body fragment merged last into the request; its top-level keys
    /// replace anything compiled.
    pub fn extra(&self, body: Value) -> Result<Self> {
        let body: Map<String, Value> = match body {
            Value::Object(map) => map,
            other => {
                return Err(QueryError::Argument(format!(
                    "extra() expects a JSON object, got {}",
                    other
                )))
            }
        };
        let mut clone = self.clone();
        clone.state.extra_body = Some(body);
        Ok(clone)
    }

    /// Produce domain objects instead of raw documents.
    pub fn deserialize(&self) -> Self {
        let mut clone = self.clone();
        clone.state.deserialize = true;
        clone
    }

    /// Override the free-text fuzziness.
    pub fn fuzziness(&self, fuzziness: Fuzziness) -> Self {
        let mut clone = self.clone();
        clone.state.fuzziness = fuzziness;
        clone
    }

    /// Switch this cursor to more-like-this mode against document `id`.
    ///
    /// Unlike the other chaining methods this modifies the cursor in place
    /// and drops any cached results.
    pub fn mlt(&mut self, id: impl Into<Value>, options: MltOptions) -> &mut Self {
        let params = MltParams {
            id: id_to_string(&id.into()),
            fields: options
                .fields
                .unwrap_or_else(|| self.config.mlt_default_fields.clone()),
            min_term_frequency: options
                .min_term_frequency
                .unwrap_or(self.config.mlt_min_term_frequency),
            max_term_frequency: options
                .max_term_frequency
                .unwrap_or(self.config.mlt_max_term_frequency),
        };
        debug!(index = %self.descriptor.index, id = %params.id, "Switching to more-like-this");

        self.state.mode = SearchMode::MoreLikeThis;
        self.state.mlt = Some(params);
        self.invalidate();
        self
    }
}
