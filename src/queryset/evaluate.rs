// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Terminal operations.
//!
//! The first terminal call on a cursor sends one search request and fills the
//! result cache (rows, total, max score, facets, suggestions, raw response).
//! Later calls answer from the cache until the window changes.
//!
//! ```text
//! rows / len / contains / response / facets / suggestions / max_score
//!     → ensure_evaluated() → cached?  yes → answer
//!                                      no  → RequestBuilder → transport.search → unpack
//! get_index / slice → window covered by cache?  no → set window, clear, re-fetch
//! count → cached total | cached count | count request (MLT: full evaluation)
//! ```

use std::ops::{Bound, RangeBounds};

use serde_json::Value;
use tracing::debug;

use super::types::{EvaluationResult, Row, SearchMode};
use super::Queryset;
use crate::error::{QueryError, Result};
use crate::metrics::{self, LatencyTimer};
use crate::search::{id_to_string, RequestBuilder, SearchResponse};

const TRUNCATION_MARKER: &str = "...(remaining elements truncated)...";

impl<M> Queryset<M> {
    // ═══════════════════════════════════════════════════════════════════════════
    // Evaluation
    // ═══════════════════════════════════════════════════════════════════════════

    fn request_builder(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(&self.descriptor, &self.config.global_facets_name)
    }

    async fn ensure_evaluated(&mut self) -> Result<&EvaluationResult<M>> {
        let result = match self.result.take() {
            Some(cached) => {
                metrics::record_cache(true);
                cached
            }
            None => {
                metrics::record_cache(false);
                self.run_search().await?
            }
        };
        let result: &EvaluationResult<M> = self.result.insert(result);
        Ok(result)
    }

    async fn run_search(&self) -> Result<EvaluationResult<M>> {
        let request = self.request_builder().search(&self.state).inspect_err(|e| {
            metrics::record_compile_error(compile_error_kind(e));
        })?;

        let raw = {
            let _timer = LatencyTimer::new("search");
            self.transport.search(&request).await
        };
        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                metrics::record_request("search", "error");
                return Err(e.into());
            }
        };
        metrics::record_request("search", "success");

        let result = self.unpack(raw)?;
        metrics::record_rows(result.rows.len());
        debug!(
            index = %self.descriptor.index,
            total = result.total,
            rows = result.rows.len(),
            "Queryset evaluated"
        );
        Ok(result)
    }

    fn unpack(&self, raw: Value) -> Result<EvaluationResult<M>> {
        let parsed = SearchResponse::parse(&raw)?;

        // More-like-this requests carry no from/size, so the window is cut here.
        let (skip, take) = match self.state.mode {
            SearchMode::MoreLikeThis => (
                self.state.start,
                self.state.stop.map_or(usize::MAX, |stop| stop - self.state.start),
            ),
            SearchMode::Standard => (0, usize::MAX),
        };
        let rows = parsed
            .hits
            .hits
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|hit| self.to_row(hit.source))
            .collect::<Result<Vec<_>>>()?;

        let facets = match &self.state.facets {
            Some(request) if request.global => parsed
                .aggregations
                .as_ref()
                .and_then(|aggs| aggs.get(&self.config.global_facets_name))
                .cloned(),
            Some(_) => parsed.aggregations.clone(),
            None => None,
        };

        Ok(EvaluationResult {
            rows,
            total: parsed.hits.total.value(),
            max_score: parsed.hits.max_score,
            facets,
            suggestions: parsed.suggest,
            response: raw,
        })
    }

    fn to_row(&self, source: Value) -> Result<Row<M>> {
        if self.state.deserialize {
            Ok(Row::Object(self.serializer.from_document(&source)?))
        } else {
            Ok(Row::Document(source))
        }
    }

    fn row_identifier(&self, row: &Row<M>) -> Option<Value> {
        match row {
            Row::Document(doc) => doc.get("id").cloned(),
            Row::Object(obj) => self.serializer.identifier(obj),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Rows
    // ═══════════════════════════════════════════════════════════════════════════

    /// Rows of the current window.
    pub async fn rows(&mut self) -> Result<&[Row<M>]> {
        Ok(&self.ensure_evaluated().await?.rows)
    }

    /// Iterate over the rows of the current window.
    pub async fn fetch(&mut self) -> Result<std::slice::Iter<'_, Row<M>>> {
        Ok(self.rows().await?.iter())
    }

    /// Number of rows in the current window (not the total match count).
    pub async fn len(&mut self) -> Result<usize> {
        Ok(self.ensure_evaluated().await?.rows.len())
    }

    /// Whether a row with identifier `id` is in the current window.
    pub async fn contains(&mut self, id: impl Into<Value>) -> Result<bool> {
        let wanted = id_to_string(&id.into());
        self.ensure_evaluated().await?;
        let rows = self.result.as_ref().map(|r| r.rows.as_slice()).unwrap_or(&[]);
        Ok(rows
            .iter()
            .filter_map(|row| self.row_identifier(row))
            .any(|found| id_to_string(&found) == wanted))
    }

    /// Total number of matches.
    ///
    /// Answers from the evaluated result or an earlier count when available;
    /// otherwise sends a count request. More-like-this has no count request
    /// and evaluates the cursor instead.
    pub async fn count(&mut self) -> Result<u64> {
        if let Some(result) = &self.result {
            return Ok(result.total);
        }
        if let Some(counted) = self.counted {
            return Ok(counted);
        }
        if self.state.mode == SearchMode::MoreLikeThis {
            return Ok(self.ensure_evaluated().await?.total);
        }

        let body = self.request_builder().query_body(&self.state)?;
        let counted = {
            let _timer = LatencyTimer::new("count");
            self.transport.count(&self.descriptor.index, Some(&body)).await
        };
        match counted {
            Ok(total) => {
                metrics::record_request("count", "success");
                self.counted = Some(total);
                Ok(total)
            }
            Err(e) => {
                metrics::record_request("count", "error");
                Err(e.into())
            }
        }
    }

    /// Whether the cursor matches nothing.
    pub async fn is_empty(&mut self) -> Result<bool> {
        Ok(self.count().await? == 0)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Result metadata
    // ═══════════════════════════════════════════════════════════════════════════

    /// Raw backend response of the evaluation.
    pub async fn response(&mut self) -> Result<&Value> {
        Ok(&self.ensure_evaluated().await?.response)
    }

    /// Facet payload: per-field buckets, plus `doc_count` for global facets.
    pub async fn facets(&mut self) -> Result<Option<&Value>> {
        Ok(self.ensure_evaluated().await?.facets.as_ref())
    }

    /// Suggestion payload keyed by field.
    pub async fn suggestions(&mut self) -> Result<Option<&Value>> {
        Ok(self.ensure_evaluated().await?.suggestions.as_ref())
    }

    /// Best relevance score.
    pub async fn max_score(&mut self) -> Result<Option<f64>> {
        Ok(self.ensure_evaluated().await?.max_score)
    }

    /// Completion suggestions for `prefix` on a completion field.
    ///
    /// Independent of the cursor's state and cache. A response without a
    /// suggestion payload yields an empty list.
    pub async fn complete(&self, field: &str, prefix: &str) -> Result<Vec<String>> {
        let request = self.request_builder().completion(field, prefix);
        let raw = {
            let _timer = LatencyTimer::new("complete");
            self.transport.search(&request).await
        };
        let raw = raw.inspect_err(|_| metrics::record_request("complete", "error"))?;
        metrics::record_request("complete", "success");

        let options = raw
            .get("suggest")
            .and_then(|s| s.get(field))
            .and_then(|entries| entries.get(0))
            .and_then(|entry| entry.get("options"))
            .and_then(Value::as_array);
        Ok(options
            .map(|options| {
                options
                    .iter()
                    .filter_map(|o| o.get("text").and_then(Value::as_str).map(String::from))
                    .collect()
            })
            .unwrap_or_default())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Unsupported operations
    // ═══════════════════════════════════════════════════════════════════════════

    /// Not available: the cursor is read-only.
    pub fn update(&self) -> Result<()> {
        Err(QueryError::OperationNotSupported("update"))
    }

    /// Not available: the cursor is read-only.
    pub fn delete(&self) -> Result<()> {
        Err(QueryError::OperationNotSupported("delete"))
    }

    /// Not available: documents carry no relations to prefetch.
    pub fn prefetch_related(&self) -> Result<Self> {
        Err(QueryError::OperationNotSupported("prefetch_related"))
    }

    /// Not available: cursors cannot be combined.
    pub fn and(&self, _other: &Self) -> Result<Self> {
        Err(QueryError::OperationNotSupported("and"))
    }

    /// Not available: cursors cannot be combined.
    pub fn or(&self, _other: &Self) -> Result<Self> {
        Err(QueryError::OperationNotSupported("or"))
    }
}

impl<M: Clone> Queryset<M> {
    // ═══════════════════════════════════════════════════════════════════════════
    // Positional access
    // ═══════════════════════════════════════════════════════════════════════════

    /// Row at absolute position `index`.
    ///
    /// Served from the cache when the cached window holds it; otherwise the
    /// window becomes `[index, index + 1)` and the cursor re-fetches.
    pub async fn get_index(&mut self, index: usize) -> Result<Row<M>> {
        if let Some(row) = self.cached_row(index) {
            metrics::record_cache(true);
            return Ok(row);
        }
        let Some(stop) = index.checked_add(1) else {
            return Err(QueryError::IndexOutOfRange { index, available: 0 });
        };
        if self.result.is_some() && self.window_covers(index, Some(stop)) {
            let available = self.result.as_ref().map_or(0, |r| r.rows.len());
            return Err(QueryError::IndexOutOfRange { index, available });
        }

        self.set_window(index, Some(stop));
        let result = self.ensure_evaluated().await?;
        result.rows.first().cloned().ok_or(QueryError::IndexOutOfRange {
            index,
            available: result.total as usize,
        })
    }

    /// Rows in `range` (absolute positions), as an owned list.
    ///
    /// `..` and `n..` leave the size to the backend default.
    pub async fn slice(&mut self, range: impl RangeBounds<usize>) -> Result<Vec<Row<M>>> {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.checked_add(1).ok_or_else(|| past_end("start"))?,
            Bound::Unbounded => 0,
        };
        let stop = match range.end_bound() {
            Bound::Included(&e) => Some(e.checked_add(1).ok_or_else(|| past_end("end"))?),
            Bound::Excluded(&e) => Some(e),
            Bound::Unbounded => None,
        };
        if let Some(stop) = stop {
            if stop < start {
                return Err(QueryError::Argument(format!(
                    "slice end {} precedes start {}",
                    stop, start
                )));
            }
        }

        if self.result.is_some() && self.window_covers(start, stop) {
            metrics::record_cache(true);
            let rows = self.result.as_ref().map(|r| r.rows.as_slice()).unwrap_or(&[]);
            let offset = start - self.state.start;
            let end = stop.map_or(rows.len(), |s| (s - self.state.start).min(rows.len()));
            return Ok(rows.get(offset..end).map(<[Row<M>]>::to_vec).unwrap_or_default());
        }

        self.set_window(start, stop);
        Ok(self.ensure_evaluated().await?.rows.clone())
    }

    /// Fetch one document by identifier.
    ///
    /// The identifier comes from `pk`, or else from a `pk`/`id` filter.
    pub async fn get(&mut self, pk: Option<Value>) -> Result<Row<M>> {
        let pk = pk
            .filter(|v| !v.is_null())
            .or_else(|| {
                ["pk", "id"]
                    .iter()
                    .find_map(|key| self.state.filters.get(*key))
                    .map(|v| v.to_json())
            })
            .ok_or_else(|| {
                QueryError::Argument("get() needs a 'pk' or 'id' (argument or filter)".into())
            })?;
        let id = id_to_string(&pk);

        let fetched = {
            let _timer = LatencyTimer::new("get");
            self.transport.get(&self.descriptor.index, &id).await
        };
        let source = match fetched {
            Ok(Some(source)) => source,
            Ok(None) => {
                metrics::record_request("get", "not_found");
                return Err(QueryError::NotFound {
                    index: self.descriptor.index.clone(),
                    id,
                });
            }
            Err(e) => {
                metrics::record_request("get", "error");
                return Err(e.into());
            }
        };
        metrics::record_request("get", "success");
        debug!(index = %self.descriptor.index, id = %id, "Fetched document");
        self.to_row(source)
    }

    fn cached_row(&self, index: usize) -> Option<Row<M>> {
        let result = self.result.as_ref()?;
        let offset = index.checked_sub(self.state.start)?;
        result.rows.get(offset).cloned()
    }

    /// Whether `[start, stop)` lies inside the current window.
    fn window_covers(&self, start: usize, stop: Option<usize>) -> bool {
        if start < self.state.start {
            return false;
        }
        match (self.state.stop, stop) {
            (None, None) => start == self.state.start,
            (Some(cached), Some(requested)) => requested <= cached,
            (None, Some(_)) | (Some(_), None) => false,
        }
    }

    fn set_window(&mut self, start: usize, stop: Option<usize>) {
        debug!(index = %self.descriptor.index, start, stop = ?stop, "Window changed");
        self.state.start = start;
        self.state.stop = stop;
        self.invalidate();
    }
}

impl<M: Clone + std::fmt::Debug> Queryset<M> {
    /// Render the first rows for display, truncating past the configured size.
    ///
    /// Runs on a copy so the cursor's window and cache are untouched.
    pub async fn preview(&self) -> Result<String> {
        let limit = self.config.repr_output_size;
        let mut copy = self.clone();
        let rows = copy.slice(0..limit + 1).await?;

        let mut rendered: Vec<String> = rows
            .iter()
            .take(limit)
            .map(|row| match row {
                Row::Document(doc) => doc.to_string(),
                Row::Object(obj) => format!("{:?}", obj),
            })
            .collect();
        if rows.len() > limit {
            rendered.push(TRUNCATION_MARKER.to_string());
        }
        Ok(format!("[{}]", rendered.join(", ")))
    }
}

fn compile_error_kind(error: &QueryError) -> &'static str {
    match error {
        QueryError::UnsupportedLookup { .. } => "unsupported_lookup",
        QueryError::Argument(_) => "argument",
        _ => "other",
    }
}

fn past_end(bound: &str) -> QueryError {
    QueryError::Argument(format!("slice {} is past the last addressable position", bound))
}
