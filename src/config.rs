// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for querysets.
//!
//! Settings are resolved once, when a [`crate::Queryset`] is constructed.
//! Chained clones carry the resolved values; nothing is looked up per call.
//!
//! # Example
//!
//! ```
//! use es_queryset::{Fuzziness, QuerysetConfig};
//!
//! // Defaults
//! let config = QuerysetConfig::default();
//! assert_eq!(config.fuzziness, Fuzziness::Auto);
//! assert!(config.global_facets);
//!
//! // From JSON settings
//! let config: QuerysetConfig = serde_json::from_str(r#"{"fuzziness": 1}"#).unwrap();
//! assert_eq!(config.fuzziness, Fuzziness::Edits(1));
//! ```

use serde::Deserialize;
use serde_json::Value;

/// Fuzziness of free-text `multi_match` queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "Value")]
pub enum Fuzziness {
    /// Let the backend pick the edit distance from the term length
    #[default]
    Auto,
    /// Fixed maximum edit distance
    Edits(u8),
}

impl Fuzziness {
    /// JSON form used in the query body
    pub fn to_json(self) -> Value {
        match self {
            Fuzziness::Auto => Value::String("AUTO".to_string()),
            Fuzziness::Edits(n) => Value::from(n),
        }
    }
}

impl TryFrom<Value> for Fuzziness {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match &value {
            Value::String(s) if s.eq_ignore_ascii_case("auto") => Ok(Fuzziness::Auto),
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .map(Fuzziness::Edits)
                .ok_or_else(|| format!("invalid fuzziness {}", value)),
            _ => Err(format!("invalid fuzziness {}", value)),
        }
    }
}

/// Queryset configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QuerysetConfig {
    /// Process-wide fuzziness default for free-text queries
    #[serde(default)]
    pub fuzziness: Fuzziness,

    /// Ordering override; takes precedence over the descriptor's ordering
    #[serde(default)]
    pub ordering: Option<Vec<String>>,

    /// Whether `facet()` counts over the whole index by default
    #[serde(default = "default_global_facets")]
    pub global_facets: bool,

    /// Name of the wrapping `global` aggregation
    #[serde(default = "default_global_facets_name")]
    pub global_facets_name: String,

    /// More-like-this fields when the caller names none
    #[serde(default = "default_mlt_fields")]
    pub mlt_default_fields: Vec<String>,

    /// More-like-this minimum term frequency
    #[serde(default = "default_mlt_min_term_frequency")]
    pub mlt_min_term_frequency: u32,

    /// More-like-this maximum term frequency
    #[serde(default = "default_mlt_max_term_frequency")]
    pub mlt_max_term_frequency: u32,

    /// Rows rendered by `preview()` before truncating
    #[serde(default = "default_repr_output_size")]
    pub repr_output_size: usize,
}

fn default_global_facets() -> bool { true }
fn default_global_facets_name() -> String { "global_count".to_string() }
fn default_mlt_fields() -> Vec<String> { vec!["_all".to_string()] }
fn default_mlt_min_term_frequency() -> u32 { 1 }
fn default_mlt_max_term_frequency() -> u32 { 10 }
fn default_repr_output_size() -> usize { 20 }

impl Default for QuerysetConfig {
    fn default() -> Self {
        Self {
            fuzziness: Fuzziness::default(),
            ordering: None,
            global_facets: default_global_facets(),
            global_facets_name: default_global_facets_name(),
            mlt_default_fields: default_mlt_fields(),
            mlt_min_term_frequency: default_mlt_min_term_frequency(),
            mlt_max_term_frequency: default_mlt_max_term_frequency(),
            repr_output_size: default_repr_output_size(),
        }
    }
}
