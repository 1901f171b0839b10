// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Filter operands.
//!
//! A lookup's right-hand side is one of a handful of shapes, resolved
//! explicitly by the compiler rather than by inspecting runtime types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Right-hand side of a filter lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Plain JSON scalar (string, number, bool, null)
    Scalar(Value),
    /// Point in time, rendered as RFC 3339 before comparison
    DateTime(DateTime<Utc>),
    /// Reference to a related entity, compared by identifier
    Entity(EntityRef),
    /// Inclusive `(lower, upper)` pair for `range` lookups
    Range(Box<FilterValue>, Box<FilterValue>),
}

/// Reference to a related entity stored as a nested sub-document.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRef {
    /// Identifier of the referenced entity
    pub id: Value,
}

/// Render a JSON id (string or number) as a document id.
pub fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl FilterValue {
    /// Build an entity reference operand.
    pub fn entity(id: impl Into<Value>) -> Self {
        Self::Entity(EntityRef { id: id.into() })
    }

    /// Build a `(lower, upper)` range operand.
    pub fn range(lower: impl Into<FilterValue>, upper: impl Into<FilterValue>) -> Self {
        Self::Range(Box::new(lower.into()), Box::new(upper.into()))
    }

    /// Boolean reading of the operand, for `exists`/`isnull`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Scalar(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Bounds of a range operand.
    pub fn as_range(&self) -> Option<(&FilterValue, &FilterValue)> {
        match self {
            Self::Range(lower, upper) => Some((lower, upper)),
            _ => None,
        }
    }

    /// JSON form sent to the backend.
    ///
    /// Entity references collapse to their identifier; ranges render as a
    /// two-element array.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(v) => v.clone(),
            Self::DateTime(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Entity(entity) => entity.id.clone(),
            Self::Range(lower, upper) => Value::Array(vec![lower.to_json(), upper.to_json()]),
        }
    }
}

impl From<Value> for FilterValue {
    fn from(v: Value) -> Self {
        Self::Scalar(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::Scalar(Value::String(v.to_string()))
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::Scalar(Value::String(v))
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Scalar(Value::Bool(v))
    }
}

macro_rules! impl_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FilterValue {
                fn from(v: $t) -> Self {
                    Self::Scalar(Value::from(v))
                }
            }
        )*
    };
}

impl_from_number!(i32, i64, u32, u64, usize, f64);

impl From<DateTime<Utc>> for FilterValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}

impl From<NaiveDateTime> for FilterValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v.and_utc())
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(v: NaiveDate) -> Self {
        Self::Scalar(Value::String(v.format("%Y-%m-%d").to_string()))
    }
}

impl From<EntityRef> for FilterValue {
    fn from(v: EntityRef) -> Self {
        Self::Entity(v)
    }
}

impl<A, B> From<(A, B)> for FilterValue
where
    A: Into<FilterValue>,
    B: Into<FilterValue>,
{
    fn from((lower, upper): (A, B)) -> Self {
        Self::range(lower, upper)
    }
}
