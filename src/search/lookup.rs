// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Lookup Parser
//!
//! Splits a filter key such as `"groups__value__gte"` into a dotted field
//! path and a comparison operator.
//!
//! # Lookup Syntax
//!
//! ```text
//! last_name                 - field "last_name", operator must
//! id__gt                    - field "id", operator gt
//! date_joined_exp__iso      - field "date_joined_exp.iso", operator must
//! groups__value__must_not   - field "groups.value", operator must_not
//! email__isnull             - field "email", operator isnull (deprecated)
//! ```
//!
//! Only the trailing segment can be an operator. An unknown trailing segment
//! is folded into the field path, so `name__contians` targets `name.contians`.

use std::fmt;

use tracing::warn;

/// Separator between lookup segments.
pub const LOOKUP_SEPARATOR: &str = "__";

/// Comparison operator of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equality / containment (default)
    Must,
    /// Negated equality
    MustNot,
    /// Optional match, boosts scoring
    Should,
    /// Inclusive `(lower, upper)` range
    Range,
    /// Strictly greater than
    Gt,
    /// Strictly lower than
    Lt,
    /// Greater than or equal
    Gte,
    /// Lower than or equal
    Lte,
    /// Field is present
    Exists,
    /// Field is absent (deprecated alias of `exists` with inverted meaning)
    IsNull,
}

impl Operator {
    /// Every recognized operator, in vocabulary order.
    pub const ALL: [Operator; 10] = [
        Operator::Must,
        Operator::MustNot,
        Operator::Should,
        Operator::Range,
        Operator::Gt,
        Operator::Lt,
        Operator::Gte,
        Operator::Lte,
        Operator::Exists,
        Operator::IsNull,
    ];

    /// Resolve an operator from its lookup name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "must" => Some(Self::Must),
            "must_not" => Some(Self::MustNot),
            "should" => Some(Self::Should),
            "range" => Some(Self::Range),
            "gt" => Some(Self::Gt),
            "lt" => Some(Self::Lt),
            "gte" => Some(Self::Gte),
            "lte" => Some(Self::Lte),
            "exists" => Some(Self::Exists),
            "isnull" => Some(Self::IsNull),
            _ => None,
        }
    }

    /// Lookup name of the operator.
    pub fn name(self) -> &'static str {
        match self {
            Self::Must => "must",
            Self::MustNot => "must_not",
            Self::Should => "should",
            Self::Range => "range",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Exists => "exists",
            Self::IsNull => "isnull",
        }
    }

    /// Whether this is a single-bound comparison (`gt`, `gte`, `lt`, `lte`).
    pub fn is_bound(self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }

    /// The complementary single-bound comparison.
    pub fn inverse_bound(self) -> Option<Self> {
        match self {
            Self::Gt => Some(Self::Lte),
            Self::Gte => Some(Self::Lt),
            Self::Lt => Some(Self::Gte),
            Self::Lte => Some(Self::Gt),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed lookup: dotted field path plus operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Dotted field path (e.g. `groups.value`)
    pub field: String,
    /// Comparison operator
    pub operator: Operator,
}

impl Lookup {
    /// Parse a lookup key. Never fails.
    pub fn parse(lookup: &str) -> Self {
        let words: Vec<&str> = lookup.split(LOOKUP_SEPARATOR).collect();

        let field = words
            .iter()
            .filter(|word| Operator::from_name(word).is_none())
            .copied()
            .collect::<Vec<_>>()
            .join(".");

        let operator = words
            .last()
            .and_then(|word| Operator::from_name(word))
            .unwrap_or(Operator::Must);

        if operator == Operator::IsNull {
            warn!(
                lookup = %lookup,
                "isnull is not an Elasticsearch lookup and may be dropped in the future, use exists instead"
            );
        }

        Self { field, operator }
    }

    /// Top-level segment of the field path (the mapping property).
    pub fn root_field(&self) -> &str {
        self.field.split('.').next().unwrap_or(&self.field)
    }

    /// Render back to a lookup key, omitting the operator for `must`.
    pub fn to_key(&self) -> String {
        match self.operator {
            Operator::Must => self.field.clone(),
            op => format!("{}{}{}", self.field, LOOKUP_SEPARATOR, op),
        }
    }

    /// Render with an explicit operator suffix.
    pub fn key_with(&self, operator: Operator) -> String {
        format!("{}{}{}", self.field, LOOKUP_SEPARATOR, operator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_field_defaults_to_must() {
        let lookup = Lookup::parse("last_name");
        assert_eq!(lookup.field, "last_name");
        assert_eq!(lookup.operator, Operator::Must);
    }

    #[test]
    fn test_trailing_operator() {
        let lookup = Lookup::parse("id__gte");
        assert_eq!(lookup.field, "id");
        assert_eq!(lookup.operator, Operator::Gte);
    }

    #[test]
    fn test_sub_field_path() {
        let lookup = Lookup::parse("date_joined_exp__iso");
        assert_eq!(lookup.field, "date_joined_exp.iso");
        assert_eq!(lookup.operator, Operator::Must);

        let lookup = Lookup::parse("date_joined_exp__iso__isnull");
        assert_eq!(lookup.field, "date_joined_exp.iso");
        assert_eq!(lookup.operator, Operator::IsNull);
    }

    #[test]
    fn test_unknown_operator_folds_into_path() {
        let lookup = Lookup::parse("username__contains");
        assert_eq!(lookup.field, "username.contains");
        assert_eq!(lookup.operator, Operator::Must);
    }

    #[test]
    fn test_operator_words_inside_path_are_dropped() {
        // Operator names are never kept as path segments
        let lookup = Lookup::parse("a__gt__b");
        assert_eq!(lookup.field, "a.b");
        assert_eq!(lookup.operator, Operator::Must);
    }

    #[test]
    fn test_root_field() {
        let lookup = Lookup::parse("groups__value");
        assert_eq!(lookup.root_field(), "groups");
    }

    #[test]
    fn test_to_key() {
        assert_eq!(Lookup::parse("name").to_key(), "name");
        assert_eq!(Lookup::parse("id__lt").to_key(), "id__lt");
        assert_eq!(Lookup::parse("groups__value").key_with(Operator::MustNot), "groups.value__must_not");
    }

    #[test]
    fn test_vocabulary_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_name(op.name()), Some(op));
        }
        assert_eq!(Operator::from_name("contains"), None);
    }

    #[test]
    fn test_inverse_bound() {
        assert_eq!(Operator::Gt.inverse_bound(), Some(Operator::Lte));
        assert_eq!(Operator::Gte.inverse_bound(), Some(Operator::Lt));
        assert_eq!(Operator::Lt.inverse_bound(), Some(Operator::Gte));
        assert_eq!(Operator::Lte.inverse_bound(), Some(Operator::Gt));
        assert_eq!(Operator::Range.inverse_bound(), None);
    }
}
