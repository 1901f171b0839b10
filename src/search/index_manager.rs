// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Index descriptors.
//!
//! Describes what the query compiler needs to know about an index: its name,
//! the mapping type of each top-level property, which fields free-text
//! queries search, and the fallback ordering.
//!
//! ```text
//! IndexDescriptor "test_app-testmodel"
//!   properties:
//!     first_name   text
//!     last_name    text
//!     id           integer
//!     groups       nested
//!     date_joined  date
//!   search fields: first_name, last_name, username
//!   ordering:      id
//! ```
//!
//! Mapping management (creating the index, putting the mapping) belongs to
//! whoever owns the index; descriptors only mirror it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Map, Value};

/// Mapping type of an index property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Analyzed full-text field, matched with `match`
    Text,
    /// Exact-value string, matched with `term`
    Keyword,
    /// Integer/long
    Integer,
    /// Floating point
    Float,
    /// Boolean
    Boolean,
    /// Date/time
    Date,
    /// Plain sub-object (dotted paths, no scoping)
    Object,
    /// Array of sub-documents queried with a scoped `nested` query
    Nested,
    /// Completion suggester field
    Completion,
}

impl FieldType {
    /// Mapping type name as used by the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Keyword => "keyword",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Object => "object",
            FieldType::Nested => "nested",
            FieldType::Completion => "completion",
        }
    }

    /// Parse a backend mapping type name
    pub fn from_mapping(name: &str) -> Option<Self> {
        match name {
            "text" | "string" => Some(FieldType::Text),
            "keyword" => Some(FieldType::Keyword),
            "integer" | "long" | "short" | "byte" => Some(FieldType::Integer),
            "float" | "double" | "half_float" | "scaled_float" => Some(FieldType::Float),
            "boolean" => Some(FieldType::Boolean),
            "date" => Some(FieldType::Date),
            "object" => Some(FieldType::Object),
            "nested" => Some(FieldType::Nested),
            "completion" => Some(FieldType::Completion),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index descriptor for one model
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDescriptor {
    /// Index name
    pub index: String,
    /// Top-level property types
    pub properties: HashMap<String, FieldType>,
    /// Fields searched by free-text queries
    pub search_fields: Vec<String>,
    /// Ordering applied when the cursor has none (`-field` for descending)
    pub ordering: Option<Vec<String>>,
}

impl IndexDescriptor {
    /// Create a descriptor with no properties
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            properties: HashMap::new(),
            search_fields: Vec::new(),
            ordering: None,
        }
    }

    /// Declare a property with an explicit type
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.properties.insert(name.into(), field_type);
        self
    }

    /// Declare a text property
    pub fn text(self, name: impl Into<String>) -> Self {
        self.field(name, FieldType::Text)
    }

    /// Declare a text property that free-text queries search
    pub fn text_searchable(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.search_fields.push(name.clone());
        self.field(name, FieldType::Text)
    }

    /// Declare a keyword property
    pub fn keyword(self, name: impl Into<String>) -> Self {
        self.field(name, FieldType::Keyword)
    }

    /// Declare an integer property
    pub fn integer(self, name: impl Into<String>) -> Self {
        self.field(name, FieldType::Integer)
    }

    /// Declare a date property
    pub fn date(self, name: impl Into<String>) -> Self {
        self.field(name, FieldType::Date)
    }

    /// Declare an object property
    pub fn object(self, name: impl Into<String>) -> Self {
        self.field(name, FieldType::Object)
    }

    /// Declare a nested property
    pub fn nested(self, name: impl Into<String>) -> Self {
        self.field(name, FieldType::Nested)
    }

    /// Add a free-text search field without declaring its type
    pub fn search_field(mut self, name: impl Into<String>) -> Self {
        self.search_fields.push(name.into());
        self
    }

    /// Set the fallback ordering
    pub fn ordering<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ordering = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Type of a top-level property
    pub fn field_type(&self, field: &str) -> Option<FieldType> {
        self.properties.get(field).copied()
    }

    /// Whether the top-level property is declared `nested`
    pub fn is_nested(&self, field: &str) -> bool {
        self.field_type(field) == Some(FieldType::Nested)
    }

    /// Whether the top-level property is an analyzed text field
    pub fn is_text(&self, field: &str) -> bool {
        self.field_type(field) == Some(FieldType::Text)
    }

    /// Fields used by free-text queries.
    ///
    /// Falls back to every text property when none were declared explicitly.
    pub fn get_search_fields(&self) -> Vec<String> {
        if !self.search_fields.is_empty() {
            return self.search_fields.clone();
        }
        let mut fields: Vec<String> = self
            .properties
            .iter()
            .filter(|(_, t)| **t == FieldType::Text)
            .map(|(name, _)| name.clone())
            .collect();
        fields.sort();
        fields
    }

    /// Build a descriptor from a backend mapping (`{"properties": {...}}`).
    ///
    /// Unknown property types are skipped.
    pub fn from_mapping(index: impl Into<String>, mapping: &Value) -> Self {
        let mut descriptor = Self::new(index);
        if let Some(properties) = mapping.get("properties").and_then(Value::as_object) {
            for (name, prop) in properties {
                let type_name = prop
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or(if prop.get("properties").is_some() { "object" } else { "" });
                if let Some(field_type) = FieldType::from_mapping(type_name) {
                    descriptor.properties.insert(name.clone(), field_type);
                }
            }
        }
        descriptor
    }

    /// Render the properties as a backend mapping
    pub fn to_mapping(&self) -> Value {
        let mut names: Vec<&String> = self.properties.keys().collect();
        names.sort();
        let mut properties = Map::new();
        for name in names {
            properties.insert(name.clone(), json!({ "type": self.properties[name].as_str() }));
        }
        json!({ "properties": properties })
    }
}

/// Registry of index descriptors keyed by model name
#[derive(Debug, Default)]
pub struct IndexRegistry {
    descriptors: RwLock<HashMap<String, Arc<IndexDescriptor>>>,
}

impl IndexRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the descriptor of a model
    pub fn register(&self, model: impl Into<String>, descriptor: IndexDescriptor) -> Arc<IndexDescriptor> {
        let descriptor = Arc::new(descriptor);
        self.descriptors.write().insert(model.into(), descriptor.clone());
        descriptor
    }

    /// Descriptor registered for a model
    pub fn get(&self, model: &str) -> Option<Arc<IndexDescriptor>> {
        self.descriptors.read().get(model).cloned()
    }

    /// Drop a model's descriptor
    pub fn unregister(&self, model: &str) -> Option<Arc<IndexDescriptor>> {
        self.descriptors.write().remove(model)
    }

    /// Registered model names, sorted
    pub fn models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.descriptors.read().keys().cloned().collect();
        models.sort();
        models
    }
}
