// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Document serializers.
//!
//! Converts between domain objects and the JSON documents stored in the
//! index. Querysets only call [`DocumentSerializer::from_document`] when
//! `deserialize()` was requested; otherwise rows stay raw JSON.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Converts domain objects to and from index documents.
pub trait DocumentSerializer<M>: Send + Sync {
    /// Domain object → document
    fn to_document(&self, instance: &M) -> Result<Value, serde_json::Error>;

    /// Document → domain object
    fn from_document(&self, document: &Value) -> Result<M, serde_json::Error>;

    /// Identifier of a domain object, used for membership tests.
    fn identifier(&self, instance: &M) -> Option<Value> {
        self.to_document(instance).ok().and_then(|doc| doc.get("id").cloned())
    }
}

/// Serializer for any `serde` type.
pub struct SerdeSerializer<M> {
    _marker: PhantomData<fn() -> M>,
}

impl<M> SerdeSerializer<M> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<M> Default for SerdeSerializer<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> DocumentSerializer<M> for SerdeSerializer<M>
where
    M: Serialize + DeserializeOwned,
{
    fn to_document(&self, instance: &M) -> Result<Value, serde_json::Error> {
        serde_json::to_value(instance)
    }

    fn from_document(&self, document: &Value) -> Result<M, serde_json::Error> {
        serde_json::from_value(document.clone())
    }
}

/// Pass-through serializer for querysets over raw JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl DocumentSerializer<Value> for JsonSerializer {
    fn to_document(&self, instance: &Value) -> Result<Value, serde_json::Error> {
        Ok(instance.clone())
    }

    fn from_document(&self, document: &Value) -> Result<Value, serde_json::Error> {
        Ok(document.clone())
    }

    fn identifier(&self, instance: &Value) -> Option<Value> {
        instance.get("id").cloned()
    }
}
