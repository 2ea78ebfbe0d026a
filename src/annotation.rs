//! Annotation sink: opaque key → value-list metadata.
//!
//! Annotations attach to concept frames, slots, or the model itself and are
//! consumed opaquely by the core — no semantic interpretation. Values are
//! arbitrary JSON, so out-of-scope layers (serializers, ontology importers)
//! can round-trip whatever they need.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AccessError, KbResult};

/// Ordered key → value-list metadata map.
///
/// Keys keep insertion order; values under a key keep append order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    entries: Vec<(String, Vec<Value>)>,
}

impl Annotations {
    /// Create an empty annotation map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under a key, creating the key if absent.
    pub fn add(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some((_, values)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            values.push(value);
        } else {
            self.entries.push((key, vec![value]));
        }
    }

    /// Replace all values under a key.
    pub fn set(&mut self, key: impl Into<String>, values: Vec<Value>) {
        let key = key.into();
        if let Some((_, existing)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            *existing = values;
        } else {
            self.entries.push((key, values));
        }
    }

    /// All values under a key; empty slice if the key is absent.
    pub fn values(&self, key: &str) -> &[Value] {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    /// The single value under a key.
    ///
    /// Errors if the key is absent or carries more than one value.
    pub fn one_value(&self, key: &str) -> KbResult<&Value> {
        let values = self.values(key);
        match values {
            [] => Err(AccessError::NoSuchAnnotation { key: key.into() }.into()),
            [v] => Ok(v),
            _ => Err(AccessError::AnnotationMultiplicity {
                key: key.into(),
                found: values.len(),
            }
            .into()),
        }
    }

    /// All keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Whether the key is present (with at least one value).
    pub fn contains(&self, key: &str) -> bool {
        !self.values(key).is_empty()
    }

    /// Whether any annotations are present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
