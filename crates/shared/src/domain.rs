use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TruckId(pub String);

impl TruckId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TruckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TruckId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A truck as published by the feed. Only `id` is interpreted; every other
/// field is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Truck {
    pub id: TruckId,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Truck {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: TruckId::new(id),
            attributes: Map::new(),
        }
    }

    /// Adds or replaces an attribute. An `id` key is ignored; the id is
    /// fixed at construction and serialized from the `id` field only.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "id" {
            self.attributes.insert(key, value.into());
        }
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}
