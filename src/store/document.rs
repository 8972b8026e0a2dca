use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A loosely-typed document as delivered by the store.
///
/// Field names and shapes are whatever the writer chose; typed entities are
/// produced from documents by the normalizers in [`crate::entity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Build a document from a JSON object. Non-object values yield an empty
    /// field map.
    pub fn from_value(id: impl Into<String>, value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// First present, non-null field among `names`.
    pub fn first_of<'a>(&'a self, names: &[&'a str]) -> Option<(&'a str, &'a Value)> {
        names.iter().find_map(|name| match self.fields.get(*name) {
            Some(Value::Null) | None => None,
            Some(value) => Some((*name, value)),
        })
    }

    /// Shallow merge: each field in `partial` replaces the existing one.
    pub fn merge(&mut self, partial: &Map<String, Value>) {
        for (key, value) in partial {
            self.fields.insert(key.clone(), value.clone());
        }
    }
}
