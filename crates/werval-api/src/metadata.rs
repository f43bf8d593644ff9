//! Request-scoped metadata used for inter-filter communication

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::Result;

/// Free-form key/value scratch space of one request
///
/// Entries written by an upstream filter before delegating are visible to every
/// downstream filter and to the controller. Each request gets its own
/// `MetaData`, clones share the same entries.
///
/// # Examples
///
/// ```rust
/// use werval_api::MetaData;
/// use serde_json::json;
///
/// let meta = MetaData::new();
/// meta.put("claims", &json!({"sub": "alice", "admin": true})).unwrap();
///
/// let downstream = meta.clone();
/// let sub: Option<String> = downstream.get_as("claims").unwrap().map(|c: serde_json::Value| {
///     c["sub"].as_str().unwrap().to_string()
/// });
/// assert_eq!(sub.as_deref(), Some("alice"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetaData {
    entries: Arc<RwLock<Map<String, Value>>>,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a serializable value
    pub fn put<T: Serialize + ?Sized>(&self, key: impl Into<String>, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.put_value(key, value);
        Ok(())
    }

    /// Store a raw JSON value
    pub fn put_value(&self, key: impl Into<String>, value: Value) {
        self.entries.write().insert(key.into(), value);
    }

    /// Raw JSON value
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    /// Value deserialized as `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Boolean entry, `None` when missing or not a boolean
    pub fn bool(&self, key: &str) -> Option<bool> {
        self.entries.read().get(key).and_then(Value::as_bool)
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.write().remove(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
