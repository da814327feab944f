//! The per-request annotation map shared between a request and its response.
//!
//! `Meta` is a cheaply cloneable handle: cloning aliases the same underlying
//! map, which is how a response "inherits" its request's meta and how a
//! middleware running after the downloader observes writes made before it.
//! A single task owns the map at any point of a request's lifecycle, so the
//! inner mutex is never contended for long.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Meta keys forming the stable contract between the built-in middlewares.
pub mod keys {
    /// Retry count, written by the retry middleware.
    pub const RETRY: &str = "retry";
    /// BFS depth, written by the depth middleware.
    pub const DEPTH: &str = "depth";
    /// Route the request through the headless-browser bridge.
    pub const PHANTOMJS: &str = "phantomjs";
    /// Request kind marker; see [`FILE_TYPE`].
    pub const TYPE: &str = "__type__";
    /// Destination path for file-type requests.
    pub const FILEPATH: &str = "__filepath__";
    /// `TYPE` value marking a static-file download request.
    pub const FILE_TYPE: &str = "file";
}

/// A dynamically typed meta value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetaValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Bytes(Vec<u8>),
    Path(PathBuf),
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Str(v.to_owned())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Str(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl From<Vec<u8>> for MetaValue {
    fn from(v: Vec<u8>) -> Self {
        MetaValue::Bytes(v)
    }
}

impl From<PathBuf> for MetaValue {
    fn from(v: PathBuf) -> Self {
        MetaValue::Path(v)
    }
}

/// String-keyed map of [`MetaValue`]s with aliasing clone semantics.
#[derive(Clone, Default)]
pub struct Meta {
    inner: Arc<Mutex<HashMap<String, MetaValue>>>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<MetaValue>) {
        self.inner.lock().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<MetaValue> {
        self.inner.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(MetaValue::Str(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(MetaValue::Int(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(MetaValue::Bool(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        match self.get(key) {
            Some(MetaValue::Path(v)) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.lock().fmt(f)
    }
}

impl Serialize for Meta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.lock().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Meta {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = HashMap::<String, MetaValue>::deserialize(deserializer)?;
        Ok(Meta {
            inner: Arc::new(Mutex::new(map)),
        })
    }
}
