//! User records produced by parsers and consumed by item pipelines.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An untyped record: the pipeline chain assigns meaning to its keys.
///
/// The file pipeline, for instance, recognizes `fileurls`, `filepath` and
/// `exts`. Everything else is opaque to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Item {
    pub data: Map<String, Value>,
}

impl Item {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key)?.as_str()
    }

    /// The value under `key` as a sequence of strings, if it is an array.
    /// Non-string elements are skipped.
    pub fn str_seq(&self, key: &str) -> Option<Vec<String>> {
        let seq = self.data.get(key)?.as_array()?;
        Some(
            seq.iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
        )
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.data) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("{}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_seq_skips_non_strings() {
        let item = Item::new().with("fileurls", vec!["http://a/x.jpg", "http://a/y.png"]);
        assert_eq!(
            item.str_seq("fileurls").unwrap(),
            vec!["http://a/x.jpg", "http://a/y.png"]
        );
        assert!(item.str_seq("missing").is_none());

        let mixed = Item::new().with("exts", serde_json::json!([".jpg", 7]));
        assert_eq!(mixed.str_seq("exts").unwrap(), vec![".jpg"]);
    }

    #[test]
    fn displays_as_json() {
        let item = Item::new().with("title", "quotes");
        assert_eq!(item.to_string(), r#"{"title":"quotes"}"#);
    }
}
