//! A URL task flowing through the engine.

use serde::{Deserialize, Serialize};

use crate::meta::{keys, Meta, MetaValue};

/// Name of the parser a freshly created request is routed to.
pub const DEFAULT_PARSER: &str = "parser";

/// A unit of crawl work: a URL, the parser its response is routed to, and
/// the meta map carrying cross-middleware annotations.
///
/// Cloning a request aliases its meta map, so a retried request keeps the
/// retry count accumulated so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub url: String,
    pub parser_name: String,
    pub meta: Meta,
}

impl Request {
    pub fn new(url: impl Into<String>) -> Self {
        Request {
            url: url.into(),
            parser_name: DEFAULT_PARSER.to_owned(),
            meta: Meta::new(),
        }
    }

    /// Routes the response of this request to a named parser.
    pub fn with_parser(mut self, name: impl Into<String>) -> Self {
        self.parser_name = name.into();
        self
    }

    pub fn with_meta(self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.meta.set(key, value);
        self
    }

    /// True for static-file download requests emitted by the file pipeline.
    pub fn is_file(&self) -> bool {
        self.meta.get_str(keys::TYPE).as_deref() == Some(keys::FILE_TYPE)
    }
}
