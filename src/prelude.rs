//! A "prelude" for users of the `leio` crate.
//!
//! # Example
//!
//! ```
//! use leio::prelude::*;
//! ```

pub use crate::{
    config::CrawlConfig,
    downloader::Downloader,
    engine::{Engine, EngineBuilder, Yield, Yielder},
    error::{CrawlError, ResponseError},
    item::Item,
    meta::{keys as meta_keys, Meta, MetaValue},
    middleware::{DownloadMiddleware, MiddlewareAction, OpenClose, SpiderMiddleware},
    parser::{FnParser, Parser},
    pipeline::ItemPipeline,
    request::Request,
    response::Response,
    spider::Spider,
    status::StatusInfo,
    writer::FileWriter,
};

pub use async_trait::async_trait;
