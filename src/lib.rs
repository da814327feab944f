//! # leio
//!
//! A concurrent web-crawl engine patterned after the Scrapy pipeline
//! architecture: requests travel through an ordered download-middleware
//! chain, the downloader, a spider-middleware chain and a named parser;
//! items emitted along the way traverse an item-pipeline chain in their
//! own units of work. The engine bounds concurrency with a gate, detects
//! drain over a self-expanding work set, and shuts down gracefully on
//! user interrupt.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use leio::prelude::*;
//!
//! struct LinkParser;
//!
//! #[async_trait]
//! impl Parser for LinkParser {
//!     async fn parse(
//!         &self,
//!         res: Response,
//!         _req: Request,
//!         _spider: Arc<Spider>,
//!         yielder: Arc<dyn Yield>,
//!     ) -> Result<(), CrawlError> {
//!         for href in extract_links(&res.text()) {
//!             yielder.yield_request(Request::new(href), Some(&res)).await;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! async fn crawl() -> Result<(), CrawlError> {
//!     let engine = EngineBuilder::with_defaults(CrawlConfig::default())
//!         .add_parser("parser", LinkParser)
//!         .build()?;
//!     let spider = Spider::new("quotes")
//!         .start_url("http://quotes.toscrape.com/")
//!         .allow_domain("toscrape.com");
//!     engine.run(spider).await
//! }
//! ```

pub mod config;
pub mod counter;
pub mod downloader;
pub mod engine;
pub mod error;
pub mod interrupt;
pub mod item;
pub mod meta;
pub mod middleware;
pub mod parser;
pub mod pipeline;
pub mod prelude;
pub mod request;
pub mod response;
pub mod spider;
pub mod status;
pub mod writer;

pub use config::CrawlConfig;
pub use counter::InFlight;
pub use downloader::{BrowserBridge, Downloader, HttpDownloader, PhantomBridge};
pub use engine::{Engine, EngineBuilder, Yield, Yielder};
pub use error::{CrawlError, ResponseError};
pub use interrupt::InterruptWatch;
pub use item::Item;
pub use meta::{Meta, MetaValue};
pub use middleware::{
    CacheMiddleware, DelayMiddleware, DepthMiddleware, DownloadMiddleware, HttpErrorMiddleware,
    MiddlewareAction, OffsiteMiddleware, OpenClose, RetryMiddleware, SpiderMiddleware,
};
pub use parser::{FnParser, Parser};
pub use pipeline::{FilePipeline, ItemPipeline};
pub use request::Request;
pub use response::Response;
pub use spider::Spider;
pub use status::StatusInfo;
pub use writer::{FileWriter, FsWriter};

#[cfg(feature = "redis-store")]
pub use writer::RedisWriter;

pub use async_trait::async_trait;
pub use tokio;
