//! Ordered processors for items emitted by parsers.

mod files;

pub use files::FilePipeline;

use async_trait::async_trait;
use tracing::error;

use crate::middleware::{MiddlewareAction, OpenClose};
use crate::error::CrawlError;
use crate::item::Item;
use crate::spider::Spider;

/// One step of the item pipeline chain.
///
/// Each emitted item traverses the registered pipelines in order, in its
/// own unit of work, concurrently with request processing.
#[async_trait]
pub trait ItemPipeline: OpenClose {
    fn name(&self) -> &'static str;

    async fn handle_err(&self, err: &CrawlError, spider: &Spider) {
        error!(spider = %spider.name, pipeline = self.name(), "{err}");
    }

    async fn process(&self, item: &mut Item, spider: &Spider) -> MiddlewareAction;
}
