//! The capability through which components emit new work.

use std::sync::Weak;

use async_trait::async_trait;

use super::core::EngineCore;
use crate::item::Item;
use crate::request::Request;
use crate::response::Response;

/// Lets middlewares, pipelines and parsers hand new work to the engine
/// without owning it.
///
/// Components receive the capability by constructor injection and never
/// touch the queue directly. Implement it with a recorder to unit-test a
/// component in isolation.
#[async_trait]
pub trait Yield: Send + Sync {
    /// Queues a new request. `parent` is the response that produced it;
    /// start URLs and engine-internal re-yields pass `None`, which skips
    /// the spider chain's admission hooks.
    async fn yield_request(&self, req: Request, parent: Option<&Response>);

    /// Hands an item to the pipeline chain in its own unit of work.
    async fn yield_item(&self, item: Item);
}

/// The engine-backed [`Yield`] implementation.
///
/// Holds a non-owning handle; once the engine is gone, emissions become
/// no-ops instead of keeping a finished crawl alive.
#[derive(Clone)]
pub struct Yielder {
    pub(crate) core: Weak<EngineCore>,
}

#[async_trait]
impl Yield for Yielder {
    async fn yield_request(&self, req: Request, parent: Option<&Response>) {
        if let Some(core) = self.core.upgrade() {
            core.yield_request(req, parent).await;
        }
    }

    async fn yield_item(&self, item: Item) {
        if let Some(core) = self.core.upgrade() {
            core.yield_item(item).await;
        }
    }
}
