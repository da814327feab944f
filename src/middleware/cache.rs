//! Deduplicates URLs across the crawl.
//!
//! The set is only updated after a download made it through the response
//! chain, so a failed download does not poison the cache for a retry.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use super::{DownloadMiddleware, MiddlewareAction, OpenClose};
use crate::request::Request;
use crate::response::Response;
use crate::spider::Spider;

#[derive(Default)]
pub struct CacheMiddleware {
    seen: RwLock<HashSet<String>>,
}

impl CacheMiddleware {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OpenClose for CacheMiddleware {}

#[async_trait]
impl DownloadMiddleware for CacheMiddleware {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn process_request(&self, req: &mut Request, spider: &Spider) -> MiddlewareAction {
        trace!(spider = %spider.name, "Test whether {} is cached", req.url);
        if self.seen.read().contains(&req.url) {
            MiddlewareAction::drop_task("URL already parsed")
        } else {
            MiddlewareAction::Continue
        }
    }

    async fn process_response(
        &self,
        _res: &mut Response,
        req: &mut Request,
        spider: &Spider,
    ) -> MiddlewareAction {
        trace!(spider = %spider.name, "Add {} to cache", req.url);
        self.seen.write().insert(req.url.clone());
        MiddlewareAction::Continue
    }
}
