//! Tracks BFS depth and cuts the crawl beyond a configured limit.

use async_trait::async_trait;
use tracing::debug;

use super::{MiddlewareAction, OpenClose, SpiderMiddleware};
use crate::error::CrawlError;
use crate::meta::keys;
use crate::request::Request;
use crate::response::Response;
use crate::spider::Spider;

pub struct DepthMiddleware {
    depth_limit: i64,
}

impl DepthMiddleware {
    /// A `depth_limit` of 0 disables the cut.
    pub fn new(depth_limit: i64) -> Self {
        DepthMiddleware { depth_limit }
    }
}

#[async_trait]
impl OpenClose for DepthMiddleware {
    async fn open(&self, spider: &Spider) -> Result<(), CrawlError> {
        debug!(spider = %spider.name, "Init success with depth_limit: {}", self.depth_limit);
        Ok(())
    }
}

#[async_trait]
impl SpiderMiddleware for DepthMiddleware {
    fn name(&self) -> &'static str {
        "depth"
    }

    /// Seeds depth 1 on responses that carry none (start URLs have no
    /// admission hook to set it).
    async fn process_response(
        &self,
        res: &mut Response,
        _req: &mut Request,
        _spider: &Spider,
    ) -> MiddlewareAction {
        if !res.meta.contains(keys::DEPTH) {
            res.meta.set(keys::DEPTH, 1i64);
        }
        MiddlewareAction::Continue
    }

    async fn process_new_request(
        &self,
        req: &mut Request,
        parent: &Response,
        spider: &Spider,
    ) -> MiddlewareAction {
        let depth = parent.meta.get_int(keys::DEPTH).unwrap_or(0) + 1;
        req.meta.set(keys::DEPTH, depth);
        debug!(spider = %spider.name, "Depth of {} is {}", req.url, depth);
        if self.depth_limit != 0 && depth > self.depth_limit {
            MiddlewareAction::Drop(format!("Depth beyond the max depth {}", self.depth_limit))
        } else {
            MiddlewareAction::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeds_depth_one_on_fresh_responses() {
        let mw = DepthMiddleware::new(0);
        let spider = Spider::new("s");
        let mut req = Request::new("http://a/");
        let mut res = Response::from_request(&req);

        mw.process_response(&mut res, &mut req, &spider).await;
        assert_eq!(res.meta.get_int(keys::DEPTH), Some(1));

        // An already-annotated response keeps its depth.
        res.meta.set(keys::DEPTH, 4i64);
        mw.process_response(&mut res, &mut req, &spider).await;
        assert_eq!(res.meta.get_int(keys::DEPTH), Some(4));
    }

    #[tokio::test]
    async fn children_inherit_incremented_depth() {
        let mw = DepthMiddleware::new(0);
        let spider = Spider::new("s");
        let parent_req = Request::new("http://a/");
        let parent = Response::from_request(&parent_req);
        parent.meta.set(keys::DEPTH, 2i64);

        let mut child = Request::new("http://a/next");
        assert!(mw
            .process_new_request(&mut child, &parent, &spider)
            .await
            .is_continue());
        assert_eq!(child.meta.get_int(keys::DEPTH), Some(3));
    }

    #[tokio::test]
    async fn cuts_beyond_the_limit() {
        let mw = DepthMiddleware::new(2);
        let spider = Spider::new("s");
        let parent_req = Request::new("http://a/");
        let parent = Response::from_request(&parent_req);
        parent.meta.set(keys::DEPTH, 2i64);

        let mut child = Request::new("http://a/next");
        let action = mw.process_new_request(&mut child, &parent, &spider).await;
        assert!(matches!(action, MiddlewareAction::Drop(_)));
        // Depth is annotated even on the dropped request.
        assert_eq!(child.meta.get_int(keys::DEPTH), Some(3));
    }
}
