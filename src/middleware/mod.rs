//! Interceptor chains around the downloader and the parsers.
//!
//! Two chains exist: download middlewares wrap the downloader (a
//! pre-request and a post-response hook), spider middlewares sit between
//! the downloader and the parser (a post-response hook plus an admission
//! hook for newly yielded requests). Within a chain, hooks run in
//! registration order; registration is fixed once the engine is built.
//!
//! Every hook returns a [`MiddlewareAction`]: continue, drop the task
//! quietly, or fail into the step's `handle_err`. A step must not mutate
//! state after returning drop or fail.

mod cache;
mod delay;
mod depth;
mod http_error;
mod offsite;
mod retry;

pub use cache::CacheMiddleware;
pub use delay::DelayMiddleware;
pub use depth::DepthMiddleware;
pub use http_error::HttpErrorMiddleware;
pub use offsite::OffsiteMiddleware;
pub use retry::RetryMiddleware;

use async_trait::async_trait;
use tracing::error;

use crate::error::CrawlError;
use crate::request::Request;
use crate::response::Response;
use crate::spider::Spider;

/// Outcome of a single middleware or pipeline step.
#[derive(Debug)]
pub enum MiddlewareAction {
    /// Proceed to the next step.
    Continue,
    /// Stop the current traversal quietly. Logged at debug, never retried.
    Drop(String),
    /// Stop and route the error to the step's `handle_err`.
    Fail(CrawlError),
}

impl MiddlewareAction {
    pub fn drop_task(message: impl Into<String>) -> Self {
        MiddlewareAction::Drop(message.into())
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, MiddlewareAction::Continue)
    }
}

/// Lifecycle shared by middlewares, pipelines and standalone listeners.
///
/// `open` runs on every registered component before the first request is
/// enqueued; `close` runs after drain, in reverse category order, with the
/// chosen close reason.
#[async_trait]
pub trait OpenClose: Send + Sync {
    async fn open(&self, _spider: &Spider) -> Result<(), CrawlError> {
        Ok(())
    }

    async fn close(&self, _reason: &str, _spider: &Spider) -> Result<(), CrawlError> {
        Ok(())
    }
}

/// An interceptor around the downloader.
#[async_trait]
pub trait DownloadMiddleware: OpenClose {
    fn name(&self) -> &'static str;

    /// Called when a step of this middleware returned [`MiddlewareAction::Fail`].
    async fn handle_err(&self, err: &CrawlError, spider: &Spider) {
        error!(spider = %spider.name, middleware = self.name(), "{err}");
    }

    /// Runs before the downloader, in registration order.
    async fn process_request(&self, _req: &mut Request, _spider: &Spider) -> MiddlewareAction {
        MiddlewareAction::Continue
    }

    /// Runs after the downloader, in registration order.
    async fn process_response(
        &self,
        _res: &mut Response,
        _req: &mut Request,
        _spider: &Spider,
    ) -> MiddlewareAction {
        MiddlewareAction::Continue
    }
}

/// An interceptor between the downloader and the parsers.
#[async_trait]
pub trait SpiderMiddleware: OpenClose {
    fn name(&self) -> &'static str;

    async fn handle_err(&self, err: &CrawlError, spider: &Spider) {
        error!(spider = %spider.name, middleware = self.name(), "{err}");
    }

    /// Runs after the download chain, before the parser.
    async fn process_response(
        &self,
        _res: &mut Response,
        _req: &mut Request,
        _spider: &Spider,
    ) -> MiddlewareAction {
        MiddlewareAction::Continue
    }

    /// Admission hook for requests yielded with a parent response. Start
    /// URLs and engine-internal re-yields (parent absent) skip it.
    async fn process_new_request(
        &self,
        _req: &mut Request,
        _parent: &Response,
        _spider: &Spider,
    ) -> MiddlewareAction {
        MiddlewareAction::Continue
    }
}
