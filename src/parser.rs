//! User-defined response parsers.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::Yield;
use crate::error::CrawlError;
use crate::request::Request;
use crate::response::Response;
use crate::spider::Spider;

/// Extracts items and follow-up requests from a response.
///
/// Parsers are looked up by the request's `parser_name`; a request whose
/// name matches no registered parser is logged and dropped. Output is
/// emitted as a side effect through the yielder.
#[async_trait]
pub trait Parser: Send + Sync {
    async fn parse(
        &self,
        res: Response,
        req: Request,
        spider: Arc<Spider>,
        yielder: Arc<dyn Yield>,
    ) -> Result<(), CrawlError>;
}

/// Adapts a plain async function to [`Parser`].
///
/// ```rust,ignore
/// let parser = FnParser(|res: Response, _req, _spider, yielder: Arc<dyn Yield>| async move {
///     for href in extract_links(&res.text()) {
///         yielder.yield_request(Request::new(href), Some(&res)).await;
///     }
///     Ok(())
/// });
/// ```
pub struct FnParser<F>(pub F);

#[async_trait]
impl<F, Fut> Parser for FnParser<F>
where
    F: Fn(Response, Request, Arc<Spider>, Arc<dyn Yield>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), CrawlError>> + Send,
{
    async fn parse(
        &self,
        res: Response,
        req: Request,
        spider: Arc<Spider>,
        yielder: Arc<dyn Yield>,
    ) -> Result<(), CrawlError> {
        (self.0)(res, req, spider, yielder).await
    }
}
