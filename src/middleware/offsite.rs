//! Drops requests whose host matches none of the spider's allowed domains.

use async_trait::async_trait;
use tracing::trace;
use url::Url;

use super::{DownloadMiddleware, MiddlewareAction, OpenClose};
use crate::request::Request;
use crate::spider::Spider;

pub struct OffsiteMiddleware;

#[async_trait]
impl OpenClose for OffsiteMiddleware {}

#[async_trait]
impl DownloadMiddleware for OffsiteMiddleware {
    fn name(&self) -> &'static str {
        "offsite"
    }

    async fn process_request(&self, req: &mut Request, spider: &Spider) -> MiddlewareAction {
        if spider.allowed_domains.is_empty() {
            return MiddlewareAction::Continue;
        }

        // An unparseable URL passes through; the downloader reports it.
        let Some(host) = Url::parse(&req.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
        else {
            return MiddlewareAction::Continue;
        };

        match spider
            .allowed_domains
            .iter()
            .find(|domain| host.ends_with(domain.as_str()))
        {
            Some(domain) => {
                trace!(spider = %spider.name, "{} matches domain {}", req.url, domain);
                MiddlewareAction::Continue
            }
            None => MiddlewareAction::drop_task("Filtered off site request"),
        }
    }
}
