//! The default reqwest-backed downloader.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{BrowserBridge, Downloader};
use crate::config::CrawlConfig;
use crate::error::{CrawlError, ResponseError};
use crate::meta::keys;
use crate::request::Request;
use crate::response::Response;
use crate::spider::Spider;
use crate::writer::{FileWriter, FsWriter};

/// HTTP downloader with three branches: plain pages, static-file requests
/// (body handed to the [`FileWriter`], propagation stopped with a drop-kind
/// error) and browser-bridge requests (`phantomjs` meta).
pub struct HttpDownloader {
    client: reqwest::Client,
    writer: Arc<dyn FileWriter>,
    bridge: Option<Arc<dyn BrowserBridge>>,
}

impl HttpDownloader {
    pub fn new(config: &CrawlConfig) -> Result<Self, CrawlError> {
        Self::build(config, None)
    }

    /// Routes all traffic through the given proxy URL.
    pub fn with_proxy(config: &CrawlConfig, proxy_url: &str) -> Result<Self, CrawlError> {
        Self::build(config, Some(proxy_url))
    }

    /// Replaces the filesystem writer backing the file branch.
    pub fn writer(mut self, writer: Arc<dyn FileWriter>) -> Self {
        self.writer = writer;
        self
    }

    /// Enables the headless-browser branch for `phantomjs`-tagged requests.
    pub fn bridge(mut self, bridge: Arc<dyn BrowserBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    fn build(config: &CrawlConfig, proxy_url: Option<&str>) -> Result<Self, CrawlError> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs_f64(config.timeout));
        if !config.user_agent.is_empty() {
            builder = builder.user_agent(config.user_agent.clone());
        }
        if let Some(proxy) = proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(HttpDownloader {
            client: builder.build()?,
            writer: Arc::new(FsWriter::new()),
            bridge: None,
        })
    }

    async fn fetch_via_bridge(&self, req: &Request, res: &mut Response, spider: &Spider) {
        let Some(bridge) = &self.bridge else {
            res.err = Some(ResponseError::Fail(
                "no browser bridge configured".to_owned(),
            ));
            return;
        };
        info!(spider = %spider.name, "Using the browser bridge for {}", req.url);
        match bridge.fetch(&req.url).await {
            Ok(body) => {
                res.body = body;
                // A browser page load aggregates many exchanges; there is no
                // single meaningful status, so report plain success.
                res.status_code = 200;
            }
            Err(err) => res.err = Some(ResponseError::Fail(err.to_string())),
        }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, req: &Request, spider: &Spider) -> Response {
        let mut res = Response::from_request(req);

        match req.meta.get_int(keys::RETRY) {
            Some(attempt) => {
                info!(spider = %spider.name, "Retrying {} for {} times", req.url, attempt)
            }
            None => info!(spider = %spider.name, "Requesting {}", req.url),
        }

        if req.meta.get_bool(keys::PHANTOMJS).unwrap_or(false) {
            self.fetch_via_bridge(req, &mut res, spider).await;
            return res;
        }

        match self.client.get(req.url.as_str()).send().await {
            Err(err) => res.err = Some(ResponseError::Fail(err.to_string())),
            Ok(reply) => {
                res.status_code = reply.status().as_u16();
                match reply.bytes().await {
                    Err(err) => res.err = Some(ResponseError::Fail(err.to_string())),
                    Ok(body) => {
                        if req.is_file() {
                            let (outcome, err) = self.writer.write_file(req, &body).await;
                            debug!(spider = %spider.name, "{outcome}");
                            res.err = Some(err);
                        } else {
                            res.body = body;
                        }
                    }
                }
            }
        }

        res
    }
}
