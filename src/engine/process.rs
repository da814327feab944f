//! The per-request state machine.
//!
//! Chain order within one request is strict: download pre-hooks, the
//! downloader, download post-hooks, spider post-hooks, then the parser.
//! Any step may end the request early with a drop (logged at debug) or a
//! failure (routed to that step's `handle_err`). Across requests there is
//! no ordering guarantee.

use std::sync::Arc;

use tracing::{debug, error};

use super::core::EngineCore;
use crate::error::ResponseError;
use crate::middleware::MiddlewareAction;
use crate::request::Request;
use crate::spider::Spider;

impl EngineCore {
    pub(crate) async fn process(self: &Arc<Self>, mut req: Request, spider: &Arc<Spider>) {
        let url = req.url.clone();
        self.status.add_running_page(&url);

        for mw in &self.download_chain {
            match mw.process_request(&mut req, spider).await {
                MiddlewareAction::Continue => {}
                MiddlewareAction::Drop(msg) => {
                    debug!(spider = %spider.name, "Drop task {}, {}", url, msg);
                    self.status.remove_running_page(&url);
                    return;
                }
                MiddlewareAction::Fail(err) => {
                    mw.handle_err(&err, spider).await;
                    self.status.remove_running_page(&url);
                    return;
                }
            }
        }

        let mut res = self.downloader.download(&req, spider).await;
        self.status.add_crawled();

        // A file request that came back with a drop-kind error is a
        // completed download; count it before the chain stops the task.
        if req.is_file() && matches!(res.err, Some(ResponseError::Drop(_))) {
            self.status.add_files();
        }

        for mw in &self.download_chain {
            match mw.process_response(&mut res, &mut req, spider).await {
                MiddlewareAction::Continue => {}
                MiddlewareAction::Drop(msg) => {
                    debug!(spider = %spider.name, "Drop task {}, {}", url, msg);
                    self.status.remove_running_page(&url);
                    return;
                }
                MiddlewareAction::Fail(err) => {
                    mw.handle_err(&err, spider).await;
                    self.status.remove_running_page(&url);
                    return;
                }
            }
        }

        for mw in &self.spider_chain {
            match mw.process_response(&mut res, &mut req, spider).await {
                MiddlewareAction::Continue => {}
                MiddlewareAction::Drop(msg) => {
                    debug!(spider = %spider.name, "Drop task {}, {}", url, msg);
                    self.status.remove_running_page(&url);
                    return;
                }
                MiddlewareAction::Fail(err) => {
                    mw.handle_err(&err, spider).await;
                    self.status.remove_running_page(&url);
                    return;
                }
            }
        }

        let Some(parser) = self.parsers.get(&req.parser_name).cloned() else {
            error!(spider = %spider.name, "No parser named {}", req.parser_name);
            self.status.remove_running_page(&url);
            return;
        };

        if let Err(err) = parser
            .parse(res, req, Arc::clone(spider), self.yielder())
            .await
        {
            error!(spider = %spider.name, "Parser error for {}: {err}", url);
        }
        self.status.add_succeed(&url);
    }
}
