//! The crawl engine: queue, dispatcher, drain detection and lifecycle.
//!
//! One engine drives one crawl. `run` opens every registered component,
//! seeds the queue with the spider's start URLs and then dispatches: each
//! received request acquires a slot on the concurrency gate and runs the
//! per-request state machine in its own task. A drain-waiter task closes
//! the queue once the in-flight counter reports that every unit of work
//! (requests and pipeline items alike) has finished, which ends the
//! dispatcher loop and triggers the close sequence.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use kanal::{AsyncReceiver, AsyncSender};
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use super::yielder::{Yield, Yielder};
use crate::config::CrawlConfig;
use crate::counter::InFlight;
use crate::downloader::Downloader;
use crate::error::CrawlError;
use crate::middleware::{DownloadMiddleware, MiddlewareAction, OpenClose, SpiderMiddleware};
use crate::parser::Parser;
use crate::pipeline::ItemPipeline;
use crate::request::Request;
use crate::response::Response;
use crate::spider::Spider;
use crate::status::StatusInfo;

pub(crate) struct EngineCore {
    pub(crate) config: CrawlConfig,
    pub(crate) queue_tx: AsyncSender<Request>,
    pub(crate) gate: Arc<Semaphore>,
    pub(crate) counter: InFlight,
    pub(crate) status: Arc<StatusInfo>,
    pub(crate) downloader: Arc<dyn Downloader>,
    pub(crate) download_chain: Vec<Arc<dyn DownloadMiddleware>>,
    pub(crate) spider_chain: Vec<Arc<dyn SpiderMiddleware>>,
    pub(crate) pipelines: Vec<Arc<dyn ItemPipeline>>,
    pub(crate) listeners: Vec<Arc<dyn OpenClose>>,
    pub(crate) parsers: HashMap<String, Arc<dyn Parser>>,
    pub(crate) spider: OnceLock<Arc<Spider>>,
}

impl EngineCore {
    pub(crate) fn current_spider(&self) -> Option<Arc<Spider>> {
        self.spider.get().cloned()
    }

    pub(crate) fn yielder(self: &Arc<Self>) -> Arc<dyn Yield> {
        Arc::new(Yielder {
            core: Arc::downgrade(self),
        })
    }

    /// Admits a new request into the crawl.
    ///
    /// With a parent response the spider chain's admission hooks run first;
    /// a drop or fail there ends the request before it is ever counted.
    /// After an interrupt the request is refused silently.
    pub(crate) async fn yield_request(self: &Arc<Self>, mut req: Request, parent: Option<&Response>) {
        let Some(spider) = self.current_spider() else {
            return;
        };

        if let Some(parent) = parent {
            for mw in &self.spider_chain {
                match mw.process_new_request(&mut req, parent, &spider).await {
                    MiddlewareAction::Continue => {}
                    MiddlewareAction::Drop(msg) => {
                        debug!(spider = %spider.name, "Drop request {}, {}", req.url, msg);
                        return;
                    }
                    MiddlewareAction::Fail(err) => {
                        mw.handle_err(&err, &spider).await;
                        return;
                    }
                }
            }
        }

        if self.status.is_interrupted() {
            debug!(spider = %spider.name, "Interrupted, refusing request {}", req.url);
            return;
        }

        self.status.add_page();
        // Count the unit before it can possibly be observed in the queue,
        // or drain could fire between enqueue and dispatch.
        self.counter.add();

        // Enqueue from a task so an emitter holding a gate slot never
        // deadlocks against a full queue.
        let tx = self.queue_tx.clone();
        let counter = self.counter.clone();
        tokio::spawn(async move {
            if tx.send(req).await.is_err() {
                counter.done();
            }
        });
    }
}

/// The assembled crawl engine. Built by [`EngineBuilder`], consumed by
/// [`run`].
///
/// [`EngineBuilder`]: super::EngineBuilder
/// [`run`]: Engine::run
pub struct Engine {
    pub(crate) core: Arc<EngineCore>,
    pub(crate) queue_rx: AsyncReceiver<Request>,
}

impl Engine {
    /// The status object, for programmatic access to counters and for
    /// requesting an interrupt.
    pub fn status(&self) -> Arc<StatusInfo> {
        Arc::clone(&self.core.status)
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.core.config
    }

    /// The in-flight counter. Reads zero once `run` has returned.
    pub fn in_flight(&self) -> InFlight {
        self.core.counter.clone()
    }

    /// A yield capability bound to this engine, for components constructed
    /// outside the builder.
    pub fn yielder(&self) -> Arc<dyn Yield> {
        self.core.yielder()
    }

    /// Runs the crawl to completion: open everything, drain, close
    /// everything. Returns once no unit of work is outstanding.
    pub async fn run(self, spider: Spider) -> Result<(), CrawlError> {
        let Engine { core, queue_rx } = self;
        let spider = Arc::new(spider);
        if core.spider.set(Arc::clone(&spider)).is_err() {
            return Err(CrawlError::Config("engine already ran a crawl".to_owned()));
        }

        info!(spider = %spider.name, "Start spider");
        core.status.open(&spider.name);
        for listener in &core.listeners {
            if let Err(err) = listener.open(&spider).await {
                error!(spider = %spider.name, "Listener open failed: {err}");
            }
        }
        for mw in &core.download_chain {
            if let Err(err) = mw.open(&spider).await {
                error!(spider = %spider.name, middleware = mw.name(), "Open failed: {err}");
            }
        }
        for mw in &core.spider_chain {
            if let Err(err) = mw.open(&spider).await {
                error!(spider = %spider.name, middleware = mw.name(), "Open failed: {err}");
            }
        }
        for pipeline in &core.pipelines {
            if let Err(err) = pipeline.open(&spider).await {
                error!(spider = %spider.name, pipeline = pipeline.name(), "Open failed: {err}");
            }
        }

        // Without start URLs there is nothing to wait for; running the
        // dispatcher would block forever on a queue nobody closes.
        if !spider.start_urls.is_empty() {
            // Arm the drain waiter before the first enqueue.
            let counter = core.counter.clone();
            let queue_tx = core.queue_tx.clone();
            tokio::spawn(async move {
                counter.wait().await;
                queue_tx.close();
            });

            info!(spider = %spider.name, "Adding start URLs");
            for req in spider.start_urls.clone() {
                core.yield_request(req, None).await;
            }

            while let Ok(req) = queue_rx.recv().await {
                let permit = match Arc::clone(&core.gate).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let core = Arc::clone(&core);
                let spider = Arc::clone(&spider);
                tokio::spawn(async move {
                    core.process(req, &spider).await;
                    drop(permit);
                    core.counter.done();
                });
            }
        }

        info!(spider = %spider.name, "Closing spider");
        let reason = core.status.reason();
        for pipeline in &core.pipelines {
            if let Err(err) = pipeline.close(&reason, &spider).await {
                error!(spider = %spider.name, pipeline = pipeline.name(), "Close failed: {err}");
            }
        }
        for mw in &core.spider_chain {
            if let Err(err) = mw.close(&reason, &spider).await {
                error!(spider = %spider.name, middleware = mw.name(), "Close failed: {err}");
            }
        }
        for mw in &core.download_chain {
            if let Err(err) = mw.close(&reason, &spider).await {
                error!(spider = %spider.name, middleware = mw.name(), "Close failed: {err}");
            }
        }
        for listener in &core.listeners {
            if let Err(err) = listener.close(&reason, &spider).await {
                error!(spider = %spider.name, "Listener close failed: {err}");
            }
        }
        core.status.close(&spider.name);
        Ok(())
    }
}
