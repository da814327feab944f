//! Fluent assembly of an [`Engine`].
//!
//! Components that emit new work (the retry middleware, the file pipeline,
//! custom middlewares) receive the engine's yield capability by
//! constructor injection: register them through the `_with` variants and
//! the builder hands your constructor the capability at build time.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use kanal::bounded_async;
use tokio::sync::Semaphore;

use super::core::{Engine, EngineCore};
use super::yielder::{Yield, Yielder};
use crate::config::CrawlConfig;
use crate::counter::InFlight;
use crate::downloader::{Downloader, HttpDownloader};
use crate::error::CrawlError;
use crate::interrupt::InterruptWatch;
use crate::middleware::{
    CacheMiddleware, DelayMiddleware, DepthMiddleware, DownloadMiddleware, HttpErrorMiddleware,
    OffsiteMiddleware, OpenClose, RetryMiddleware, SpiderMiddleware,
};
use crate::parser::Parser;
use crate::pipeline::{FilePipeline, ItemPipeline};
use crate::status::StatusInfo;
use crate::writer::FileWriter;

type DownloadFactory = Box<dyn FnOnce(&Arc<dyn Yield>) -> Arc<dyn DownloadMiddleware> + Send>;
type SpiderFactory = Box<dyn FnOnce(&Arc<dyn Yield>) -> Arc<dyn SpiderMiddleware> + Send>;
type PipelineFactory = Box<dyn FnOnce(&Arc<dyn Yield>) -> Arc<dyn ItemPipeline> + Send>;

pub struct EngineBuilder {
    config: CrawlConfig,
    downloader: Option<Arc<dyn Downloader>>,
    download_chain: Vec<DownloadFactory>,
    spider_chain: Vec<SpiderFactory>,
    pipelines: Vec<PipelineFactory>,
    listeners: Vec<Arc<dyn OpenClose>>,
    parsers: HashMap<String, Arc<dyn Parser>>,
    status: Arc<StatusInfo>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    /// An empty builder: no middlewares, no pipelines, default config.
    pub fn new() -> Self {
        EngineBuilder {
            config: CrawlConfig::default(),
            downloader: None,
            download_chain: Vec::new(),
            spider_chain: Vec::new(),
            pipelines: Vec::new(),
            listeners: Vec::new(),
            parsers: HashMap::new(),
            status: StatusInfo::new(),
        }
    }

    /// A builder preloaded with the standard chains: offsite, delay, retry
    /// and cache around the downloader; http-error and depth on the spider
    /// side; plus the user-interrupt watch.
    pub fn with_defaults(config: CrawlConfig) -> Self {
        let delay = config.download_delay;
        let randomize = config.randomize_delay;
        let retry_enabled = config.retry_enabled;
        let retry_times = config.retry_times;
        let depth_limit = config.depth_limit;

        let builder = Self::new().config(config);
        let watch = InterruptWatch::new(builder.status.clone());
        builder
            .add_download_middleware(OffsiteMiddleware)
            .add_download_middleware(DelayMiddleware::new(delay, randomize))
            .add_download_middleware_with(move |yielder| {
                RetryMiddleware::new(retry_enabled, retry_times, Arc::clone(yielder))
            })
            .add_download_middleware(CacheMiddleware::new())
            .add_spider_middleware(HttpErrorMiddleware)
            .add_spider_middleware(DepthMiddleware::new(depth_limit))
            .add_listener(watch)
    }

    pub fn config(mut self, config: CrawlConfig) -> Self {
        self.config = config;
        self
    }

    pub fn downloader(mut self, downloader: impl Downloader + 'static) -> Self {
        self.downloader = Some(Arc::new(downloader));
        self
    }

    pub fn add_download_middleware(mut self, mw: impl DownloadMiddleware + 'static) -> Self {
        let mw: Arc<dyn DownloadMiddleware> = Arc::new(mw);
        self.download_chain.push(Box::new(move |_| mw));
        self
    }

    /// Registers a download middleware whose constructor needs the yield
    /// capability.
    pub fn add_download_middleware_with<M, F>(mut self, make: F) -> Self
    where
        M: DownloadMiddleware + 'static,
        F: FnOnce(&Arc<dyn Yield>) -> M + Send + 'static,
    {
        self.download_chain.push(Box::new(move |yielder| Arc::new(make(yielder))));
        self
    }

    pub fn add_spider_middleware(mut self, mw: impl SpiderMiddleware + 'static) -> Self {
        let mw: Arc<dyn SpiderMiddleware> = Arc::new(mw);
        self.spider_chain.push(Box::new(move |_| mw));
        self
    }

    pub fn add_spider_middleware_with<M, F>(mut self, make: F) -> Self
    where
        M: SpiderMiddleware + 'static,
        F: FnOnce(&Arc<dyn Yield>) -> M + Send + 'static,
    {
        self.spider_chain.push(Box::new(move |yielder| Arc::new(make(yielder))));
        self
    }

    pub fn add_pipeline(mut self, pipeline: impl ItemPipeline + 'static) -> Self {
        let pipeline: Arc<dyn ItemPipeline> = Arc::new(pipeline);
        self.pipelines.push(Box::new(move |_| pipeline));
        self
    }

    pub fn add_pipeline_with<P, F>(mut self, make: F) -> Self
    where
        P: ItemPipeline + 'static,
        F: FnOnce(&Arc<dyn Yield>) -> P + Send + 'static,
    {
        self.pipelines.push(Box::new(move |yielder| Arc::new(make(yielder))));
        self
    }

    /// Registers a standalone open/close listener (a writer with a
    /// connection lifecycle, for instance).
    pub fn add_listener(mut self, listener: impl OpenClose + 'static) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn add_shared_listener(mut self, listener: Arc<dyn OpenClose>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn add_parser(mut self, name: impl Into<String>, parser: impl Parser + 'static) -> Self {
        self.parsers.insert(name.into(), Arc::new(parser));
        self
    }

    /// Registers the file pipeline against the given writer, saving under
    /// the configured `file_save_dir`. Set the config before calling this.
    pub fn add_file_pipeline(self, writer: Arc<dyn FileWriter>) -> Self {
        let dir = self.config.file_save_dir.clone();
        self.add_pipeline_with(move |yielder| {
            FilePipeline::new(dir, writer, Arc::clone(yielder))
        })
    }

    pub fn build(self) -> Result<Engine, CrawlError> {
        let EngineBuilder {
            config,
            downloader,
            download_chain,
            spider_chain,
            pipelines,
            listeners,
            parsers,
            status,
        } = self;

        if config.concurrent_requests == 0 {
            return Err(CrawlError::Config(
                "concurrent_requests must be greater than 0".to_owned(),
            ));
        }

        let downloader: Arc<dyn Downloader> = match downloader {
            Some(downloader) => downloader,
            None => Arc::new(HttpDownloader::new(&config)?),
        };

        let (queue_tx, queue_rx) = bounded_async(config.concurrent_requests);
        let gate = Arc::new(Semaphore::new(config.concurrent_requests));

        let core = Arc::new_cyclic(|weak| {
            let yielder: Arc<dyn Yield> = Arc::new(Yielder { core: weak.clone() });
            EngineCore {
                config,
                queue_tx,
                gate,
                counter: InFlight::new(),
                status,
                downloader,
                download_chain: download_chain.into_iter().map(|make| make(&yielder)).collect(),
                spider_chain: spider_chain.into_iter().map(|make| make(&yielder)).collect(),
                pipelines: pipelines.into_iter().map(|make| make(&yielder)).collect(),
                listeners,
                parsers,
                spider: OnceLock::new(),
            }
        });

        Ok(Engine { core, queue_rx })
    }
}
