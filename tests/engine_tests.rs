//! End-to-end crawls against stub collaborators: no network, no disk.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use leio::prelude::*;
use leio::status::{REASON_COMPLETED, REASON_INTERRUPTED};

/// Scripted downloader recording call counts, concurrency and the retry
/// meta observed at download time.
struct StubDownloader {
    calls: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    retries_seen: Arc<Mutex<Vec<Option<i64>>>>,
    respond: Box<dyn Fn(&Request, usize) -> Response + Send + Sync>,
}

impl StubDownloader {
    fn new(respond: impl Fn(&Request, usize) -> Response + Send + Sync + 'static) -> Self {
        StubDownloader {
            calls: Arc::new(AtomicUsize::new(0)),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            retries_seen: Arc::new(Mutex::new(Vec::new())),
            respond: Box::new(respond),
        }
    }

    fn html_ok() -> Self {
        Self::new(|req, _| Response::from_request(req).with_status(200).with_body("x"))
    }

    fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    fn max_active(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.max_active)
    }

    fn retries_seen(&self) -> Arc<Mutex<Vec<Option<i64>>>> {
        Arc::clone(&self.retries_seen)
    }
}

#[async_trait]
impl Downloader for StubDownloader {
    async fn download(&self, req: &Request, _spider: &Spider) -> Response {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        self.retries_seen
            .lock()
            .unwrap()
            .push(req.meta.get_int(meta_keys::RETRY));

        tokio::time::sleep(Duration::from_millis(10)).await;
        let res = (self.respond)(req, call);

        self.active.fetch_sub(1, Ordering::SeqCst);
        res
    }
}

struct NoopParser;

#[async_trait]
impl Parser for NoopParser {
    async fn parse(
        &self,
        _res: Response,
        _req: Request,
        _spider: Arc<Spider>,
        _yielder: Arc<dyn Yield>,
    ) -> Result<(), CrawlError> {
        Ok(())
    }
}

struct CountingParser {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Parser for CountingParser {
    async fn parse(
        &self,
        _res: Response,
        _req: Request,
        _spider: Arc<Spider>,
        _yielder: Arc<dyn Yield>,
    ) -> Result<(), CrawlError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Yields exactly one child per parsed response, with a fresh URL each
/// time so the cache middleware never interferes.
struct ChildParser;

#[async_trait]
impl Parser for ChildParser {
    async fn parse(
        &self,
        res: Response,
        req: Request,
        _spider: Arc<Spider>,
        yielder: Arc<dyn Yield>,
    ) -> Result<(), CrawlError> {
        let child = Request::new(format!("{}c/", req.url));
        yielder.yield_request(child, Some(&res)).await;
        Ok(())
    }
}

fn quick_config() -> CrawlConfig {
    CrawlConfig {
        download_delay: 0.0,
        randomize_delay: false,
        ..CrawlConfig::default()
    }
}

#[tokio::test]
async fn s1_single_page_counts_everything_once() {
    let stub = StubDownloader::html_ok();
    let calls = stub.calls();
    let engine = EngineBuilder::with_defaults(quick_config())
        .downloader(stub)
        .add_parser("parser", NoopParser)
        .build()
        .unwrap();
    let status = engine.status();
    let in_flight = engine.in_flight();

    engine
        .run(Spider::new("s1").start_url("http://a/"))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(status.pages(), 1);
    assert_eq!(status.crawled(), 1);
    assert_eq!(status.succeed(), 1);
    assert_eq!(status.items(), 0);
    assert_eq!(status.files(), 0);
    assert_eq!(status.reason(), REASON_COMPLETED);
    assert_eq!(in_flight.count(), 0);
    assert_eq!(status.running_pages(), 0);
}

#[tokio::test]
async fn s2_offsite_filter_blocks_the_download() {
    let stub = StubDownloader::html_ok();
    let calls = stub.calls();
    let engine = EngineBuilder::with_defaults(quick_config())
        .downloader(stub)
        .add_parser("parser", NoopParser)
        .build()
        .unwrap();
    let status = engine.status();

    engine
        .run(
            Spider::new("s2")
                .start_url("http://b.com/")
                .allow_domain("a.com"),
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(status.pages(), 1);
    assert_eq!(status.crawled(), 0);
    assert_eq!(status.succeed(), 0);
    assert_eq!(status.running_pages(), 0);
}

#[tokio::test]
async fn s3_cache_deduplicates_identical_urls() {
    let stub = StubDownloader::html_ok();
    let calls = stub.calls();
    // Serialize processing so the first URL lands in the cache before the
    // duplicate is looked at.
    let config = CrawlConfig {
        concurrent_requests: 1,
        ..quick_config()
    };
    let engine = EngineBuilder::with_defaults(config)
        .downloader(stub)
        .add_parser("parser", NoopParser)
        .build()
        .unwrap();
    let status = engine.status();

    engine
        .run(
            Spider::new("s3")
                .start_url("http://a/")
                .start_url("http://a/"),
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(status.pages(), 2);
    assert_eq!(status.crawled(), 1);
    assert_eq!(status.succeed(), 1);
}

#[tokio::test]
async fn s4_retry_until_success() {
    let stub = StubDownloader::new(|req, call| {
        if call <= 2 {
            Response::from_request(req).with_err(ResponseError::Fail("connection reset".into()))
        } else {
            Response::from_request(req).with_status(200)
        }
    });
    let calls = stub.calls();
    let retries_seen = stub.retries_seen();
    let parser_calls = Arc::new(AtomicUsize::new(0));

    let engine = EngineBuilder::with_defaults(quick_config())
        .downloader(stub)
        .add_parser(
            "parser",
            CountingParser {
                calls: Arc::clone(&parser_calls),
            },
        )
        .build()
        .unwrap();
    let status = engine.status();

    engine
        .run(Spider::new("s4").start_url("http://a/"))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(parser_calls.load(Ordering::SeqCst), 1);
    assert_eq!(*retries_seen.lock().unwrap(), vec![None, Some(1), Some(2)]);
    assert_eq!(status.pages(), 3);
    assert_eq!(status.crawled(), 3);
    assert_eq!(status.succeed(), 1);
    assert_eq!(status.reason(), REASON_COMPLETED);
}

#[tokio::test]
async fn s5_depth_limit_one_cuts_all_children() {
    let stub = StubDownloader::html_ok();
    let calls = stub.calls();
    let config = CrawlConfig {
        depth_limit: 1,
        ..quick_config()
    };
    let engine = EngineBuilder::with_defaults(config)
        .downloader(stub)
        .add_parser("parser", ChildParser)
        .build()
        .unwrap();
    let status = engine.status();

    engine
        .run(Spider::new("s5").start_url("http://a/"))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(status.pages(), 1);
    assert_eq!(status.succeed(), 1);
}

#[tokio::test]
async fn depth_limit_two_downloads_two_levels() {
    let stub = StubDownloader::html_ok();
    let calls = stub.calls();
    let config = CrawlConfig {
        depth_limit: 2,
        ..quick_config()
    };
    let engine = EngineBuilder::with_defaults(config)
        .downloader(stub)
        .add_parser("parser", ChildParser)
        .build()
        .unwrap();
    let status = engine.status();

    engine
        .run(Spider::new("depth2").start_url("http://a/"))
        .await
        .unwrap();

    // Depth 1 (start) and depth 2 (its child) download; the depth-3 child
    // is dropped at admission and never enqueued.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(status.pages(), 2);
    assert_eq!(status.succeed(), 2);
}

struct FileItemParser;

#[async_trait]
impl Parser for FileItemParser {
    async fn parse(
        &self,
        _res: Response,
        _req: Request,
        _spider: Arc<Spider>,
        yielder: Arc<dyn Yield>,
    ) -> Result<(), CrawlError> {
        let item = Item::new().with("fileurls", vec!["http://a/x.jpg"]);
        yielder.yield_item(item).await;
        Ok(())
    }
}

struct AlwaysMissingWriter;

#[async_trait]
impl FileWriter for AlwaysMissingWriter {
    async fn not_exists(&self, _path: &Path) -> bool {
        true
    }

    async fn write_file(&self, _req: &Request, _body: &[u8]) -> (String, ResponseError) {
        (
            "pipeline never writes".to_owned(),
            ResponseError::Fail("unexpected write".to_owned()),
        )
    }
}

#[tokio::test]
async fn s6_file_pipeline_downloads_through_the_chain() {
    let stub = StubDownloader::new(|req, _| {
        if req.is_file() {
            Response::from_request(req)
                .with_err(ResponseError::Drop("Saving file completed".into()))
        } else {
            Response::from_request(req).with_status(200).with_body("<html/>")
        }
    });
    let calls = stub.calls();
    let engine = EngineBuilder::with_defaults(quick_config())
        .downloader(stub)
        .add_parser("parser", FileItemParser)
        .add_file_pipeline(Arc::new(AlwaysMissingWriter))
        .build()
        .unwrap();
    let status = engine.status();
    let in_flight = engine.in_flight();

    engine
        .run(Spider::new("s6").start_url("http://a/"))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2, "html page + file request");
    assert_eq!(status.pages(), 2);
    assert_eq!(status.items(), 1);
    assert_eq!(status.files(), 1);
    assert_eq!(status.succeed(), 1, "only the html page reaches a parser");
    assert_eq!(in_flight.count(), 0);
}

#[derive(Default)]
struct RecordingListener {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

#[async_trait]
impl OpenClose for RecordingListener {
    async fn open(&self, _spider: &Spider) -> Result<(), CrawlError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self, _reason: &str, _spider: &Spider) -> Result<(), CrawlError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn empty_start_urls_still_run_the_lifecycle() {
    let stub = StubDownloader::html_ok();
    let calls = stub.calls();
    let recorder = Arc::new(RecordingListener::default());
    let engine = EngineBuilder::with_defaults(quick_config())
        .downloader(stub)
        .add_shared_listener(Arc::clone(&recorder) as Arc<dyn OpenClose>)
        .add_parser("parser", NoopParser)
        .build()
        .unwrap();
    let status = engine.status();

    engine.run(Spider::new("empty")).await.unwrap();

    assert_eq!(recorder.opened.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.closed.load(Ordering::SeqCst), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(status.reason(), REASON_COMPLETED);
}

#[tokio::test]
async fn gate_caps_concurrent_downloads() {
    let stub = StubDownloader::html_ok();
    let calls = stub.calls();
    let max_active = stub.max_active();
    let config = CrawlConfig {
        concurrent_requests: 2,
        ..quick_config()
    };
    let engine = EngineBuilder::with_defaults(config)
        .downloader(stub)
        .add_parser("parser", NoopParser)
        .build()
        .unwrap();

    let mut spider = Spider::new("gate");
    for n in 0..6 {
        spider = spider.start_url(format!("http://a/{n}"));
    }
    engine.run(spider).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 6);
    assert!(
        max_active.load(Ordering::SeqCst) <= 2,
        "no more than two downloads may overlap"
    );
}

#[tokio::test]
async fn single_slot_gate_serializes_processing() {
    let stub = StubDownloader::html_ok();
    let max_active = stub.max_active();
    let config = CrawlConfig {
        concurrent_requests: 1,
        ..quick_config()
    };
    let engine = EngineBuilder::with_defaults(config)
        .downloader(stub)
        .add_parser("parser", NoopParser)
        .build()
        .unwrap();

    let mut spider = Spider::new("serial");
    for n in 0..4 {
        spider = spider.start_url(format!("http://a/{n}"));
    }
    engine.run(spider).await.unwrap();

    assert_eq!(max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn zero_retry_budget_processes_each_start_url_once() {
    let stub = StubDownloader::new(|req, _| {
        Response::from_request(req).with_err(ResponseError::Fail("always down".into()))
    });
    let calls = stub.calls();
    let config = CrawlConfig {
        retry_times: 0,
        ..quick_config()
    };
    let engine = EngineBuilder::with_defaults(config)
        .downloader(stub)
        .add_parser("parser", NoopParser)
        .build()
        .unwrap();
    let status = engine.status();
    let in_flight = engine.in_flight();

    engine
        .run(
            Spider::new("noretry")
                .start_url("http://a/")
                .start_url("http://b/"),
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(status.pages(), 2);
    assert_eq!(status.crawled(), 2);
    assert_eq!(status.succeed(), 0);
    assert_eq!(in_flight.count(), 0);
}

/// Interrupts the crawl from inside the first parse, then tries to yield.
struct InterruptingParser {
    status: Arc<OnceLock<Arc<StatusInfo>>>,
}

#[async_trait]
impl Parser for InterruptingParser {
    async fn parse(
        &self,
        res: Response,
        req: Request,
        _spider: Arc<Spider>,
        yielder: Arc<dyn Yield>,
    ) -> Result<(), CrawlError> {
        if let Some(status) = self.status.get() {
            status.interrupt();
        }
        let child = Request::new(format!("{}c/", req.url));
        yielder.yield_request(child, Some(&res)).await;
        Ok(())
    }
}

#[tokio::test]
async fn interrupt_refuses_new_work_and_drains() {
    let stub = StubDownloader::html_ok();
    let calls = stub.calls();
    let status_slot: Arc<OnceLock<Arc<StatusInfo>>> = Arc::new(OnceLock::new());
    let engine = EngineBuilder::with_defaults(quick_config())
        .downloader(stub)
        .add_parser(
            "parser",
            InterruptingParser {
                status: Arc::clone(&status_slot),
            },
        )
        .build()
        .unwrap();
    let status = engine.status();
    let in_flight = engine.in_flight();
    status_slot.set(Arc::clone(&status)).ok().unwrap();

    engine
        .run(Spider::new("interrupt").start_url("http://a/"))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(status.pages(), 1, "the refused child is never counted");
    assert_eq!(status.reason(), REASON_INTERRUPTED);
    assert_eq!(in_flight.count(), 0);
}

#[tokio::test]
async fn missing_parser_drops_the_task_but_not_the_engine() {
    let stub = StubDownloader::html_ok();
    let calls = stub.calls();
    let engine = EngineBuilder::with_defaults(quick_config())
        .downloader(stub)
        .build()
        .unwrap();
    let status = engine.status();

    engine
        .run(Spider::new("orphan").start_url("http://a/"))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(status.crawled(), 1);
    assert_eq!(status.succeed(), 0);
    assert_eq!(status.running_pages(), 0);
}

#[tokio::test]
async fn zero_concurrency_is_rejected_at_build() {
    let config = CrawlConfig {
        concurrent_requests: 0,
        ..quick_config()
    };
    let result = EngineBuilder::with_defaults(config)
        .downloader(StubDownloader::html_ok())
        .build();
    assert!(matches!(result, Err(CrawlError::Config(_))));
}
