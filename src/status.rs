//! Running counters and the periodic progress report for one crawl.
//!
//! All mutation goes through a single mutex; counters only ever grow.
//! The engine opens the status object before anything else, which starts a
//! reporter task emitting a tabular progress report once a minute, and
//! closes it last, which emits the final report.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Close reason when the crawl drained on its own.
pub const REASON_COMPLETED: &str = "Jobs completed";
/// Close reason when the user interrupted the crawl.
pub const REASON_INTERRUPTED: &str = "User interrupted";

const REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// Thread-safe crawl counters, shared between the engine and its listeners.
pub struct StatusInfo {
    inner: Mutex<StatusInner>,
    reporter: CancellationToken,
}

struct StatusInner {
    start_date: Option<DateTime<Local>>,
    end_date: Option<DateTime<Local>>,
    reason: String,
    running_pages: HashSet<String>,
    pages: u64,
    crawled: u64,
    succeed: u64,
    items: u64,
    files: u64,
    interrupted: bool,
}

impl StatusInfo {
    pub fn new() -> Arc<Self> {
        Arc::new(StatusInfo {
            inner: Mutex::new(StatusInner {
                start_date: None,
                end_date: None,
                reason: REASON_COMPLETED.to_owned(),
                running_pages: HashSet::new(),
                pages: 0,
                crawled: 0,
                succeed: 0,
                items: 0,
                files: 0,
                interrupted: false,
            }),
            reporter: CancellationToken::new(),
        })
    }

    pub(crate) fn open(self: &Arc<Self>, spider_name: &str) {
        self.inner.lock().start_date = Some(Local::now());

        let status = Arc::clone(self);
        let token = self.reporter.clone();
        let name = spider_name.to_owned();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REPORT_INTERVAL);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for line in status.report() {
                            info!(spider = %name, "{}", line);
                        }
                    }
                    _ = token.cancelled() => break,
                }
            }
        });
    }

    pub(crate) fn close(&self, spider_name: &str) {
        self.reporter.cancel();

        let mut inner = self.inner.lock();
        inner.end_date = Some(Local::now());

        const DATE_FMT: &str = "%Y-%m-%d %H:%M:%S";
        let start = inner
            .start_date
            .map(|d| d.format(DATE_FMT).to_string())
            .unwrap_or_default();
        let end = inner
            .end_date
            .map(|d| d.format(DATE_FMT).to_string())
            .unwrap_or_default();
        let elapsed = match (inner.start_date, inner.end_date) {
            (Some(s), Some(e)) => (e - s).num_seconds(),
            _ => 0,
        };

        info!(spider = %spider_name, "{:<10} - {}", "Start Date", start);
        info!(spider = %spider_name, "{:<10} - {}", "End Date", end);
        info!(spider = %spider_name, "{:<10} - {}", "Duration", format_duration(elapsed));
        info!(spider = %spider_name, "{:<10} - {}", "Pages", inner.pages);
        info!(spider = %spider_name, "{:<10} - {}", "Crawled", inner.crawled);
        info!(spider = %spider_name, "{:<10} - {}", "Succeed", inner.succeed);
        info!(spider = %spider_name, "{:<10} - {}", "Items", inner.items);
        info!(spider = %spider_name, "{:<10} - {}", "Files", inner.files);
        info!(spider = %spider_name, "{:<10} - {}", "Reason", inner.reason);
    }

    /// Lines of the periodic progress report.
    pub fn report(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let seconds = inner
            .start_date
            .map(|d| (Local::now() - d).num_seconds())
            .unwrap_or(0)
            .max(1);
        let minutes = seconds as f64 / 60.0;
        let rate = |count: u64| count as f64 / minutes;

        vec![
            format!("{:<10} - {}", "Duration", format_duration(seconds)),
            format!("{:<10} - {} ({:.1} per minute)", "Pages", inner.pages, rate(inner.pages)),
            format!("{:<10} - {} ({:.1} per minute)", "Crawled", inner.crawled, rate(inner.crawled)),
            format!("{:<10} - {} ({:.1} per minute)", "Succeed", inner.succeed, rate(inner.succeed)),
            format!("{:<10} - {} ({:.1} per minute)", "Items", inner.items, rate(inner.items)),
            format!("{:<10} - {} ({:.1} per minute)", "Files", inner.files, rate(inner.files)),
        ]
    }

    /// Flips the crawl into drain mode: no new work is admitted afterwards.
    /// Idempotent; the false→true transition happens at most once.
    pub fn interrupt(&self) {
        let mut inner = self.inner.lock();
        if !inner.interrupted {
            inner.interrupted = true;
            inner.reason = REASON_INTERRUPTED.to_owned();
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.inner.lock().interrupted
    }

    pub fn reason(&self) -> String {
        self.inner.lock().reason.clone()
    }

    pub(crate) fn add_page(&self) {
        self.inner.lock().pages += 1;
    }

    pub(crate) fn add_running_page(&self, url: &str) {
        self.inner.lock().running_pages.insert(url.to_owned());
    }

    /// Dropped and failed requests leave the running set too, or it would
    /// grow without bound over a long crawl.
    pub(crate) fn remove_running_page(&self, url: &str) {
        self.inner.lock().running_pages.remove(url);
    }

    pub(crate) fn add_crawled(&self) {
        self.inner.lock().crawled += 1;
    }

    pub(crate) fn add_succeed(&self, url: &str) {
        let mut inner = self.inner.lock();
        inner.succeed += 1;
        inner.running_pages.remove(url);
    }

    pub(crate) fn add_item(&self) {
        self.inner.lock().items += 1;
    }

    pub(crate) fn add_files(&self) {
        self.inner.lock().files += 1;
    }

    pub fn pages(&self) -> u64 {
        self.inner.lock().pages
    }

    pub fn crawled(&self) -> u64 {
        self.inner.lock().crawled
    }

    pub fn succeed(&self) -> u64 {
        self.inner.lock().succeed
    }

    pub fn items(&self) -> u64 {
        self.inner.lock().items
    }

    pub fn files(&self) -> u64 {
        self.inner.lock().files
    }

    pub fn running_pages(&self) -> usize {
        self.inner.lock().running_pages.len()
    }
}

fn format_duration(total_seconds: i64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
